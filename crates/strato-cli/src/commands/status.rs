use super::{json_pretty, AgentContext, EXIT_BLOCKED, EXIT_SUCCESS};
use strato_core::status::{assess_status, component_version, required_interfaces, WorkloadStatus};
use strato_host::CommandRunner;

pub fn run(
    runner: &dyn CommandRunner,
    ctx: &AgentContext,
    paused: bool,
    json: bool,
) -> Result<u8, String> {
    let status = assess_status(&ctx.relations, paused);
    let version = component_version(runner).map_err(|e| e.to_string())?;
    let required = required_interfaces(&ctx.relations);

    if json {
        println!(
            "{}",
            json_pretty(&serde_json::json!({
                "status": status,
                "version": version,
                "required-interfaces": required,
            }))?
        );
    } else {
        match &status {
            WorkloadStatus::Active => println!("active"),
            WorkloadStatus::Blocked(msg) => println!("blocked: {msg}"),
            WorkloadStatus::Maintenance(msg) => println!("maintenance: {msg}"),
        }
        if let Some(version) = &version {
            println!("version: {version}");
        }
    }

    Ok(match status {
        WorkloadStatus::Blocked(_) => EXIT_BLOCKED,
        _ => EXIT_SUCCESS,
    })
}
