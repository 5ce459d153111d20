use super::{json_pretty, AgentContext, EXIT_SUCCESS};
use std::path::Path;
use strato_core::{do_openstack_upgrade, ConfigRenderer, ReleaseResolver};
use strato_host::CommandRunner;

const SOURCES_DIR: &str = "/etc/apt/sources.list.d";

pub fn run(
    runner: &dyn CommandRunner,
    ctx: &AgentContext,
    templates: &Path,
    paused: bool,
    json: bool,
) -> Result<u8, String> {
    let mut resolver = ReleaseResolver::new();
    let mut renderer = ConfigRenderer::new(templates, ctx.os_release);
    let outcome = do_openstack_upgrade(
        runner,
        &ctx.inputs(),
        &mut resolver,
        &mut renderer,
        Path::new(SOURCES_DIR),
        paused,
    )
    .map_err(|e| e.to_string())?;

    if json {
        println!(
            "{}",
            json_pretty(&serde_json::json!({
                "target": outcome.target.as_str(),
                "restarted": outcome.restarted,
            }))?
        );
    } else {
        println!("upgraded to {}", outcome.target);
        if outcome.restarted.is_empty() {
            println!("no services restarted");
        } else {
            println!("restarted: {}", outcome.restarted.join(", "));
        }
    }
    Ok(EXIT_SUCCESS)
}
