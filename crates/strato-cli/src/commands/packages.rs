use super::{json_pretty, AgentContext, EXIT_SUCCESS};
use strato_core::determine_packages;

pub fn run(ctx: &AgentContext, json: bool) -> Result<u8, String> {
    let packages = determine_packages(&ctx.inputs());
    if json {
        println!("{}", json_pretty(&packages)?);
    } else {
        for package in &packages {
            println!("{package}");
        }
    }
    Ok(EXIT_SUCCESS)
}
