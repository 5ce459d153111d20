use super::{json_pretty, AgentContext, EXIT_SUCCESS};
use strato_core::services;

pub fn run(ctx: &AgentContext, json: bool) -> Result<u8, String> {
    let services = services(&ctx.inputs());
    if json {
        println!("{}", json_pretty(&services)?);
    } else {
        for service in &services {
            println!("{service}");
        }
    }
    Ok(EXIT_SUCCESS)
}
