use super::{json_pretty, AgentContext, EXIT_SUCCESS};
use strato_core::resource_map;

pub fn run(ctx: &AgentContext, json: bool) -> Result<u8, String> {
    let map = resource_map(&ctx.inputs());
    if json {
        println!("{}", json_pretty(&map)?);
    } else {
        for (path, entry) in &map {
            println!("{path}");
            println!("  services: {}", entry.services.join(", "));
            let contexts: Vec<String> =
                entry.contexts.iter().map(|c| format!("{c:?}")).collect();
            println!("  contexts: {}", contexts.join(", "));
        }
    }
    Ok(EXIT_SUCCESS)
}
