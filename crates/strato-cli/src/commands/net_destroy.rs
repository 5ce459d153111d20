use super::{AgentContext, EXIT_SUCCESS};
use strato_host::libvirt::destroy_libvirt_network;
use strato_host::CommandRunner;

pub fn run(
    runner: &dyn CommandRunner,
    ctx: &AgentContext,
    name: &str,
) -> Result<u8, String> {
    destroy_libvirt_network(runner, ctx.config.virt_type, name)
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
