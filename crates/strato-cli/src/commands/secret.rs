use super::{AgentContext, EXIT_SUCCESS};
use std::path::PathBuf;
use strato_host::libvirt::create_libvirt_secret;
use strato_host::CommandRunner;

pub fn run(
    runner: &dyn CommandRunner,
    ctx: &AgentContext,
    uuid: &str,
    file: &PathBuf,
    key: &str,
) -> Result<u8, String> {
    create_libvirt_secret(runner, ctx.config.virt_type, file, uuid, key)
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
