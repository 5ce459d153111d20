use super::{AgentContext, EXIT_SUCCESS};
use std::path::Path;
use strato_host::hugepages::install_hugepages;
use strato_host::CommandRunner;

pub fn run(runner: &dyn CommandRunner, ctx: &AgentContext) -> Result<u8, String> {
    install_hugepages(runner, ctx.config.hugepages, Path::new("/etc/fstab"))
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
