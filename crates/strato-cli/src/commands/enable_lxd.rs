use super::{AgentContext, EXIT_SUCCESS};
use strato_host::lxd::configure_lxd;
use strato_host::CommandRunner;

pub fn run(runner: &dyn CommandRunner, ctx: &AgentContext, user: &str) -> Result<u8, String> {
    configure_lxd(runner, ctx.host_release, user).map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
