use crate::runner::{check_call, CommandRunner};
use crate::HostError;
use tracing::info;

/// Restart a system service.
pub fn service_restart(runner: &dyn CommandRunner, name: &str) -> Result<(), HostError> {
    info!("restarting service {name}");
    check_call(runner, "systemctl", &["restart", name])
}
