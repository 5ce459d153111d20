use crate::runner::{check_call, check_output, CommandRunner};
use crate::HostError;
use tracing::{info, warn};

/// Adjust the ppc64 SMT (simultaneous multithreading) state.
///
/// `state` is either a thread count (`"2"`, `"4"`, `"8"`) or `"off"`.
/// Setting SMT is known to fail inside virtualized guests whose host has
/// not pre-configured it; in that case `on_blocked` is invoked with an
/// operator-facing message before the error propagates, so the unit's
/// workload status reflects the condition.
pub fn set_ppc64_smt(
    runner: &dyn CommandRunner,
    state: &str,
    on_blocked: &mut dyn FnMut(&str),
) -> Result<(), HostError> {
    let current = check_output(runner, "ppc64_cpu", &["--smt"])?;
    // Query output is either `SMT=<n>` or `SMT is off`.
    if current.contains(&format!("SMT={state}")) {
        info!("not changing ppc64 smt state ({state})");
        return Ok(());
    }
    if state == "off" && current.contains("SMT is off") {
        info!("not changing ppc64 smt state (already off)");
        return Ok(());
    }

    info!("setting ppc64 smt state: {state}");
    let arg = format!("--smt={state}");
    check_call(runner, "ppc64_cpu", &[&arg]).map_err(|e| {
        let msg = format!("failed to set ppc64_cpu smt state: {state}");
        warn!("{msg}: {e}");
        on_blocked(&msg);
        HostError::SmtChangeFailed(state.to_owned())
    })
}
