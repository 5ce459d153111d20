use crate::runner::{check_call, CommandRunner};
use crate::users::configure_subuid;
use crate::HostError;
use std::thread;
use std::time::Duration;
use strato_schema::HostRelease;
use tracing::{info, warn};

const LXC_LIST_ATTEMPTS: u32 = 5;
const LXC_LIST_BASE_DELAY: Duration = Duration::from_secs(2);

/// Prepare the host for LXD-backed compute.
///
/// Maps a subordinate uid/gid range for the service user and waits for the
/// LXD daemon to answer; first-time socket activation takes a visible amount
/// of time, hence the only bounded retry in the agent.
pub fn configure_lxd(
    runner: &dyn CommandRunner,
    host: HostRelease,
    user: &str,
) -> Result<(), HostError> {
    if host < HostRelease::Vivid {
        return Err(HostError::HostReleaseTooOld {
            operation: "LXD",
            minimum: HostRelease::Vivid,
            found: host,
        });
    }
    configure_subuid(runner, user)?;
    lxc_list(runner, user)
}

pub fn lxc_list(runner: &dyn CommandRunner, user: &str) -> Result<(), HostError> {
    lxc_list_with_backoff(runner, user, LXC_LIST_BASE_DELAY)
}

fn lxc_list_with_backoff(
    runner: &dyn CommandRunner,
    user: &str,
    base_delay: Duration,
) -> Result<(), HostError> {
    let mut delay = base_delay;
    let mut last_err = None;
    for attempt in 1..=LXC_LIST_ATTEMPTS {
        match check_call(runner, "sudo", &["-u", user, "lxc", "list"]) {
            Ok(()) => {
                if attempt > 1 {
                    info!("lxc answered on attempt {attempt}");
                }
                return Ok(());
            }
            Err(e) => {
                warn!("lxc list attempt {attempt}/{LXC_LIST_ATTEMPTS} failed: {e}");
                last_err = Some(e);
                if attempt < LXC_LIST_ATTEMPTS {
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt"))
}
