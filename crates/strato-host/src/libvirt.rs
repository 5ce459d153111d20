use crate::runner::{check_call, check_output, CommandRunner};
use crate::HostError;
use std::io;
use std::path::Path;
use strato_schema::VirtType;
use tracing::{debug, info, warn};

fn libvirt_uri(virt_type: VirtType) -> Result<&'static str, HostError> {
    virt_type
        .libvirt_uri()
        .ok_or(HostError::NoLibvirtUri(virt_type))
}

/// Ensure a libvirt secret exists with the given value.
///
/// Matching uuid and value: nothing to do. Existing uuid with a different
/// value: redefined in place (self-healing, not an error). Absent uuid:
/// defined from the descriptor file, then set. Any virsh failure is a hard
/// error; retry policy belongs to the caller.
pub fn create_libvirt_secret(
    runner: &dyn CommandRunner,
    virt_type: VirtType,
    secret_file: &Path,
    secret_uuid: &str,
    key: &str,
) -> Result<(), HostError> {
    let uri = libvirt_uri(virt_type)?;
    let listing = check_output(runner, "virsh", &["-c", uri, "secret-list"])?;
    if listing.contains(secret_uuid) {
        let old_key = check_output(
            runner,
            "virsh",
            &["-c", uri, "secret-get-value", secret_uuid],
        )?;
        if old_key.trim() == key {
            debug!("libvirt secret already exists for uuid {secret_uuid}");
            return Ok(());
        }
        info!("libvirt secret changed for uuid {secret_uuid}");
    }
    info!("defining new libvirt secret for uuid {secret_uuid}");
    let file = secret_file.display().to_string();
    check_call(runner, "virsh", &["-c", uri, "secret-define", "--file", &file])?;
    check_call(
        runner,
        "virsh",
        &[
            "-c",
            uri,
            "secret-set-value",
            "--secret",
            secret_uuid,
            "--base64",
            key,
        ],
    )
}

/// Best-effort teardown of a libvirt network.
///
/// A missing virsh binary means the host runs a backend without libvirt;
/// that is a logged skip. Any other failure is logged as a warning and
/// swallowed: teardown never blocks the calling operation.
pub fn destroy_libvirt_network(
    runner: &dyn CommandRunner,
    virt_type: VirtType,
    netname: &str,
) -> Result<(), HostError> {
    let listing = match runner.run("virsh", &["net-list"]) {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Ok(_) => {
            warn!("failed to list libvirt networks; not destroying '{netname}'");
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(
                "virsh is unavailable (virt-type '{virt_type}'); not attempting to \
                 destroy libvirt network '{netname}'"
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // First two lines of `virsh net-list` are the table header.
    let exists = listing
        .lines()
        .skip(2)
        .any(|line| line.split_whitespace().next() == Some(netname));
    if !exists {
        return Ok(());
    }

    if let Err(e) = check_call(runner, "virsh", &["net-destroy", netname]) {
        warn!("failed to destroy libvirt network '{netname}': {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RecordingRunner;

    const SECRET_UUID: &str = "514c9fca-8cbe-11e2-9c52-3bc8c7819472";

    fn secret_runner(listing: &str) -> RecordingRunner {
        RecordingRunner::new().succeed_with("virsh -c qemu:///system secret-list", listing)
    }

    #[test]
    fn matching_secret_is_left_alone() {
        let runner = secret_runner(&format!("{SECRET_UUID}  ceph\n"))
            .succeed_with("virsh -c qemu:///system secret-get-value", "s3cr3t\n");
        create_libvirt_secret(
            &runner,
            VirtType::Kvm,
            Path::new("/etc/ceph/secret.xml"),
            SECRET_UUID,
            "s3cr3t",
        )
        .unwrap();
        assert_eq!(runner.calls_matching("virsh -c qemu:///system secret-define"), 0);
        assert_eq!(runner.calls_matching("virsh -c qemu:///system secret-set-value"), 0);
    }

    #[test]
    fn mismatched_secret_is_redefined() {
        let runner = secret_runner(&format!("{SECRET_UUID}  ceph\n"))
            .succeed_with("virsh -c qemu:///system secret-get-value", "stale\n");
        create_libvirt_secret(
            &runner,
            VirtType::Kvm,
            Path::new("/etc/ceph/secret.xml"),
            SECRET_UUID,
            "fresh",
        )
        .unwrap();
        assert_eq!(runner.calls_matching("virsh -c qemu:///system secret-define"), 1);
        assert_eq!(runner.calls_matching("virsh -c qemu:///system secret-set-value"), 1);
    }

    #[test]
    fn absent_secret_is_defined_and_set() {
        let runner = secret_runner("UUID  Usage\n----\n");
        create_libvirt_secret(
            &runner,
            VirtType::Kvm,
            Path::new("/etc/ceph/secret.xml"),
            SECRET_UUID,
            "fresh",
        )
        .unwrap();
        assert_eq!(runner.calls_matching("virsh -c qemu:///system secret-define"), 1);
        assert_eq!(runner.calls_matching("virsh -c qemu:///system secret-set-value"), 1);
    }

    #[test]
    fn lxd_has_no_secret_support() {
        let runner = RecordingRunner::new();
        let err = create_libvirt_secret(
            &runner,
            VirtType::Lxd,
            Path::new("/etc/ceph/secret.xml"),
            SECRET_UUID,
            "k",
        )
        .unwrap_err();
        assert!(matches!(err, HostError::NoLibvirtUri(VirtType::Lxd)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn destroys_only_matching_network() {
        let listing = " Name      State    Autostart\n----------\n default   active   yes\n";
        let runner = RecordingRunner::new().succeed_with("virsh net-list", listing);
        destroy_libvirt_network(&runner, VirtType::Kvm, "default").unwrap();
        assert_eq!(runner.calls_matching("virsh net-destroy default"), 1);

        let runner = RecordingRunner::new().succeed_with("virsh net-list", listing);
        destroy_libvirt_network(&runner, VirtType::Kvm, "other").unwrap();
        assert_eq!(runner.calls_matching("virsh net-destroy"), 0);
    }

    #[test]
    fn missing_virsh_is_a_quiet_skip() {
        let runner = RecordingRunner::new().missing_binary("virsh");
        destroy_libvirt_network(&runner, VirtType::Lxd, "default").unwrap();
    }

    #[test]
    fn destroy_failure_is_nonfatal() {
        let listing = " Name      State\n----\n default   active\n";
        let runner = RecordingRunner::new()
            .succeed_with("virsh net-list", listing)
            .fail("virsh net-destroy", 1);
        destroy_libvirt_network(&runner, VirtType::Kvm, "default").unwrap();
    }
}
