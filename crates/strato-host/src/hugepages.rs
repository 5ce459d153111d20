use crate::runner::{check_call, CommandRunner};
use crate::service::service_restart;
use crate::HostError;
use std::fs;
use std::path::Path;
use strato_schema::HugepageSpec;
use tracing::{debug, info};

/// Pool page size. Multiple pool sizes (2M + 1G) are not supported yet.
const HUGEPAGE_SIZE_BYTES: u64 = 2048 * 1024;

pub const HUGEPAGE_MOUNT: &str = "/run/hugepages/kvm";

/// Number of 2 MiB pages a spec asks for, given total system memory.
pub fn hugepage_count(spec: HugepageSpec, mem_total_bytes: u64) -> u64 {
    match spec {
        HugepageSpec::Count(n) => n,
        HugepageSpec::Percent(pct) => {
            let wanted = (mem_total_bytes as f64) * (pct / 100.0);
            (wanted / HUGEPAGE_SIZE_BYTES as f64) as u64
        }
    }
}

/// Total system memory in bytes, from /proc/meminfo.
pub fn mem_total_bytes() -> Result<u64, HostError> {
    mem_total_bytes_from(Path::new("/proc/meminfo"))
}

pub fn mem_total_bytes_from(path: &Path) -> Result<u64, HostError> {
    let content = fs::read_to_string(path)?;
    let malformed = |reason: &str| HostError::MalformedFile {
        path: path.display().to_string(),
        reason: reason.to_owned(),
    };
    let line = content
        .lines()
        .find(|l| l.starts_with("MemTotal:"))
        .ok_or_else(|| malformed("missing MemTotal"))?;
    let kb: u64 = line
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| malformed("unparsable MemTotal"))?;
    Ok(kb * 1024)
}

/// Reserve hugepages and make sure the KVM hugepage mount is live.
///
/// No-op when the configuration does not request hugepages. Otherwise:
/// set the kernel pool size, drop any stale fstab entry for the mountpoint
/// (the mount is managed here, not by fstab), and mount + bounce qemu-kvm
/// when the mountpoint is not yet active.
pub fn install_hugepages(
    runner: &dyn CommandRunner,
    spec: Option<HugepageSpec>,
    fstab: &Path,
) -> Result<(), HostError> {
    let Some(spec) = spec else {
        debug!("hugepages not configured");
        return Ok(());
    };
    let pages = hugepage_count(spec, mem_total_bytes()?);
    info!("reserving {pages} hugepages");

    let nr = format!("vm.nr_hugepages={pages}");
    check_call(runner, "sysctl", &["-w", &nr])?;
    let shmmax = format!("kernel.shmmax={}", pages * HUGEPAGE_SIZE_BYTES);
    check_call(runner, "sysctl", &["-w", &shmmax])?;

    fs::create_dir_all(HUGEPAGE_MOUNT)?;
    if remove_fstab_mountpoint(fstab, HUGEPAGE_MOUNT)? {
        info!("removed stale fstab entry for {HUGEPAGE_MOUNT}");
    }

    let mounted = check_call(runner, "mountpoint", &["-q", HUGEPAGE_MOUNT]).is_ok();
    if !mounted {
        check_call(
            runner,
            "mount",
            &[
                "-t",
                "hugetlbfs",
                "-o",
                "mode=1770,gid=kvm",
                "hugetlbfs",
                HUGEPAGE_MOUNT,
            ],
        )?;
        service_restart(runner, "qemu-kvm")?;
    }
    Ok(())
}

/// Drop any fstab line whose mountpoint matches. Returns whether a line was
/// removed. A missing fstab is treated as already clean.
pub fn remove_fstab_mountpoint(fstab: &Path, mountpoint: &str) -> Result<bool, HostError> {
    let content = match fs::read_to_string(fstab) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| {
            line.trim_start().starts_with('#')
                || line.split_whitespace().nth(1) != Some(mountpoint)
        })
        .collect();
    let removed = kept.len() != content.lines().count();
    if removed {
        let mut out = kept.join("\n");
        out.push('\n');
        fs::write(fstab, out)?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn count_spec_is_verbatim() {
        assert_eq!(hugepage_count(HugepageSpec::Count(512), u64::MAX), 512);
    }

    #[test]
    fn percent_spec_scales_with_memory() {
        // 8 GiB total, 50% => 4 GiB / 2 MiB = 2048 pages
        let total = 8 * 1024 * 1024 * 1024;
        assert_eq!(hugepage_count(HugepageSpec::Percent(50.0), total), 2048);
    }

    #[test]
    fn meminfo_parsing() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "MemTotal:       16384256 kB").unwrap();
        writeln!(f, "MemFree:         1234567 kB").unwrap();
        assert_eq!(mem_total_bytes_from(f.path()).unwrap(), 16_384_256 * 1024);
    }

    #[test]
    fn fstab_entry_removed_by_mountpoint() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# /etc/fstab").unwrap();
        writeln!(f, "UUID=abcd / ext4 defaults 0 1").unwrap();
        writeln!(f, "hugetlbfs /run/hugepages/kvm hugetlbfs mode=1770 0 0").unwrap();
        assert!(remove_fstab_mountpoint(f.path(), "/run/hugepages/kvm").unwrap());
        let content = fs::read_to_string(f.path()).unwrap();
        assert!(!content.contains("hugepages"));
        assert!(content.contains("UUID=abcd"));
        // Second pass finds nothing to do.
        assert!(!remove_fstab_mountpoint(f.path(), "/run/hugepages/kvm").unwrap());
    }

    #[test]
    fn missing_fstab_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_fstab_mountpoint(&dir.path().join("fstab"), "/x").unwrap());
    }
}
