use crate::runner::{check_output, CommandRunner};
use crate::HostError;
use std::fs;
use std::path::Path;
use strato_schema::HostRelease;

const LSB_RELEASE_PATH: &str = "/etc/lsb-release";

/// Series codename of the running host, from `/etc/lsb-release`.
pub fn host_release() -> Result<HostRelease, HostError> {
    host_release_from(Path::new(LSB_RELEASE_PATH))
}

pub fn host_release_from(path: &Path) -> Result<HostRelease, HostError> {
    let content = fs::read_to_string(path)?;
    let codename = content
        .lines()
        .find_map(|line| line.strip_prefix("DISTRIB_CODENAME="))
        .ok_or_else(|| HostError::MalformedFile {
            path: path.display().to_string(),
            reason: "missing DISTRIB_CODENAME".to_owned(),
        })?;
    Ok(codename.trim().trim_matches('"').parse()?)
}

/// Machine hardware name (`uname -m`), e.g. `x86_64` or `aarch64`.
pub fn machine_arch(runner: &dyn CommandRunner) -> Result<String, HostError> {
    Ok(check_output(runner, "uname", &["-m"])?.trim().to_owned())
}
