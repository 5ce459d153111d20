use crate::runner::{check_call, check_output, CommandRunner};
use crate::HostError;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const CLOUD_ARCHIVE_URL: &str = "http://ubuntu-cloud.archive.canonical.com/ubuntu";
const CLOUD_ARCHIVE_LIST: &str = "cloud-archive.list";

/// Point apt at the requested installation source.
///
/// `distro` (or empty) keeps the host archive untouched. A `cloud:` source
/// installs the cloud-archive keyring and writes a sources.list fragment for
/// the named pocket into `sources_dir`.
pub fn configure_installation_source(
    runner: &dyn CommandRunner,
    source: &str,
    sources_dir: &Path,
) -> Result<(), HostError> {
    let source = source.trim();
    if source.is_empty() || source.eq_ignore_ascii_case("distro") {
        debug!("installation source is the host archive; nothing to configure");
        return Ok(());
    }
    if let Some(pocket) = source.strip_prefix("cloud:") {
        let pocket = normalize_cloud_pocket(pocket);
        info!("configuring cloud archive pocket {pocket}");
        apt_install(runner, &["ubuntu-cloud-keyring".to_owned()])?;
        fs::create_dir_all(sources_dir)?;
        fs::write(
            sources_dir.join(CLOUD_ARCHIVE_LIST),
            format!("deb {CLOUD_ARCHIVE_URL} {pocket} main\n"),
        )?;
        return Ok(());
    }
    // Anything else (a PPA, a full deb line) is handed to the tooling as-is.
    info!("adding apt repository {source}");
    check_call(runner, "add-apt-repository", &["--yes", source])
}

/// `xenial-ocata` is shorthand for the `xenial-updates/ocata` pocket.
fn normalize_cloud_pocket(pocket: &str) -> String {
    if pocket.contains('/') {
        return pocket.to_owned();
    }
    match pocket.rsplit_once('-') {
        Some((series, release)) => format!("{series}-updates/{release}"),
        None => pocket.to_owned(),
    }
}

/// Refresh package indexes. Failures are fatal to the calling operation.
pub fn apt_update(runner: &dyn CommandRunner) -> Result<(), HostError> {
    check_call(runner, "apt-get", &["--quiet", "update"])
}

/// Non-interactive dist-upgrade, keeping existing configuration files when
/// a package ships a conflicting one.
pub fn apt_upgrade(runner: &dyn CommandRunner) -> Result<(), HostError> {
    check_call(
        runner,
        "apt-get",
        &[
            "--quiet",
            "--assume-yes",
            "--option",
            "Dpkg::Options::=--force-confdef",
            "--option",
            "Dpkg::Options::=--force-confold",
            "dist-upgrade",
        ],
    )
}

/// Install packages. Failures are fatal to the calling operation; the
/// installer tolerates duplicates in the list.
pub fn apt_install(runner: &dyn CommandRunner, packages: &[String]) -> Result<(), HostError> {
    if packages.is_empty() {
        return Ok(());
    }
    let mut args = vec!["--quiet", "--assume-yes", "install"];
    args.extend(packages.iter().map(String::as_str));
    check_call(runner, "apt-get", &args)
}

/// Installed version of a package, or `None` when it is not installed.
pub fn package_version(
    runner: &dyn CommandRunner,
    package: &str,
) -> Result<Option<String>, HostError> {
    match check_output(
        runner,
        "dpkg-query",
        &["--show", "--showformat=${Version}", package],
    ) {
        Ok(version) => {
            let version = version.trim().to_owned();
            Ok((!version.is_empty()).then_some(version))
        }
        Err(HostError::CommandFailed { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RecordingRunner;

    #[test]
    fn distro_source_is_a_noop() {
        let runner = RecordingRunner::new();
        let dir = tempfile::tempdir().unwrap();
        configure_installation_source(&runner, "distro", dir.path()).unwrap();
        assert!(runner.calls().is_empty());
        assert!(!dir.path().join(CLOUD_ARCHIVE_LIST).exists());
    }

    #[test]
    fn cloud_source_writes_pocket_fragment() {
        let runner = RecordingRunner::new();
        let dir = tempfile::tempdir().unwrap();
        configure_installation_source(&runner, "cloud:xenial-ocata", dir.path()).unwrap();
        let written = fs::read_to_string(dir.path().join(CLOUD_ARCHIVE_LIST)).unwrap();
        assert_eq!(
            written,
            "deb http://ubuntu-cloud.archive.canonical.com/ubuntu xenial-updates/ocata main\n"
        );
        assert_eq!(runner.calls_matching("apt-get --quiet --assume-yes install ubuntu-cloud-keyring"), 1);
    }

    #[test]
    fn update_failure_is_fatal() {
        let runner = RecordingRunner::new().fail("apt-get --quiet update", 100);
        assert!(apt_update(&runner).is_err());
    }

    #[test]
    fn upgrade_prefers_existing_config_files() {
        let runner = RecordingRunner::new();
        apt_upgrade(&runner).unwrap();
        let call = &runner.calls()[0];
        assert!(call.contains("--force-confold"));
        assert!(call.contains("dist-upgrade"));
    }

    #[test]
    fn package_version_absent_package() {
        let runner = RecordingRunner::new().fail("dpkg-query", 1);
        assert_eq!(package_version(&runner, "nova-common").unwrap(), None);
    }

    #[test]
    fn package_version_present_package() {
        let runner = RecordingRunner::new().succeed_with("dpkg-query", "2:14.0.1-0ubuntu1");
        assert_eq!(
            package_version(&runner, "nova-common").unwrap(),
            Some("2:14.0.1-0ubuntu1".to_owned())
        );
    }
}
