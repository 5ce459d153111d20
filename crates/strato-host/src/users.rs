use crate::runner::{check_call, CommandRunner};
use crate::HostError;
use std::fs;
use std::path::{Path, PathBuf};

/// Map the subordinate uid/gid range LXD needs onto the service user.
pub fn configure_subuid(runner: &dyn CommandRunner, user: &str) -> Result<(), HostError> {
    check_call(
        runner,
        "usermod",
        &["-v", "100000-200000", "-w", "100000-200000", user],
    )
}

pub fn enable_shell(runner: &dyn CommandRunner, user: &str) -> Result<(), HostError> {
    check_call(runner, "usermod", &["-s", "/bin/bash", user])
}

pub fn disable_shell(runner: &dyn CommandRunner, user: &str) -> Result<(), HostError> {
    check_call(runner, "usermod", &["-s", "/bin/false", user])
}

pub fn fix_path_ownership(
    runner: &dyn CommandRunner,
    path: &Path,
    user: &str,
) -> Result<(), HostError> {
    let path = path.display().to_string();
    check_call(runner, "chown", &[user, &path])
}

/// Home directory of a local user, from the passwd database.
pub fn lookup_home(user: &str) -> Result<PathBuf, HostError> {
    lookup_home_in(Path::new("/etc/passwd"), user)
}

pub fn lookup_home_in(passwd: &Path, user: &str) -> Result<PathBuf, HostError> {
    let content = fs::read_to_string(passwd)?;
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            (name == user).then(|| fields.nth(4).map(PathBuf::from))?
        })
        .next()
        .ok_or_else(|| HostError::UnknownUser(user.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RecordingRunner;
    use std::io::Write;

    #[test]
    fn shell_toggles() {
        let runner = RecordingRunner::new();
        enable_shell(&runner, "nova").unwrap();
        disable_shell(&runner, "nova").unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "usermod -s /bin/bash nova",
                "usermod -s /bin/false nova"
            ]
        );
    }

    #[test]
    fn home_lookup_from_passwd() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "root:x:0:0:root:/root:/bin/bash").unwrap();
        writeln!(f, "nova:x:64060:64060::/var/lib/nova:/bin/false").unwrap();
        assert_eq!(
            lookup_home_in(f.path(), "nova").unwrap(),
            PathBuf::from("/var/lib/nova")
        );
        assert!(matches!(
            lookup_home_in(f.path(), "ghost"),
            Err(HostError::UnknownUser(_))
        ));
    }
}
