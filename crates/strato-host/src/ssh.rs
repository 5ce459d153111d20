use crate::runner::{check_call, check_output, CommandRunner};
use crate::HostError;
use std::fs;
use std::path::Path;
use strato_schema::{AgentConfig, RelationSnapshot};
use tracing::{info, warn};

/// The user's public key, if one has been generated.
pub fn public_ssh_key(home: &Path) -> Option<String> {
    let key = fs::read_to_string(home.join(".ssh/id_rsa.pub")).ok()?;
    Some(key.trim().to_owned())
}

/// Ensure the user has an RSA keypair, generating whichever half is missing.
pub fn initialize_ssh_keys(
    runner: &dyn CommandRunner,
    home: &Path,
    user: &str,
) -> Result<(), HostError> {
    let ssh_dir = home.join(".ssh");
    if !ssh_dir.is_dir() {
        fs::create_dir_all(&ssh_dir)?;
    }

    let priv_key = ssh_dir.join("id_rsa");
    let priv_key_str = priv_key.display().to_string();
    if !priv_key.is_file() {
        info!("generating new ssh key for user {user}");
        check_call(
            runner,
            "ssh-keygen",
            &["-q", "-N", "", "-t", "rsa", "-b", "2048", "-f", &priv_key_str],
        )?;
    }

    let pub_key = ssh_dir.join("id_rsa.pub");
    if !pub_key.is_file() {
        info!("generating missing ssh public key @ {}", pub_key.display());
        let derived = check_output(runner, "ssh-keygen", &["-y", "-f", &priv_key_str])?;
        fs::write(&pub_key, derived.trim())?;
    }

    let ssh_dir_str = ssh_dir.display().to_string();
    check_call(runner, "chown", &["-R", user, &ssh_dir_str])
}

/// Import known_hosts and authorized_keys advertised over the cloud-compute
/// relation.
///
/// Either both lists are complete or nothing is written: a partial import
/// would leave hosts able to connect that cannot be verified (or vice
/// versa), so incomplete relation data skips the whole operation.
pub fn import_authorized_keys(
    config: &AgentConfig,
    relations: &RelationSnapshot,
    prefix: Option<&str>,
    user: &str,
    home: &Path,
) -> Result<(), HostError> {
    let Some(bundle) = relations.ssh_key_bundle(prefix) else {
        warn!("ssh key relation data incomplete; skipping import for user {user}");
        return Ok(());
    };

    let dest_known_hosts = home.join(".ssh/known_hosts");
    let dest_auth_keys = config.authorized_keys_dest(&home.display().to_string(), user);
    info!(
        "saving new known_hosts to {} and authorized_keys to {dest_auth_keys}",
        dest_known_hosts.display()
    );

    if let Some(parent) = dest_known_hosts.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest_known_hosts, joined_lines(&bundle.known_hosts))?;
    if let Some(parent) = Path::new(&dest_auth_keys).parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest_auth_keys, joined_lines(&bundle.authorized_keys))?;
    Ok(())
}

fn joined_lines(entries: &[String]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(entry);
        out.push('\n');
    }
    out
}
