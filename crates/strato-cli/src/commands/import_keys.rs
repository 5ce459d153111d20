use super::{AgentContext, EXIT_SUCCESS};
use std::path::Path;
use strato_host::ssh::import_authorized_keys;
use strato_host::users::{disable_shell, enable_shell, fix_path_ownership, lookup_home};
use strato_host::CommandRunner;

pub fn run(
    runner: &dyn CommandRunner,
    ctx: &AgentContext,
    prefix: Option<&str>,
    user: &str,
) -> Result<u8, String> {
    let home = lookup_home(user).map_err(|e| e.to_string())?;
    import_authorized_keys(&ctx.config, &ctx.relations, prefix, user, &home)
        .map_err(|e| e.to_string())?;

    if user != "root" {
        let known_hosts = home.join(".ssh/known_hosts");
        if known_hosts.is_file() {
            fix_path_ownership(runner, &known_hosts, user).map_err(|e| e.to_string())?;
        }
        let auth_keys = ctx
            .config
            .authorized_keys_dest(&home.display().to_string(), user);
        if Path::new(&auth_keys).is_file() {
            fix_path_ownership(runner, Path::new(&auth_keys), user)
                .map_err(|e| e.to_string())?;
        }
        // SSH-based live migration needs the service user to accept logins.
        let ssh_migration = ctx.config.enable_live_migration
            && ctx.config.migration_auth_type.as_deref() == Some("ssh");
        if ssh_migration {
            enable_shell(runner, user).map_err(|e| e.to_string())?;
        } else {
            disable_shell(runner, user).map_err(|e| e.to_string())?;
        }
    }
    Ok(EXIT_SUCCESS)
}
