use super::EXIT_SUCCESS;
use strato_host::ssh::{initialize_ssh_keys, public_ssh_key};
use strato_host::users::lookup_home;
use strato_host::CommandRunner;

pub fn run(runner: &dyn CommandRunner, user: &str) -> Result<u8, String> {
    let home = lookup_home(user).map_err(|e| e.to_string())?;
    initialize_ssh_keys(runner, &home, user).map_err(|e| e.to_string())?;
    if let Some(key) = public_ssh_key(&home) {
        println!("{key}");
    }
    Ok(EXIT_SUCCESS)
}
