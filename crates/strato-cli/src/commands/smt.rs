use super::{EXIT_BLOCKED, EXIT_SUCCESS};
use strato_host::smt::set_ppc64_smt;
use strato_host::CommandRunner;

pub fn run(runner: &dyn CommandRunner, state: &str) -> Result<u8, String> {
    let mut blocked = None;
    match set_ppc64_smt(runner, state, &mut |msg| blocked = Some(msg.to_owned())) {
        Ok(()) => Ok(EXIT_SUCCESS),
        // A blocked condition surfaces through the exit code, not as a
        // plain failure.
        Err(e) => match blocked {
            Some(msg) => {
                eprintln!("blocked: {msg}");
                Ok(EXIT_BLOCKED)
            }
            None => Err(e.to_string()),
        },
    }
}
