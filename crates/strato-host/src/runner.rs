use crate::HostError;
use std::io;
use std::process::{Command, Output};
use std::sync::Mutex;

/// Seam for external process invocation.
///
/// The real implementation shells out; tests substitute a `RecordingRunner`
/// with scripted outputs and assert on the recorded invocations.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output>;
}

/// Invoke a command, returning its stdout on success and a typed error
/// carrying status and stderr otherwise.
pub fn check_output(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<String, HostError> {
    let output = runner.run(program, args)?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(HostError::CommandFailed {
            command: render_command(program, args),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Invoke a command for its side effect only.
pub fn check_call(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<(), HostError> {
    check_output(runner, program, args).map(|_| ())
}

fn render_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program];
    parts.extend_from_slice(args);
    parts.join(" ")
}

/// Runs commands on the real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// Scripted outcome for one matched invocation.
#[derive(Debug, Clone)]
pub enum Scripted {
    Success(String),
    Failure { code: i32, stderr: String },
    /// The binary itself is absent (ENOENT from the OS).
    Missing,
}

/// Test double: records every invocation and replays scripted outcomes.
///
/// Scripts are matched by prefix against the rendered command line; the
/// first match wins and unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    scripts: Mutex<Vec<(String, Scripted)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, prefix: impl Into<String>, outcome: Scripted) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock")
            .push((prefix.into(), outcome));
        self
    }

    pub fn succeed_with(self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.script(prefix, Scripted::Success(stdout.into()))
    }

    pub fn fail(self, prefix: impl Into<String>, code: i32) -> Self {
        self.script(
            prefix,
            Scripted::Failure {
                code,
                stderr: String::new(),
            },
        )
    }

    pub fn missing_binary(self, prefix: impl Into<String>) -> Self {
        self.script(prefix, Scripted::Missing)
    }

    /// All invocations so far, rendered as command lines.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        let rendered = render_command(program, args);
        self.calls
            .lock()
            .expect("calls lock")
            .push(rendered.clone());

        let scripts = self.scripts.lock().expect("scripts lock");
        let outcome = scripts
            .iter()
            .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or(Scripted::Success(String::new()));
        drop(scripts);

        match outcome {
            Scripted::Success(stdout) => Ok(synthetic_output(0, &stdout, "")),
            Scripted::Failure { code, stderr } => Ok(synthetic_output(code, "", &stderr)),
            Scripted::Missing => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: no such file or directory"),
            )),
        }
    }
}

#[cfg(unix)]
fn synthetic_output(code: i32, stdout: &str, stderr: &str) -> Output {
    use std::os::unix::process::ExitStatusExt;
    Output {
        status: std::process::ExitStatus::from_raw(code << 8),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}
