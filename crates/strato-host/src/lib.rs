//! Host integration for the Strato compute agent.
//!
//! Everything here is a thin, synchronous wrapper over external system
//! tooling: apt, systemd, ssh-keygen, virsh, lxc, ppc64_cpu. All process
//! invocations go through the `CommandRunner` trait so that every operation
//! can be exercised against a recording mock in tests.

pub mod apt;
pub mod ca;
pub mod hugepages;
pub mod libvirt;
pub mod lxd;
pub mod release;
pub mod runner;
pub mod service;
pub mod smt;
pub mod ssh;
pub mod users;

pub use runner::{CommandRunner, RecordingRunner, SystemRunner};

use strato_schema::{HostRelease, VirtType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command `{command}` failed (status {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{operation} requires host release {minimum} or later (running {found})")]
    HostReleaseTooOld {
        operation: &'static str,
        minimum: HostRelease,
        found: HostRelease,
    },
    #[error("virt-type '{0}' is not managed through libvirt (no connection URI)")]
    NoLibvirtUri(VirtType),
    #[error("failed to set ppc64 SMT state to '{0}'")]
    SmtChangeFailed(String),
    #[error("no passwd entry for user '{0}'")]
    UnknownUser(String),
    #[error("invalid CA certificate payload: {0}")]
    InvalidCaCert(#[from] base64::DecodeError),
    #[error("could not determine host release: {0}")]
    HostRelease(#[from] strato_schema::ReleaseParseError),
    #[error("malformed {path}: {reason}")]
    MalformedFile { path: String, reason: String },
}
