//! Typed configuration and deployment-state schema for the Strato agent.
//!
//! This crate defines the declarative inputs the agent is driven by: the TOML
//! agent configuration (`AgentConfig`), the JSON relation snapshot published
//! by cooperating deployment units (`RelationSnapshot`), ordered host and
//! OpenStack release identifiers, and the supported hypervisor backends
//! (`VirtType`). All values are parsed and validated once at load time;
//! downstream crates only ever see well-typed data.

pub mod config;
pub mod release;
pub mod relations;
pub mod virt;

pub use config::{AgentConfig, ConfigError, HugepageSpec};
pub use relations::{RelationError, RelationSnapshot, SshKeyBundle};
pub use release::{HostRelease, OsRelease, ReleaseParseError};
pub use virt::{NetworkManager, UnknownVirtType, VirtType};
