//! Core orchestration for the Strato compute agent.
//!
//! Ties the typed schema and the host layer together: the resource/service
//! resolver (which config files to render, with which contexts, restarting
//! which services), package determination, release tracking with explicit
//! invalidation, template rendering, the forward-only OpenStack upgrade
//! sequence, and workload status assessment.

pub mod release;
pub mod render;
pub mod resolver;
pub mod status;
pub mod upgrade;

pub use release::ReleaseResolver;
pub use render::ConfigRenderer;
pub use resolver::{
    determine_packages, resource_map, restart_map, services, ContextKind, ResolverInputs,
    ResourceEntry,
};
pub use status::{assess_status, required_interfaces, WorkloadStatus};
pub use upgrade::{do_openstack_upgrade, UpgradeOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] strato_schema::ConfigError),
    #[error("relation snapshot error: {0}")]
    Relation(#[from] strato_schema::RelationError),
    #[error("release error: {0}")]
    Release(#[from] strato_schema::ReleaseParseError),
    #[error("host error: {0}")]
    Host(#[from] strato_host::HostError),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("no template found for {file} at release {release}")]
    MissingTemplate { file: String, release: String },
    #[error("file is not registered with the renderer: {0}")]
    UnregisteredFile(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
