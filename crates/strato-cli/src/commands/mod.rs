pub mod enable_lxd;
pub mod hugepages;
pub mod import_ca;
pub mod import_keys;
pub mod init_ssh;
pub mod net_destroy;
pub mod packages;
pub mod render;
pub mod resolve;
pub mod secret;
pub mod services;
pub mod smt;
pub mod status;
pub mod upgrade;

use std::path::Path;
use strato_core::{ReleaseResolver, ResolverInputs};
use strato_host::{release, CommandRunner};
use strato_schema::{AgentConfig, HostRelease, OsRelease, RelationSnapshot};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_BLOCKED: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Everything a resolver-driven command needs, loaded once per invocation.
pub struct AgentContext {
    pub config: AgentConfig,
    pub relations: RelationSnapshot,
    pub host_release: HostRelease,
    pub os_release: OsRelease,
    pub machine_arch: String,
}

impl AgentContext {
    pub fn load(
        runner: &dyn CommandRunner,
        config_path: &Path,
        relations_path: &Path,
    ) -> Result<Self, String> {
        let config = AgentConfig::load(config_path)
            .map_err(|e| format!("{}: {e}", config_path.display()))?;
        // No snapshot yet just means no relations have formed.
        let relations = if relations_path.exists() {
            RelationSnapshot::load(relations_path)
                .map_err(|e| format!("{}: {e}", relations_path.display()))?
        } else {
            RelationSnapshot::default()
        };
        let host_release = release::host_release().map_err(|e| e.to_string())?;
        let machine_arch = release::machine_arch(runner).map_err(|e| e.to_string())?;
        let os_release = ReleaseResolver::new()
            .current(runner, &config, host_release)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            config,
            relations,
            host_release,
            os_release,
            machine_arch,
        })
    }

    pub fn inputs(&self) -> ResolverInputs<'_> {
        ResolverInputs {
            config: &self.config,
            relations: &self.relations,
            host_release: self.host_release,
            os_release: self.os_release,
            machine_arch: &self.machine_arch,
        }
    }
}
