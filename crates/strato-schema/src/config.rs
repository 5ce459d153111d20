use crate::virt::VirtType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error(transparent)]
    VirtType(#[from] crate::virt::UnknownVirtType),
    #[error("invalid hugepages value '{0}': expected a page count or a percentage like '50%'")]
    InvalidHugepages(String),
    #[error("authorized-keys-path must not be empty")]
    EmptyAuthorizedKeysPath,
}

/// Hugepage reservation request: an absolute number of 2 MiB pages, or a
/// percentage of total system memory to dedicate to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HugepageSpec {
    Count(u64),
    Percent(f64),
}

impl FromStr for HugepageSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ConfigError::InvalidHugepages(s.to_owned());
        if let Some(pct) = s.strip_suffix('%') {
            let pct: f64 = pct.trim().parse().map_err(|_| invalid())?;
            if !(0.0..=100.0).contains(&pct) {
                return Err(invalid());
            }
            Ok(Self::Percent(pct))
        } else {
            s.parse::<u64>().map(Self::Count).map_err(|_| invalid())
        }
    }
}

/// On-disk representation of the agent configuration.
///
/// Loose strings are accepted here; `AgentConfig::from_raw` turns them into
/// typed values and rejects anything it does not recognize.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    virt_type: String,
    #[serde(default)]
    multi_host: bool,
    #[serde(default)]
    enable_live_migration: bool,
    #[serde(default)]
    migration_auth_type: Option<String>,
    #[serde(default)]
    hugepages: Option<String>,
    #[serde(default = "default_openstack_origin")]
    openstack_origin: String,
    #[serde(default = "default_authorized_keys_path")]
    authorized_keys_path: String,
}

fn default_openstack_origin() -> String {
    "distro".to_owned()
}

fn default_authorized_keys_path() -> String {
    "{homedir}/.ssh/authorized_keys".to_owned()
}

/// Validated agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub virt_type: VirtType,
    pub multi_host: bool,
    pub enable_live_migration: bool,
    pub migration_auth_type: Option<String>,
    pub hugepages: Option<HugepageSpec>,
    pub openstack_origin: String,
    pub authorized_keys_path: String,
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(input)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        if raw.authorized_keys_path.trim().is_empty() {
            return Err(ConfigError::EmptyAuthorizedKeysPath);
        }
        Ok(Self {
            virt_type: raw.virt_type.parse()?,
            multi_host: raw.multi_host,
            enable_live_migration: raw.enable_live_migration,
            migration_auth_type: raw.migration_auth_type,
            hugepages: raw.hugepages.as_deref().map(str::parse).transpose()?,
            openstack_origin: raw.openstack_origin,
            authorized_keys_path: raw.authorized_keys_path,
        })
    }

    /// Expand the authorized-keys destination template for a user.
    pub fn authorized_keys_dest(&self, homedir: &str, username: &str) -> String {
        self.authorized_keys_path
            .replace("{homedir}", homedir)
            .replace("{username}", username)
    }
}
