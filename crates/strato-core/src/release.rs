use crate::resolver::VERSION_PACKAGE;
use crate::CoreError;
use strato_host::apt::package_version;
use strato_host::CommandRunner;
use strato_schema::{AgentConfig, HostRelease, OsRelease};
use tracing::debug;

/// Resolves and caches the OpenStack release this node is running.
///
/// The installed version package is the source of truth; before anything is
/// installed the configured installation source decides. The cached answer
/// is stale until `invalidate` is called — callers that change what is
/// installed (the upgrade path) must invalidate before re-querying.
#[derive(Debug, Default)]
pub struct ReleaseResolver {
    cached: Option<OsRelease>,
}

impl ReleaseResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(
        &mut self,
        runner: &dyn CommandRunner,
        config: &AgentConfig,
        host: HostRelease,
    ) -> Result<OsRelease, CoreError> {
        if let Some(release) = self.cached {
            return Ok(release);
        }
        let release = match package_version(runner, VERSION_PACKAGE)? {
            Some(version) => OsRelease::from_nova_version(&version)?,
            None => OsRelease::from_install_source(&config.openstack_origin, host)?,
        };
        debug!("resolved OpenStack release: {release}");
        self.cached = Some(release);
        Ok(release)
    }

    /// Forget the cached release. The next `current` call re-derives it
    /// from the host's actual state.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
