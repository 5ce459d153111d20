use crate::release::ReleaseResolver;
use crate::render::ConfigRenderer;
use crate::resolver::{determine_packages, resource_map, services, ResolverInputs};
use crate::CoreError;
use std::path::Path;
use strato_host::apt::{apt_install, apt_update, apt_upgrade, configure_installation_source};
use strato_host::service::service_restart;
use strato_host::CommandRunner;
use strato_schema::OsRelease;
use tracing::{info, warn};

#[derive(Debug)]
pub struct UpgradeOutcome {
    pub target: OsRelease,
    pub restarted: Vec<String>,
}

/// Move the node to the release named by the configured installation source.
///
/// Forward-only: each step either succeeds or fails the whole operation,
/// leaving the host where it is. There is no rollback — the operator fixes
/// the cause and re-runs, and every step is safe to repeat.
///
/// Order matters: source, index refresh, dist-upgrade, release-cache
/// invalidation, install of the newly-determined package set, template-set
/// switch, render, restarts (skipped while the unit is paused).
#[allow(clippy::too_many_arguments)]
pub fn do_openstack_upgrade(
    runner: &dyn CommandRunner,
    inputs: &ResolverInputs<'_>,
    resolver: &mut ReleaseResolver,
    renderer: &mut ConfigRenderer,
    sources_dir: &Path,
    paused: bool,
) -> Result<UpgradeOutcome, CoreError> {
    let target = OsRelease::from_install_source(
        &inputs.config.openstack_origin,
        inputs.host_release,
    )?;
    info!("performing OpenStack upgrade to {target}");

    configure_installation_source(runner, &inputs.config.openstack_origin, sources_dir)?;
    apt_update(runner)?;
    apt_upgrade(runner)?;

    // The installed version package just changed; the cached release is
    // stale until re-queried.
    resolver.invalidate();

    let upgraded = ResolverInputs {
        os_release: target,
        ..*inputs
    };
    apt_install(runner, &determine_packages(&upgraded))?;

    renderer.set_release(target);
    renderer.register_map(&resource_map(&upgraded));
    renderer.write_all(&upgraded)?;

    let mut restarted = Vec::new();
    if paused {
        warn!("unit is paused; skipping service restarts after upgrade");
    } else {
        for service in services(&upgraded) {
            service_restart(runner, &service)?;
            restarted.push(service);
        }
    }
    Ok(UpgradeOutcome { target, restarted })
}
