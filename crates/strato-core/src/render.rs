use crate::resolver::{libvirt_daemon, ContextKind, ResolverInputs};
use crate::CoreError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use strato_schema::OsRelease;
use tracing::{debug, info};

/// Renders registered configuration files from per-release template sets.
///
/// Templates live under `<templates_dir>/<release>/<basename>`; the most
/// recent release directory at or below the target release wins, with
/// `<templates_dir>/<basename>` as the final fallback. Context evaluation
/// is deliberately thin: each context kind contributes a few well-known
/// variables derived from the config and relation snapshot.
pub struct ConfigRenderer {
    templates_dir: PathBuf,
    release: OsRelease,
    install_root: PathBuf,
    registered: BTreeMap<String, Vec<ContextKind>>,
}

impl ConfigRenderer {
    pub fn new(templates_dir: impl Into<PathBuf>, release: OsRelease) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            release,
            install_root: PathBuf::from("/"),
            registered: BTreeMap::new(),
        }
    }

    /// Write rendered files under an alternate root (tests, dry runs).
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = root.into();
        self
    }

    pub fn register(&mut self, path: impl Into<String>, contexts: Vec<ContextKind>) {
        self.registered.insert(path.into(), contexts);
    }

    /// Register every file from a resource map.
    pub fn register_map(&mut self, map: &BTreeMap<String, crate::resolver::ResourceEntry>) {
        for (path, entry) in map {
            self.register(path.clone(), entry.contexts.clone());
        }
    }

    /// Switch to another release's template set. Takes effect on the next
    /// render.
    pub fn set_release(&mut self, release: OsRelease) {
        info!("switching template set to {release}");
        self.release = release;
    }

    pub fn registered_files(&self) -> impl Iterator<Item = &str> {
        self.registered.keys().map(String::as_str)
    }

    /// Render one registered file and write it below the install root.
    pub fn render(&self, path: &str, inputs: &ResolverInputs<'_>) -> Result<PathBuf, CoreError> {
        let contexts = self
            .registered
            .get(path)
            .ok_or_else(|| CoreError::UnregisteredFile(path.to_owned()))?;
        let template = self.locate_template(path)?;
        debug!("rendering {path} from {}", template.display());
        let source = fs::read_to_string(&template)?;
        let context = evaluate_contexts(contexts, inputs);
        let rendered = tera::Tera::one_off(&source, &context, false)?;

        let dest = self
            .install_root
            .join(Path::new(path).strip_prefix("/").unwrap_or(Path::new(path)));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, rendered)?;
        Ok(dest)
    }

    /// Render every registered file.
    pub fn write_all(&self, inputs: &ResolverInputs<'_>) -> Result<Vec<PathBuf>, CoreError> {
        let mut written = Vec::with_capacity(self.registered.len());
        for path in self.registered.keys() {
            written.push(self.render(path, inputs)?);
        }
        Ok(written)
    }

    fn locate_template(&self, path: &str) -> Result<PathBuf, CoreError> {
        let basename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_owned());

        for release in OsRelease::ALL.iter().rev() {
            if *release > self.release {
                continue;
            }
            let candidate = self.templates_dir.join(release.as_str()).join(&basename);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        let fallback = self.templates_dir.join(&basename);
        if fallback.is_file() {
            return Ok(fallback);
        }
        Err(CoreError::MissingTemplate {
            file: path.to_owned(),
            release: self.release.to_string(),
        })
    }
}

fn evaluate_contexts(kinds: &[ContextKind], inputs: &ResolverInputs<'_>) -> tera::Context {
    let mut ctx = tera::Context::new();
    ctx.insert("virt_type", inputs.config.virt_type.as_str());
    ctx.insert("multi_host", &inputs.config.multi_host);
    ctx.insert("os_release", inputs.os_release.as_str());

    for kind in kinds {
        match kind {
            ContextKind::CloudCompute => {
                ctx.insert(
                    "network_manager",
                    &inputs.relations.network_manager.as_deref().unwrap_or(""),
                );
            }
            ContextKind::LibvirtDaemon | ContextKind::LibvirtOverride => {
                ctx.insert("libvirt_daemon", libvirt_daemon(inputs));
                ctx.insert(
                    "enable_live_migration",
                    &inputs.config.enable_live_migration,
                );
                ctx.insert(
                    "migration_auth_type",
                    &inputs.config.migration_auth_type.as_deref().unwrap_or(""),
                );
            }
            ContextKind::Neutron => {
                ctx.insert("neutron_plugin", &inputs.relations.plugin().unwrap_or(""));
            }
            ContextKind::MetadataService => {
                ctx.insert(
                    "metadata_shared_secret",
                    &inputs.relations.metadata_shared_secret.as_deref().unwrap_or(""),
                );
            }
            ContextKind::Ceph => {
                ctx.insert("storage_backend", &inputs.relations.storage_backend);
            }
            // Remaining providers draw on data the snapshot does not carry
            // yet; templates referencing them use defaults.
            _ => {}
        }
    }
    ctx
}
