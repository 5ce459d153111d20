use crate::runner::{check_call, CommandRunner};
use crate::HostError;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const CA_CERT_PATH: &str = "/usr/local/share/ca-certificates/keystone_juju_ca_cert.crt";

/// Install the CA certificate forwarded by the identity service, if any,
/// and refresh the system certificate store.
pub fn import_ca_cert(
    runner: &dyn CommandRunner,
    ca_cert_b64: Option<&str>,
    dest: &Path,
) -> Result<(), HostError> {
    let Some(encoded) = ca_cert_b64 else {
        debug!("no CA certificate advertised");
        return Ok(());
    };
    info!("writing CA certificate to {}", dest.display());
    let decoded = BASE64_STANDARD.decode(encoded.trim())?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, decoded)?;
    check_call(runner, "update-ca-certificates", &[])
}
