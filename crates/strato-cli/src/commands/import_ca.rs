use super::{AgentContext, EXIT_SUCCESS};
use std::path::Path;
use strato_host::ca::{import_ca_cert, CA_CERT_PATH};
use strato_host::CommandRunner;

pub fn run(runner: &dyn CommandRunner, ctx: &AgentContext) -> Result<u8, String> {
    import_ca_cert(
        runner,
        ctx.relations.ca_cert.as_deref(),
        Path::new(CA_CERT_PATH),
    )
    .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
