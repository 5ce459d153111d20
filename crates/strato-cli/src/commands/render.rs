use super::{json_pretty, AgentContext, EXIT_SUCCESS};
use std::path::{Path, PathBuf};
use strato_core::{resource_map, ConfigRenderer};

pub fn run(
    ctx: &AgentContext,
    templates: &Path,
    root: &PathBuf,
    json: bool,
) -> Result<u8, String> {
    let inputs = ctx.inputs();
    let mut renderer =
        ConfigRenderer::new(templates, ctx.os_release).with_install_root(root);
    renderer.register_map(&resource_map(&inputs));
    let written = renderer.write_all(&inputs).map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&written)?);
    } else {
        for path in &written {
            println!("{}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
