use anyhow::{Context, Result};
use devloop_core::{ArtifactBuilder, SystemProcessRunner, discover_modules};
use std::sync::Arc;

use super::load_project;
use crate::cli::ProjectArgs;
use crate::display::print_module_list;

pub fn modules_command(project: &ProjectArgs) -> Result<()> {
    let loaded = load_project(project)?;
    let paths = loaded.paths();

    let modules =
        discover_modules(&paths.modules_root).context("Failed to list plugin modules")?;
    let builder = ArtifactBuilder::new(
        Arc::new(SystemProcessRunner),
        loaded.config.toolchain.clone(),
        &paths.root,
    );

    let entries: Vec<_> = modules
        .iter()
        .map(|module| {
            (
                module.name.as_str(),
                builder.plugin_artifact_path(module, &paths.release_modules_dir),
            )
        })
        .collect();

    print_module_list(&paths.modules_root, &entries);
    Ok(())
}
