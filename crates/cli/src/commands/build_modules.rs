use anyhow::{Context, Result};
use devloop_core::{ArtifactBuilder, BatchPluginBuilder, SystemProcessRunner, discover_modules};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

use super::load_project;
use crate::cli::ProjectArgs;
use crate::display::print_build_results;

pub async fn build_modules_command(
    project: &ProjectArgs,
    out_dir: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let loaded = load_project(project)?;
    let paths = loaded.paths();

    let out_dir = match out_dir {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("Invalid output directory {}", dir.display()))?,
        None => paths.release_modules_dir.clone(),
    };
    debug!("Module output directory: {}", out_dir.display());

    let builder = Arc::new(ArtifactBuilder::new(
        Arc::new(SystemProcessRunner),
        loaded.config.toolchain.clone(),
        &paths.root,
    ));

    if dry_run {
        let modules = discover_modules(&paths.modules_root).unwrap_or_else(|e| {
            error!("Cannot list modules: {}", e);
            Vec::new()
        });
        for module in &modules {
            let invocation = builder.invocation(&builder.plugin_target(module, &out_dir));
            println!("{}", invocation.to_shell_command());
        }
        return Ok(());
    }

    println!(
        "🔨 Building modules from {} into {}",
        paths.modules_root.display(),
        out_dir.display()
    );
    let results = BatchPluginBuilder::new(builder)
        .build_all(&paths.modules_root, &out_dir)
        .await
        .context("Failed to build modules")?;

    print_build_results(&results);
    Ok(())
}
