use anyhow::{Context, Result};
use devloop_core::{
    ArtifactBuilder, ModuleDevWatcher, SystemProcessRunner, resolve_module,
    signal::shutdown_signal,
};
use std::sync::Arc;
use std::time::Duration;

use super::load_project;
use crate::cli::ProjectArgs;

pub async fn dev_module_command(project: &ProjectArgs, module: &str) -> Result<()> {
    let loaded = load_project(project)?;
    let paths = loaded.paths();
    let module = resolve_module(&paths.modules_root, module)?;
    let shutdown = shutdown_signal().context("Failed to install signal handlers")?;

    let builder = Arc::new(ArtifactBuilder::new(
        Arc::new(SystemProcessRunner),
        loaded.config.toolchain.clone(),
        &paths.root,
    ));
    let watcher = ModuleDevWatcher::new(
        builder,
        module,
        &paths.staging_modules_dir,
        loaded.config.layout.source_extensions.clone(),
    );

    println!(
        "👀 Watching module {} -> {}",
        watcher.module().name,
        watcher.artifact_path().display()
    );

    watcher
        .run(Duration::from_millis(loaded.config.watch.settle_ms), shutdown)
        .await
        .context("Module watcher failed")?;

    println!("👋 Module watcher stopped");
    Ok(())
}
