use anyhow::{Context, Result};
use devloop_core::{DevOrchestrator, SystemProcessRunner, signal::shutdown_signal};
use std::sync::Arc;

use super::load_project;
use crate::cli::ProjectArgs;

pub async fn dev_command(project: &ProjectArgs) -> Result<()> {
    let loaded = load_project(project)?;
    let paths = loaded.paths();
    let shutdown = shutdown_signal().context("Failed to install signal handlers")?;
    tokio::pin!(shutdown);

    println!("🚀 Starting dev loop in {}", paths.root.display());

    // An interrupt during the initial build abandons it
    let orchestrator = tokio::select! {
        started = DevOrchestrator::bootstrap(&loaded.config, &paths, Arc::new(SystemProcessRunner)) => {
            started.context("Failed to start the host application")?
        }
        _ = &mut shutdown => {
            println!("👋 Interrupted before the host started");
            return Ok(());
        }
    };

    orchestrator.run(shutdown).await.context("Dev loop failed")?;

    println!("👋 Dev loop stopped");
    Ok(())
}
