pub mod build_modules;
pub mod dev;
pub mod dev_module;
pub mod init;
pub mod modules;

pub use build_modules::build_modules_command;
pub use dev::dev_command;
pub use dev_module::dev_module_command;
pub use init::init_command;
pub use modules::modules_command;

use anyhow::{Context, Result};
use devloop_core::{Config, LoadedConfig};
use tracing::debug;

use crate::cli::ProjectArgs;

/// Load the project configuration from the current directory upwards
pub(crate) fn load_project(project: &ProjectArgs) -> Result<LoadedConfig> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let loaded = Config::load(&cwd, project.root.as_deref(), project.config.as_deref())
        .context("Failed to load configuration")?;

    match &loaded.source {
        Some(path) => debug!("Using config {}", path.display()),
        None => debug!("Using default configuration"),
    }
    debug!("Project root: {}", loaded.root.display());
    Ok(loaded)
}
