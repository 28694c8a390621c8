use anyhow::{Context, Result};
use devloop_core::{Config, config::CONFIG_FILE_NAMES};
use std::env;

use crate::cli::ProjectArgs;

pub fn init_command(project: &ProjectArgs, force: bool) -> Result<()> {
    let project_root = match &project.root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let project_root = project_root
        .canonicalize()
        .context("Failed to canonicalize project root")?;

    let config_path = project
        .config
        .clone()
        .unwrap_or_else(|| project_root.join(CONFIG_FILE_NAMES[0]));

    if config_path.exists() && !force {
        println!("❌ Config already exists at: {}", config_path.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    Config::default()
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("✅ Created config: {}", config_path.display());
    println!("\n📌 Next steps:");
    println!("   Adjust the 'toolchain' and 'layout' sections for your project");
    println!("   Run `devloop dev` to build, run and watch the host application");
    Ok(())
}
