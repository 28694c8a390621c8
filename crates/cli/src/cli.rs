use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    build_modules_command, dev_command, dev_module_command, init_command, modules_command,
};

#[derive(Parser, Debug)]
#[command(name = "devloop")]
#[command(version, about, long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to find the project and its configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root (defaults to the directory holding the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file to use instead of searching for one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every plugin module once
    #[command(visible_alias = "b")]
    BuildModules {
        /// Output directory (defaults to the release module directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print the compiler commands without executing them
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Build and run the host, rebuilding and restarting it on source changes
    #[command(visible_alias = "d")]
    Dev,
    /// Rebuild one plugin module whenever its sources change
    DevModule {
        /// Module name under the modules root, or a path to its directory
        module: String,
    },
    /// List discovered plugin modules
    #[command(visible_alias = "ls")]
    Modules,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Execute the selected command
    pub async fn execute(self) -> Result<()> {
        let project = self.project;
        match self.command {
            Commands::BuildModules { out_dir, dry_run } => {
                build_modules_command(&project, out_dir.as_deref(), dry_run).await
            }
            Commands::Dev => dev_command(&project).await,
            Commands::DevModule { module } => dev_module_command(&project, &module).await,
            Commands::Modules => modules_command(&project),
            Commands::Init { force } => init_command(&project, force),
        }
    }
}
