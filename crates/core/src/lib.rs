//! devloop - build, watch and supervise a plugin-extensible host application
//!
//! This crate provides functionality to:
//! - Build the host binary and every plugin module with an external compiler
//! - Mirror static asset trees into a staging tree
//! - Run the host, rebuild and restart it when its sources change
//! - Rebuild a single plugin module whenever its sources change
pub mod assets;
pub mod batch;
pub mod builder;
pub mod config;
pub mod discovery;
pub mod error;
pub mod module_watcher;
pub mod orchestrator;
pub mod process;
pub mod signal;
pub mod supervisor;
pub mod watch;

// Re-export commonly used types and traits
pub use error::{Error, Result};

// Re-export main API components
pub use assets::{AssetSynchronizer, SyncReport};
pub use batch::BatchPluginBuilder;
pub use builder::{ArtifactBuilder, BuildResult, BuildTarget};
pub use config::{Config, LoadedConfig, ProjectPaths};
pub use discovery::{ModuleDescriptor, discover_modules, resolve_module};
pub use module_watcher::ModuleDevWatcher;
pub use orchestrator::{DevOrchestrator, DevStatus, EventRoute, Phase, WatchLayout};
pub use process::{Invocation, Outcome, ProcessRunner, SystemProcessRunner};
pub use supervisor::{HostSpec, ProcessSupervisor, SupervisedProcess};
pub use watch::{ChangeKind, EventQueue, EventSource, FileWatchService, WatchEvent};
