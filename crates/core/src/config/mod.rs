//! Configuration management for devloop

mod host_config;
mod layout_config;
mod paths;
mod settings;
mod toolchain_config;
pub mod validation;

// Re-export main types
pub use host_config::HostConfig;
pub use layout_config::{AssetTreeConfig, LayoutConfig, WatchConfig};
pub use paths::{AssetTree, ProjectPaths};
pub use settings::{CONFIG_FILE_NAMES, Config, LoadedConfig};
pub use toolchain_config::{ToolchainConfig, render_args};
