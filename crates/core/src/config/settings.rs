use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{HostConfig, LayoutConfig, ProjectPaths, ToolchainConfig, WatchConfig};

/// File names checked at each directory level, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = [".devloop.json", "devloop.json"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    pub toolchain: ToolchainConfig,
    pub host: HostConfig,
    pub layout: LayoutConfig,
    pub watch: WatchConfig,
}

/// A configuration together with the project root it applies to
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub root: PathBuf,
    /// The file the configuration came from, if any
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::resolve(&self.config, &self.root)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Load the configuration for a project.
    ///
    /// An explicit file wins; otherwise the directory tree is searched upwards
    /// from `start`. The directory holding the file becomes the project root,
    /// unless `root` is given. Without any file the defaults apply to `start`.
    pub fn load(start: &Path, root: Option<&Path>, explicit: Option<&Path>) -> Result<LoadedConfig> {
        let source = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(root.unwrap_or(start)),
        };

        let config = match source {
            Some(ref path) => {
                debug!("Loading config from {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };
        config.validate()?;

        let root = match (root, &source) {
            (Some(root), _) => root.to_path_buf(),
            (None, Some(path)) => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start.to_path_buf()),
            (None, None) => start.to_path_buf(),
        };
        let root = if root.as_os_str().is_empty() {
            start.to_path_buf()
        } else {
            root
        };

        Ok(LoadedConfig {
            config,
            root: std::path::absolute(&root)?,
            source,
        })
    }
}
