//! Configuration validation run before any directory is touched

use std::path::{Component, Path};

use crate::{
    config::{Config, ProjectPaths},
    error::{Error, Result},
};

impl Config {
    /// Reject configurations that cannot work or would feed back into themselves
    pub fn validate(&self) -> Result<()> {
        if self.toolchain.program.trim().is_empty() {
            return Err(Error::ConfigError(
                "toolchain.program must not be empty".to_string(),
            ));
        }

        let ext = &self.toolchain.plugin_extension;
        if ext.is_empty() || ext.contains('.') || ext.contains('/') {
            return Err(Error::ConfigError(format!(
                "toolchain.plugin_extension must be a bare extension, got {ext:?}"
            )));
        }

        if self.host.binary_name.trim().is_empty() {
            return Err(Error::ConfigError(
                "host.binary_name must not be empty".to_string(),
            ));
        }

        for asset in &self.layout.assets {
            if !is_plain_relative(Path::new(&asset.target)) {
                return Err(Error::ConfigError(format!(
                    "asset target {:?} must be a relative path inside the staging directory",
                    asset.target
                )));
            }
        }

        if !is_plain_relative(Path::new(&self.layout.staging_modules_dir)) {
            return Err(Error::ConfigError(format!(
                "layout.staging_modules_dir {:?} must be a relative path",
                self.layout.staging_modules_dir
            )));
        }

        // Resolve against a synthetic root so only the relative layout matters
        let paths = ProjectPaths::resolve(self, Path::new("/"));
        let watched = paths
            .source_roots
            .iter()
            .chain(paths.assets.iter().map(|a| &a.source));
        for root in watched {
            if paths.staging_dir.starts_with(root) {
                return Err(Error::ConfigError(format!(
                    "staging directory {:?} lies inside watched tree {}",
                    self.layout.staging_dir,
                    root.display()
                )));
            }
        }

        Ok(())
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetTreeConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_program() {
        let mut config = Config::default();
        config.toolchain.program = " ".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_rejects_dotted_extension() {
        let mut config = Config::default();
        config.toolchain.plugin_extension = ".so".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_escaping_asset_target() {
        let mut config = Config::default();
        config.layout.assets.push(AssetTreeConfig {
            source: "application/static".to_string(),
            target: "../outside".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_staging_inside_source_root() {
        let mut config = Config::default();
        config.layout.staging_dir = "application/dist".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("staging directory"));
    }
}
