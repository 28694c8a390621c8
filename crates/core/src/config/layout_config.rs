use serde::{Deserialize, Serialize};

/// Directory layout of the project, relative to its root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct LayoutConfig {
    /// One subdirectory per plugin module
    pub modules_root: String,
    /// Where `build-modules` writes release artifacts
    pub release_modules_dir: String,
    /// Development output tree mirrored from the asset trees
    pub staging_dir: String,
    /// Plugin artifact directory inside the staging tree
    pub staging_modules_dir: String,
    /// Trees whose changes require a host rebuild
    pub source_roots: Vec<String>,
    pub source_extensions: Vec<String>,
    pub assets: Vec<AssetTreeConfig>,
}

/// A static asset tree copied verbatim into the staging tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssetTreeConfig {
    pub source: String,
    /// Destination relative to the staging directory
    pub target: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            modules_root: "contrib".to_string(),
            release_modules_dir: "dist/modules".to_string(),
            staging_dir: "dist.dev".to_string(),
            staging_modules_dir: "modules".to_string(),
            source_roots: vec!["application".to_string(), "core".to_string()],
            source_extensions: vec!["go".to_string()],
            assets: vec![
                AssetTreeConfig {
                    source: "application/admin".to_string(),
                    target: "admin".to_string(),
                },
                AssetTreeConfig {
                    source: "application/web".to_string(),
                    target: "web".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct WatchConfig {
    /// Window in which duplicate events for the same path are merged
    pub settle_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { settle_ms: 50 }
    }
}
