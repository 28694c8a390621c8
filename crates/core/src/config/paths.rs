use std::path::{Path, PathBuf};

use super::Config;

/// A static asset tree resolved to absolute paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTree {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Every location devloop touches, resolved against the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub modules_root: PathBuf,
    pub release_modules_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub staging_modules_dir: PathBuf,
    pub host_entry: PathBuf,
    pub host_binary: PathBuf,
    pub source_roots: Vec<PathBuf>,
    pub assets: Vec<AssetTree>,
}

impl ProjectPaths {
    pub fn resolve(config: &Config, root: &Path) -> Self {
        let layout = &config.layout;
        let staging_dir = root.join(&layout.staging_dir);
        let binary_name = format!(
            "{}{}",
            config.host.binary_name,
            std::env::consts::EXE_SUFFIX
        );

        Self {
            root: root.to_path_buf(),
            modules_root: root.join(&layout.modules_root),
            release_modules_dir: root.join(&layout.release_modules_dir),
            staging_modules_dir: staging_dir.join(&layout.staging_modules_dir),
            host_entry: root.join(&config.host.entry_point),
            host_binary: staging_dir.join(binary_name),
            source_roots: layout.source_roots.iter().map(|r| root.join(r)).collect(),
            assets: layout
                .assets
                .iter()
                .map(|asset| AssetTree {
                    source: root.join(&asset.source),
                    target: staging_dir.join(&asset.target),
                })
                .collect(),
            staging_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default_layout() {
        let paths = ProjectPaths::resolve(&Config::default(), Path::new("/work/site"));

        assert_eq!(paths.modules_root, PathBuf::from("/work/site/contrib"));
        assert_eq!(paths.release_modules_dir, PathBuf::from("/work/site/dist/modules"));
        assert_eq!(paths.staging_dir, PathBuf::from("/work/site/dist.dev"));
        assert_eq!(
            paths.staging_modules_dir,
            PathBuf::from("/work/site/dist.dev/modules")
        );
        assert_eq!(
            paths.host_entry,
            PathBuf::from("/work/site/application/main.go")
        );
        assert!(paths.host_binary.starts_with("/work/site/dist.dev"));
        assert_eq!(
            paths.assets[1],
            AssetTree {
                source: PathBuf::from("/work/site/application/web"),
                target: PathBuf::from("/work/site/dist.dev/web"),
            }
        );
    }
}
