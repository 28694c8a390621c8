use std::path::{Path, PathBuf};

use crate::{
    assets::destination_for,
    config::{AssetTree, Config, ProjectPaths},
    watch::{WatchEvent, is_hidden_below},
};

/// What a change event asks the dev loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRoute {
    /// Copy the changed entry to `destination` in the staging tree
    SyncAsset { destination: PathBuf },
    /// Rebuild the host and restart it
    Rebuild,
    /// A plugin artifact was (re)written; the host picks it up itself
    PluginArtifact,
    Ignore,
}

/// The trees the dev loop watches and how each one is treated
#[derive(Debug, Clone)]
pub struct WatchLayout {
    source_roots: Vec<PathBuf>,
    source_extensions: Vec<String>,
    assets: Vec<AssetTree>,
    plugin_dir: PathBuf,
}

impl WatchLayout {
    pub fn new(
        source_roots: Vec<PathBuf>,
        source_extensions: Vec<String>,
        assets: Vec<AssetTree>,
        plugin_dir: PathBuf,
    ) -> Self {
        Self {
            source_roots,
            source_extensions,
            assets,
            plugin_dir,
        }
    }

    pub fn from_config(config: &Config, paths: &ProjectPaths) -> Self {
        Self::new(
            paths.source_roots.clone(),
            config.layout.source_extensions.clone(),
            paths.assets.clone(),
            paths.staging_modules_dir.clone(),
        )
    }

    /// Every directory that has to be watched, in routing priority order
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        self.assets
            .iter()
            .map(|tree| tree.source.clone())
            .chain(self.source_roots.iter().cloned())
            .chain(std::iter::once(self.plugin_dir.clone()))
            .collect()
    }

    /// Classify a change.
    ///
    /// Asset trees are checked before source roots since they may be nested
    /// inside one. Removals and hidden paths never lead to any action.
    pub fn route(&self, event: &WatchEvent) -> EventRoute {
        if !event.kind.is_content_change() {
            return EventRoute::Ignore;
        }
        let path = event.path.as_path();

        if let Some(tree) = self.assets.iter().find(|t| path.starts_with(&t.source)) {
            if is_hidden_below(path, &tree.source) {
                return EventRoute::Ignore;
            }
            return match destination_for(path, &tree.source, &tree.target) {
                Some(destination) => EventRoute::SyncAsset { destination },
                None => EventRoute::Ignore,
            };
        }

        if path.starts_with(&self.plugin_dir) {
            if is_hidden_below(path, &self.plugin_dir) {
                return EventRoute::Ignore;
            }
            return EventRoute::PluginArtifact;
        }

        if let Some(root) = self.source_roots.iter().find(|r| path.starts_with(r)) {
            if !is_hidden_below(path, root) && self.is_source_file(path) {
                return EventRoute::Rebuild;
            }
        }

        EventRoute::Ignore
    }

    fn is_source_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.source_extensions.iter().any(|wanted| wanted == ext)
    }
}
