//! Mirroring of static asset trees into the staging tree

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    config::AssetTree,
    error::{Error, Result},
};

/// Summary of a recursive copy
#[derive(Debug, Default)]
pub struct SyncReport {
    pub files_copied: usize,
    pub dirs_created: usize,
    /// Entries that could not be copied. The copy carries on past them.
    pub failures: Vec<Error>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Map `path` under `source_root` to the same relative location under `target_root`
pub fn destination_for(path: &Path, source_root: &Path, target_root: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(source_root).ok()?;
    Some(target_root.join(relative))
}

#[derive(Debug, Clone, Default)]
pub struct AssetSynchronizer {
    trees: Vec<AssetTree>,
}

impl AssetSynchronizer {
    pub fn new(trees: Vec<AssetTree>) -> Self {
        Self { trees }
    }

    pub fn trees(&self) -> &[AssetTree] {
        &self.trees
    }

    /// The asset tree containing `path`, if any
    pub fn tree_for(&self, path: &Path) -> Option<&AssetTree> {
        self.trees.iter().find(|tree| path.starts_with(&tree.source))
    }

    /// Copy every configured tree. Missing source trees are skipped with a warning.
    pub fn sync_all(&self) -> SyncReport {
        let mut total = SyncReport::default();
        for tree in &self.trees {
            if !tree.source.is_dir() {
                warn!(
                    "Asset tree {} does not exist, skipping",
                    tree.source.display()
                );
                continue;
            }
            let report = sync_tree(&tree.source, &tree.target);
            total.files_copied += report.files_copied;
            total.dirs_created += report.dirs_created;
            total.failures.extend(report.failures);
        }
        total
    }

    /// Copy one changed entry to its staging location and return the destination.
    ///
    /// Directories are copied recursively; partial failures inside them are logged.
    pub fn sync_path(&self, path: &Path) -> Result<PathBuf> {
        let tree = self.tree_for(path).ok_or_else(|| {
            Error::Other(format!("{} is not inside an asset tree", path.display()))
        })?;
        let destination = destination_for(path, &tree.source, &tree.target)
            .ok_or_else(|| Error::Other(format!("Cannot map {}", path.display())))?;

        if path.is_dir() {
            let report = sync_tree(path, &destination);
            for failure in &report.failures {
                warn!("{}", failure);
            }
            return Ok(destination);
        }

        copy_file(path, &destination)?;
        Ok(destination)
    }
}

/// Recursively copy `source` into `target`, creating directories on demand.
///
/// Entries are visited in name order. A failing entry is recorded in the
/// report and the walk continues with the next one.
pub fn sync_tree(source: &Path, target: &Path) -> SyncReport {
    let mut report = SyncReport::default();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let from = e.path().unwrap_or(source).to_path_buf();
                report.failures.push(Error::AssetCopyError {
                    to: target.to_path_buf(),
                    from,
                    source: e.into(),
                });
                continue;
            }
        };

        let Some(destination) = destination_for(entry.path(), source, target) else {
            continue;
        };

        if entry.file_type().is_dir() {
            if !destination.is_dir() {
                match fs::create_dir_all(&destination) {
                    Ok(()) => report.dirs_created += 1,
                    Err(e) => report.failures.push(Error::AssetCopyError {
                        from: entry.path().to_path_buf(),
                        to: destination,
                        source: e,
                    }),
                }
            }
            continue;
        }

        match copy_file(entry.path(), &destination) {
            Ok(()) => report.files_copied += 1,
            Err(e) => report.failures.push(e),
        }
    }

    debug!(
        "Synced {} -> {}: {} file(s), {} new dir(s), {} failure(s)",
        source.display(),
        target.display(),
        report.files_copied,
        report.dirs_created,
        report.failures.len()
    );
    report
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let wrap = |source| Error::AssetCopyError {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::copy(from, to).map_err(wrap)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn web_tree(root: &Path) -> AssetTree {
        AssetTree {
            source: root.join("application").join("web"),
            target: root.join("dist.dev").join("web"),
        }
    }

    #[test]
    fn test_destination_for() {
        let dest = destination_for(
            Path::new("/p/application/web/css/site.css"),
            Path::new("/p/application/web"),
            Path::new("/p/dist.dev/web"),
        );
        assert_eq!(dest, Some(PathBuf::from("/p/dist.dev/web/css/site.css")));
        assert_eq!(
            destination_for(Path::new("/p/core/x.go"), Path::new("/p/application/web"), Path::new("/t")),
            None
        );
    }

    #[test]
    fn test_sync_tree_preserves_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let tree = web_tree(temp_dir.path());
        fs::create_dir_all(tree.source.join("js").join("elements")).unwrap();
        fs::write(tree.source.join("index.html"), "<html>").unwrap();
        fs::write(tree.source.join("js").join("elements").join("table.js"), "x").unwrap();
        fs::write(tree.source.join(".keep"), "").unwrap();

        let report = sync_tree(&tree.source, &tree.target);

        assert!(report.is_complete());
        assert_eq!(report.files_copied, 3);
        assert_eq!(
            fs::read_to_string(tree.target.join("index.html")).unwrap(),
            "<html>"
        );
        assert!(tree.target.join("js/elements/table.js").exists());
        assert!(tree.target.join(".keep").exists());
    }

    #[test]
    fn test_sync_tree_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let tree = web_tree(temp_dir.path());
        fs::create_dir_all(&tree.source).unwrap();
        fs::write(tree.source.join("index.html"), "v1").unwrap();

        sync_tree(&tree.source, &tree.target);
        fs::write(tree.source.join("index.html"), "v2").unwrap();
        let second = sync_tree(&tree.source, &tree.target);

        assert_eq!(second.dirs_created, 0);
        assert_eq!(
            fs::read_to_string(tree.target.join("index.html")).unwrap(),
            "v2"
        );
    }

    #[test]
    fn test_sync_path_copies_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let tree = web_tree(temp_dir.path());
        fs::create_dir_all(tree.source.join("img")).unwrap();
        let changed = tree.source.join("img").join("logo.svg");
        fs::write(&changed, "<svg/>").unwrap();

        let sync = AssetSynchronizer::new(vec![tree.clone()]);
        let dest = sync.sync_path(&changed).unwrap();

        assert_eq!(dest, tree.target.join("img").join("logo.svg"));
        assert_eq!(fs::read_to_string(dest).unwrap(), "<svg/>");
    }

    #[test]
    fn test_sync_path_vanished_source_is_copy_error() {
        let temp_dir = TempDir::new().unwrap();
        let tree = web_tree(temp_dir.path());
        let sync = AssetSynchronizer::new(vec![tree.clone()]);

        let err = sync.sync_path(&tree.source.join("gone.css")).unwrap_err();
        assert!(matches!(err, Error::AssetCopyError { .. }));
    }

    #[test]
    fn test_sync_path_outside_trees_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let sync = AssetSynchronizer::new(vec![web_tree(temp_dir.path())]);
        assert!(sync.sync_path(&temp_dir.path().join("core/main.go")).is_err());
    }

    #[test]
    fn test_sync_all_skips_missing_trees() {
        let temp_dir = TempDir::new().unwrap();
        let web = web_tree(temp_dir.path());
        fs::create_dir_all(&web.source).unwrap();
        fs::write(web.source.join("index.html"), "ok").unwrap();
        let admin = AssetTree {
            source: temp_dir.path().join("application/admin"),
            target: temp_dir.path().join("dist.dev/admin"),
        };

        let report = AssetSynchronizer::new(vec![admin, web]).sync_all();

        assert!(report.is_complete());
        assert_eq!(report.files_copied, 1);
    }
}
