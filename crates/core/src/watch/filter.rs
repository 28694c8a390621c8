use std::path::{Path, PathBuf};

/// True when any component of `path` below `root` starts with a dot.
///
/// Components above the root are not inspected, so a root living under a
/// hidden directory still reports its own files.
pub fn is_hidden_below(path: &Path, root: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Drop roots nested inside another root and duplicates, keeping input order
pub fn collapse_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut collapsed: Vec<PathBuf> = Vec::new();
    for root in roots {
        let covered = roots
            .iter()
            .any(|other| other != root && root.starts_with(other));
        if !covered && !collapsed.contains(root) {
            collapsed.push(root.clone());
        }
    }
    collapsed
}

/// The most specific root containing `path`
pub fn owning_root<'a>(path: &Path, roots: &'a [PathBuf]) -> Option<&'a Path> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}
