//! Plugin module discovery under the contributed-modules root

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A plugin module: one directory under the modules root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub path: PathBuf,
    pub name: String,
}

impl ModuleDescriptor {
    /// Describe a module directory. Returns `None` for paths without a final segment.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            name,
        })
    }
}

/// List the immediate subdirectories of `modules_root`, sorted by name.
///
/// Hidden directories are skipped, as are plain files and symlinks.
pub fn discover_modules(modules_root: &Path) -> Result<Vec<ModuleDescriptor>> {
    if !modules_root.is_dir() {
        return Err(Error::Other(format!(
            "Modules root {} is not a directory",
            modules_root.display()
        )));
    }

    let mut modules = Vec::new();
    for entry in WalkDir::new(modules_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            debug!("Skipping hidden directory {}", entry.path().display());
            continue;
        }
        match ModuleDescriptor::from_path(entry.path()) {
            Some(module) => modules.push(module),
            None => debug!("Skipping non UTF-8 module path {}", entry.path().display()),
        }
    }

    debug!(
        "Discovered {} module(s) in {}",
        modules.len(),
        modules_root.display()
    );
    Ok(modules)
}

/// Resolve a module given by name (under `modules_root`) or by path
pub fn resolve_module(modules_root: &Path, name_or_path: &str) -> Result<ModuleDescriptor> {
    let by_name = modules_root.join(name_or_path);
    let candidate = if by_name.is_dir() {
        by_name
    } else {
        PathBuf::from(name_or_path)
    };

    if !candidate.is_dir() {
        return Err(Error::Other(format!(
            "Module `{name_or_path}` not found under {}",
            modules_root.display()
        )));
    }

    let candidate = std::path::absolute(&candidate)?;
    ModuleDescriptor::from_path(&candidate)
        .ok_or_else(|| Error::Other(format!("Invalid module path: {}", candidate.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_only_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("documents")).unwrap();
        fs::create_dir(root.join("disk-media")).unwrap();
        fs::write(root.join("README.md"), "not a module").unwrap();

        let modules = discover_modules(root).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();

        assert_eq!(names, vec!["disk-media", "documents"]);
        assert_eq!(modules[1].path, root.join("documents"));
    }

    #[test]
    fn test_discover_skips_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        fs::create_dir(temp_dir.path().join("documents")).unwrap();

        let modules = discover_modules(temp_dir.path()).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "documents");
    }

    #[test]
    fn test_discover_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_modules(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_modules(&temp_dir.path().join("contrib")).is_err());
    }

    #[test]
    fn test_resolve_module_by_name_and_path() {
        let temp_dir = TempDir::new().unwrap();
        let module_dir = temp_dir.path().join("documents");
        fs::create_dir(&module_dir).unwrap();

        let by_name = resolve_module(temp_dir.path(), "documents").unwrap();
        assert_eq!(by_name.name, "documents");
        assert_eq!(by_name.path, module_dir);

        let by_path = resolve_module(Path::new("/nonexistent"), module_dir.to_str().unwrap()).unwrap();
        assert_eq!(by_path.path, module_dir);

        assert!(resolve_module(temp_dir.path(), "missing").is_err());
    }
}
