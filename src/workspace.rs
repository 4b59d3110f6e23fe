//! # Workspace Layout
//!
//! A workspace is the directory holding the root `pkgset.yaml`, plus two
//! managed directories: the fetch cache (checkouts of remote package
//! sets, keyed by repository identity) and the link directory
//! (`pkgsets/`, one symlink per resolved set by name, the user-facing
//! view). The cache defaults to the per-user cache directory and can be
//! overridden per invocation.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the user-facing link directory inside the workspace root.
pub const LINKS_DIR: &str = "pkgsets";

/// On-disk layout of one workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory containing the root description file.
    pub root_dir: PathBuf,
    /// Fetch cache for remote package sets.
    pub cache_dir: PathBuf,
    /// Per-name symlinks to resolved sets.
    pub links_dir: PathBuf,
}

impl Workspace {
    pub fn new(root_dir: impl Into<PathBuf>, cache_dir: Option<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            links_dir: root_dir.join(LINKS_DIR),
            cache_dir: cache_dir.unwrap_or_else(default_cache_dir),
            root_dir,
        }
    }

    /// Create the managed directories if missing.
    pub fn ensure_layout(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.links_dir)?;
        Ok(())
    }
}

/// Default fetch-cache location, e.g. `~/.cache/pkgset/sets` on Linux.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".pkgset-cache"))
        .join("pkgset")
        .join("sets")
}

/// Whether `dir` looks like a workspace root.
pub fn is_workspace_root(dir: &Path) -> bool {
    dir.join(crate::config::DESCRIPTION_FILE).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_defaults() {
        let workspace = Workspace::new("/srv/ws", None);
        assert_eq!(workspace.root_dir, PathBuf::from("/srv/ws"));
        assert_eq!(workspace.links_dir, PathBuf::from("/srv/ws/pkgsets"));
        assert!(workspace.cache_dir.ends_with("pkgset/sets"));
    }

    #[test]
    fn test_explicit_cache_dir() {
        let workspace = Workspace::new("/srv/ws", Some(PathBuf::from("/var/cache/sets")));
        assert_eq!(workspace.cache_dir, PathBuf::from("/var/cache/sets"));
    }

    #[test]
    fn test_ensure_layout_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(
            dir.path().join("ws"),
            Some(dir.path().join("cache")),
        );
        workspace.ensure_layout().unwrap();
        assert!(workspace.cache_dir.is_dir());
        assert!(workspace.links_dir.is_dir());
    }

    #[test]
    fn test_is_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_workspace_root(dir.path()));
        std::fs::write(dir.path().join("pkgset.yaml"), "name: ws\n").unwrap();
        assert!(is_workspace_root(dir.path()));
    }
}
