//! # Stale-Entry Reaping
//!
//! After a resolution pass the workspace keeps two on-disk directories in
//! step with the result: the fetch cache (one checkout per remote
//! repository identity) and the link directory (one symlink per resolved
//! set, by logical name). Entries belonging to sets that dropped out of
//! the configuration are deleted; everything the current result still
//! needs is left alone.
//!
//! A set whose fetch failed this pass but whose checkout survives from an
//! earlier pass is *retained*: the failure list's descriptors count as
//! required, so a transient outage never costs the local copy. Reaping is
//! pure cleanup; its own failures are logged and never abort the caller.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::resolver::Resolution;

/// What a reap pass removed.
#[derive(Debug, Default)]
pub struct ReapStats {
    pub removed_checkouts: Vec<PathBuf>,
    pub removed_links: Vec<PathBuf>,
}

/// Create or refresh the per-name symlinks for every resolved set.
///
/// Run before [`reap`] so the link directory converges in one pass.
/// Like reaping, linking is cleanup: per-entry failures are logged and
/// never abort the caller.
#[cfg(unix)]
pub fn link_sets(links_dir: &Path, resolution: &Resolution) {
    if let Err(e) = fs::create_dir_all(links_dir) {
        warn!("cannot create link directory {}: {}", links_dir.display(), e);
        return;
    }
    for set in &resolution.sets {
        let link = links_dir.join(&set.name);
        if let Err(e) = link_one(&link, &set.dir) {
            warn!("could not link {}: {}", link.display(), e);
        }
    }
}

#[cfg(unix)]
fn link_one(link: &Path, target: &Path) -> std::io::Result<()> {
    match fs::read_link(link) {
        Ok(existing) if existing == target => return Ok(()),
        Ok(_) => fs::remove_file(link)?,
        // Something other than a symlink squats the name; clear it.
        Err(_) => match link.symlink_metadata() {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(link)?,
            Ok(_) => fs::remove_file(link)?,
            Err(_) => {}
        },
    }
    std::os::unix::fs::symlink(target, link)?;
    debug!("linked {} -> {}", link.display(), target.display());
    Ok(())
}

/// Name links are not maintained on platforms without symlinks.
#[cfg(not(unix))]
pub fn link_sets(_links_dir: &Path, _resolution: &Resolution) {}

/// Delete cache checkouts and name links no longer required by
/// `resolution`.
pub fn reap(cache_dir: &Path, links_dir: &Path, resolution: &Resolution) -> ReapStats {
    let mut required_checkouts: HashSet<String> = resolution
        .sets
        .iter()
        .filter(|set| !set.source.is_local())
        .map(|set| set.source.dir_name())
        .collect();
    // Failed-but-previously-fetched entries stay.
    required_checkouts.extend(
        resolution
            .failures
            .iter()
            .filter(|f| !f.source.is_local())
            .map(|f| f.source.dir_name()),
    );

    let required_names: HashSet<&str> =
        resolution.sets.iter().map(|set| set.name.as_str()).collect();

    let mut stats = ReapStats::default();
    reap_directory(cache_dir, &mut stats.removed_checkouts, |name| {
        required_checkouts.contains(name)
    });
    reap_directory(links_dir, &mut stats.removed_links, |name| {
        required_names.contains(name)
    });
    stats
}

fn reap_directory<F>(dir: &Path, removed: &mut Vec<PathBuf>, required: F)
where
    F: Fn(&str) -> bool,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // A directory that does not exist yet has nothing to reap.
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        if required(&name.to_string_lossy()) {
            continue;
        }
        let result = if path.symlink_metadata().map(|m| m.is_dir()).unwrap_or(false) {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => {
                debug!("reaped stale entry {}", path.display());
                removed.push(path);
            }
            Err(e) => warn!("could not reap {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resolver::ImportFailure;
    use crate::set::PackageSet;
    use crate::source::SourceDescriptor;
    use std::collections::BTreeSet;
    use url::Url;

    fn remote_set(name: &str, url: &str) -> PackageSet {
        let source = SourceDescriptor::git(Url::parse(url).unwrap(), "main");
        PackageSet {
            name: name.to_string(),
            dir: PathBuf::from("/tmp").join(source.dir_name()),
            source,
            auto_import: true,
            explicit: false,
            imported_from: BTreeSet::new(),
            imports: BTreeSet::new(),
            os_dependency_files: vec![],
            recipe_files: vec![],
        }
    }

    fn resolution(sets: Vec<PackageSet>, failures: Vec<ImportFailure>) -> Resolution {
        Resolution {
            sets,
            failures,
            direct_imports: vec![],
        }
    }

    #[test]
    fn test_reap_keeps_required_and_removes_orphans() {
        let cache = tempfile::tempdir().unwrap();
        let links = tempfile::tempdir().unwrap();
        let kept = remote_set("kept", "https://example.com/kept.git");
        fs::create_dir_all(cache.path().join(kept.source.dir_name())).unwrap();
        fs::create_dir_all(cache.path().join("orphan-abc123")).unwrap();

        let stats = reap(cache.path(), links.path(), &resolution(vec![kept.clone()], vec![]));

        assert!(cache.path().join(kept.source.dir_name()).exists());
        assert!(!cache.path().join("orphan-abc123").exists());
        assert_eq!(stats.removed_checkouts.len(), 1);
    }

    #[test]
    fn test_reap_retains_failed_but_previously_fetched() {
        let cache = tempfile::tempdir().unwrap();
        let links = tempfile::tempdir().unwrap();
        let failed_source =
            SourceDescriptor::git(Url::parse("https://example.com/flaky.git").unwrap(), "main");
        fs::create_dir_all(cache.path().join(failed_source.dir_name())).unwrap();

        let failures = vec![ImportFailure {
            source: failed_source.clone(),
            error: Error::Transport {
                descriptor: failed_source.to_string(),
                message: "unreachable".to_string(),
            },
        }];
        reap(cache.path(), links.path(), &resolution(vec![], failures));

        assert!(cache.path().join(failed_source.dir_name()).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_reap_removes_stale_links() {
        let cache = tempfile::tempdir().unwrap();
        let links = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(target.path(), links.path().join("gone")).unwrap();

        let stats = reap(cache.path(), links.path(), &resolution(vec![], vec![]));
        assert!(!links.path().join("gone").symlink_metadata().is_ok());
        assert_eq!(stats.removed_links.len(), 1);
    }

    #[test]
    fn test_reap_missing_directories_is_noop() {
        let resolution = resolution(vec![], vec![]);
        let stats = reap(
            Path::new("/nonexistent/cache"),
            Path::new("/nonexistent/links"),
            &resolution,
        );
        assert!(stats.removed_checkouts.is_empty());
        assert!(stats.removed_links.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_sets_creates_and_refreshes() {
        let links = tempfile::tempdir().unwrap();
        let content_a = tempfile::tempdir().unwrap();
        let content_b = tempfile::tempdir().unwrap();

        let mut set = remote_set("base", "https://example.com/base.git");
        set.dir = content_a.path().to_path_buf();
        link_sets(links.path(), &resolution(vec![set.clone()], vec![]));
        assert_eq!(
            fs::read_link(links.path().join("base")).unwrap(),
            content_a.path()
        );

        // Same name, new target: the link is repointed.
        set.dir = content_b.path().to_path_buf();
        link_sets(links.path(), &resolution(vec![set], vec![]));
        assert_eq!(
            fs::read_link(links.path().join("base")).unwrap(),
            content_b.path()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_link_sets_replaces_squatting_entries() {
        let links = tempfile::tempdir().unwrap();
        let content = tempfile::tempdir().unwrap();

        // A plain file and a directory already occupy the link names.
        fs::write(links.path().join("file-squat"), "not a link").unwrap();
        fs::create_dir_all(links.path().join("dir-squat/nested")).unwrap();

        let mut a = remote_set("file-squat", "https://example.com/a.git");
        a.dir = content.path().to_path_buf();
        let mut b = remote_set("dir-squat", "https://example.com/b.git");
        b.dir = content.path().to_path_buf();
        link_sets(links.path(), &resolution(vec![a, b], vec![]));

        for name in ["file-squat", "dir-squat"] {
            let link = links.path().join(name);
            assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
            assert_eq!(fs::read_link(&link).unwrap(), content.path());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_link_then_reap_converges() {
        let cache = tempfile::tempdir().unwrap();
        let links = tempfile::tempdir().unwrap();
        let content = tempfile::tempdir().unwrap();

        let mut old = remote_set("old", "https://example.com/old.git");
        old.dir = content.path().to_path_buf();
        link_sets(links.path(), &resolution(vec![old], vec![]));

        let mut new = remote_set("new", "https://example.com/new.git");
        new.dir = content.path().to_path_buf();
        let current = resolution(vec![new], vec![]);
        link_sets(links.path(), &current);
        reap(cache.path(), links.path(), &current);

        assert!(links.path().join("new").symlink_metadata().is_ok());
        assert!(links.path().join("old").symlink_metadata().is_err());
    }
}
