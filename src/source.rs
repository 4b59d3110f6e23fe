//! # Source Descriptors and Repository Identity
//!
//! A [`SourceDescriptor`] says where a package set's content comes from:
//! a local directory (no fetch needed) or a remote Git repository at a
//! specific rev. Descriptors are immutable once constructed.
//!
//! Deduplication during resolution is keyed by the **repository identity**,
//! a canonical string derived from the descriptor. Two descriptors that
//! differ superficially (URL casing, a trailing `.git`, a trailing slash)
//! share an identity and are fetched at most once per pass. The identity is
//! deliberately not the set's logical name: two different identities can
//! declare the same name, which the resolver handles as a non-fatal
//! conflict.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Where a package set's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceDescriptor {
    /// A remote Git repository at a specific rev (branch, tag, or commit).
    Git {
        url: Url,
        #[serde(rename = "ref")]
        rev: String,
    },
    /// A directory on the local filesystem. Never fetched.
    Local { path: PathBuf },
}

impl SourceDescriptor {
    /// Construct a Git descriptor from an already-parsed URL.
    pub fn git(url: Url, rev: impl Into<String>) -> Self {
        SourceDescriptor::Git {
            url,
            rev: rev.into(),
        }
    }

    /// Construct a local descriptor.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::Local { path: path.into() }
    }

    /// Whether this descriptor needs no fetch.
    pub fn is_local(&self) -> bool {
        matches!(self, SourceDescriptor::Local { .. })
    }

    /// Canonical repository identity key.
    ///
    /// Pure and deterministic: equal descriptors always produce equal keys,
    /// and superficial URL differences (host casing, trailing `.git`,
    /// trailing slashes) are normalized away. Performs no I/O, so local
    /// paths are normalized lexically only.
    pub fn identity(&self) -> String {
        match self {
            SourceDescriptor::Git { url, rev } => {
                let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
                let port = url
                    .port()
                    .map(|p| format!(":{}", p))
                    .unwrap_or_default();
                let path = url
                    .path()
                    .trim_end_matches('/')
                    .trim_end_matches(".git")
                    .trim_end_matches('/');
                format!("git:{}://{}{}{}#{}", url.scheme(), host, port, path, rev)
            }
            SourceDescriptor::Local { path } => {
                format!("local:{}", normalize_lexically(path).display())
            }
        }
    }

    /// A filesystem-safe directory name for this descriptor, unique per
    /// identity. Used by the transport for the on-disk fetch cache and by
    /// the reaper to recognize which cache entries are still required.
    pub fn dir_name(&self) -> String {
        let identity = self.identity();
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        let stem = match self {
            SourceDescriptor::Git { url, rev } => {
                let last = url
                    .path_segments()
                    .and_then(|mut s| s.next_back())
                    .unwrap_or("repo")
                    .trim_end_matches(".git");
                format!("{}-{}", last, rev.replace('/', "-"))
            }
            SourceDescriptor::Local { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "local".to_string()),
        };
        format!("{}-{:x}", stem, hasher.finish())
    }

    /// Resolve a relative local path against the importing set's directory.
    /// Git descriptors are returned unchanged.
    pub fn anchored_to(&self, base: &Path) -> Self {
        match self {
            SourceDescriptor::Local { path } if path.is_relative() => {
                SourceDescriptor::Local {
                    path: base.join(path),
                }
            }
            other => other.clone(),
        }
    }
}

impl std::fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceDescriptor::Git { url, rev } => write!(f, "{}@{}", url, rev),
            SourceDescriptor::Local { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Lexical path normalization: collapses `.` and `..` components without
/// consulting the filesystem. Symlink-accurate canonicalization is not
/// wanted here, identity must be computable for paths that do not exist
/// yet.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git(url: &str, rev: &str) -> SourceDescriptor {
        SourceDescriptor::git(Url::parse(url).unwrap(), rev)
    }

    #[test]
    fn test_identity_deterministic() {
        let a = git("https://github.com/example/sets.git", "main");
        let b = git("https://github.com/example/sets.git", "main");
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_normalizes_superficial_differences() {
        let a = git("https://github.com/example/sets.git", "main");
        let b = git("https://GITHUB.COM/example/sets", "main");
        let c = git("https://github.com/example/sets/", "main");
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.identity(), c.identity());
    }

    #[test]
    fn test_identity_distinguishes_rev() {
        let a = git("https://github.com/example/sets.git", "main");
        let b = git("https://github.com/example/sets.git", "v2");
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_distinguishes_repos() {
        let a = git("https://github.com/example/one.git", "main");
        let b = git("https://github.com/example/two.git", "main");
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_local_identity_lexical_normalization() {
        let a = SourceDescriptor::local("/srv/sets/./base");
        let b = SourceDescriptor::local("/srv/sets/extra/../base");
        assert_eq!(a.identity(), b.identity());
        assert!(a.identity().starts_with("local:"));
    }

    #[test]
    fn test_is_local() {
        assert!(SourceDescriptor::local("/tmp/x").is_local());
        assert!(!git("https://example.com/r.git", "main").is_local());
    }

    #[test]
    fn test_dir_name_stable_and_distinct() {
        let a = git("https://github.com/example/sets.git", "main");
        let b = git("https://github.com/example/sets.git", "v2");
        assert_eq!(a.dir_name(), a.dir_name());
        assert_ne!(a.dir_name(), b.dir_name());
        assert!(a.dir_name().starts_with("sets-main-"));
    }

    #[test]
    fn test_dir_name_sanitizes_rev_slashes() {
        let a = git("https://github.com/example/sets.git", "feature/fast");
        assert!(!a.dir_name().contains('/'));
    }

    #[test]
    fn test_anchored_to_relative_local() {
        let d = SourceDescriptor::local("nested/set");
        let anchored = d.anchored_to(Path::new("/srv/workspace"));
        assert_eq!(
            anchored,
            SourceDescriptor::local("/srv/workspace/nested/set")
        );
    }

    #[test]
    fn test_anchored_to_leaves_absolute_and_git_alone() {
        let d = SourceDescriptor::local("/srv/other");
        assert_eq!(d.anchored_to(Path::new("/elsewhere")), d);
        let g = git("https://example.com/r.git", "main");
        assert_eq!(g.anchored_to(Path::new("/elsewhere")), g);
    }

    #[test]
    fn test_display() {
        let g = git("https://example.com/r.git", "main");
        assert_eq!(format!("{}", g), "https://example.com/r.git@main");
    }
}
