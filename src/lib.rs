//! # pkgset Library
//!
//! Core functionality for resolving a workspace configuration over
//! multiple package-set repositories. A workspace's root `pkgset.yaml`
//! declares imports of further package sets (bundles of package
//! definitions, OS-dependency metadata, and build recipes fetched from
//! version control); this library discovers the full transitive closure
//! of those sets, fetches each one exactly once, rejects cyclic
//! dependencies, and produces a deterministic, dependency-respecting
//! load order.
//!
//! ## Quick Example
//!
//! ```
//! use pkgset::source::SourceDescriptor;
//! use url::Url;
//!
//! // Descriptors are deduplicated by repository identity, which
//! // normalizes superficial URL differences.
//! let a = SourceDescriptor::git(
//!     Url::parse("https://github.com/example/base-sets.git").unwrap(),
//!     "main",
//! );
//! let b = SourceDescriptor::git(
//!     Url::parse("https://GitHub.com/example/base-sets").unwrap(),
//!     "main",
//! );
//! assert_eq!(a.identity(), b.identity());
//! ```
//!
//! ## Core Concepts
//!
//! - **Source descriptors (`source`)**: where a set's content comes from,
//!   and the canonical repository identity used for deduplication.
//! - **Descriptions (`config`)**: the `pkgset.yaml` schema each set
//!   carries, declaring its name, imports, OS-dependency files, and
//!   build-recipe files.
//! - **Resolution (`resolver`)**: the deduplicating breadth-first
//!   traversal over a frontier whose edges are discovered incrementally,
//!   with a fail-fast or keep-going failure policy.
//! - **Hierarchy (`hierarchy`)**: the dependency graph built after
//!   discovery, cycle detection, and the topological load order (root
//!   last).
//! - **Transport (`transport`)**: the version-control fetch capability,
//!   kept behind a trait so tests can script it.
//! - **Reaping (`reaper`)**: cleanup of on-disk checkouts and name links
//!   that no longer correspond to any resolved set.

pub mod cancel;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod output;
pub mod overrides;
pub mod reaper;
pub mod report;
pub mod resolver;
pub mod set;
pub mod source;
pub mod transport;
pub mod workspace;

pub use error::{Error, Result};
