//! # Package Set Model
//!
//! A [`PackageSet`] is one resolved vertex of the workspace: a named
//! bundle of package metadata living in a directory on disk, together
//! with the source it came from and the identity-keyed edges to the sets
//! that imported it and the sets it imports.
//!
//! Edges are stored as repository identity keys rather than references to
//! other sets. The dependency graph is built from these keys in a single
//! pass after discovery finishes, which keeps the model free of cyclic
//! ownership and makes cycle detection a pure function over a frozen
//! snapshot.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::SetDescription;
use crate::source::SourceDescriptor;

/// One resolved package set.
#[derive(Debug, Clone, Serialize)]
pub struct PackageSet {
    /// Logical name from the set's description. Not unique by
    /// construction; name conflicts are warned about and first-seen wins.
    pub name: String,
    /// Directory holding the set's content.
    pub dir: PathBuf,
    /// Where the content came from.
    pub source: SourceDescriptor,
    /// Whether this set's own declared imports are discovered
    /// transitively.
    pub auto_import: bool,
    /// True when the root configuration requested this set directly (or
    /// it is the root itself), false when it was pulled in transitively.
    pub explicit: bool,
    /// Identities of the sets that imported this one.
    pub imported_from: BTreeSet<String>,
    /// Identities of the sets this one pulled in.
    pub imports: BTreeSet<String>,
    /// OS-dependency files carried for downstream consumers.
    pub os_dependency_files: Vec<PathBuf>,
    /// Build-recipe files carried for downstream consumers.
    pub recipe_files: Vec<PathBuf>,
}

impl PackageSet {
    /// Build a set from its loaded description.
    pub fn from_description(
        description: &SetDescription,
        dir: PathBuf,
        source: SourceDescriptor,
        explicit: bool,
    ) -> Self {
        Self {
            name: description.name.clone(),
            dir,
            source,
            auto_import: description.auto_import,
            explicit,
            imported_from: BTreeSet::new(),
            imports: BTreeSet::new(),
            os_dependency_files: description.os_dependencies.clone(),
            recipe_files: description.recipes.clone(),
        }
    }

    /// The repository identity key this set is deduplicated by.
    pub fn identity(&self) -> String {
        self.source.identity()
    }
}
