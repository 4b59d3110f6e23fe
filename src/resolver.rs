//! # Traversal and Resolution Engine
//!
//! This is the core of the crate: a deduplicating breadth-first discovery
//! of package sets starting from the workspace root.
//!
//! The root description seeds a FIFO frontier with its declared imports.
//! Each frontier entry is override-resolved, reduced to its repository
//! identity, and deduplicated: an identity is fetched and parsed at most
//! once per pass, later appearances only add cross-reference edges (and a
//! warning if the raw descriptor genuinely differs). Newly discovered
//! sets that participate in automatic import discovery enqueue their own
//! declared imports, so the frontier's edges are found incrementally.
//!
//! Once the frontier drains, the discovered vertex set is handed to
//! [`PackageSetHierarchy`] for the cycle check and the topological sort;
//! the returned [`Resolution`] lists the sets dependency-first with the
//! root last.
//!
//! Failures follow the keep-going policy: in fail-fast mode (default)
//! the first error aborts the pass; with `keep_going` each entry's
//! failure is reported, recorded, and traversal continues. Cancellation
//! is checked at every suspension point and always propagates, in either
//! mode.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::cancel::CancelToken;
use crate::config::{self, SetDescription};
use crate::error::{Error, Result};
use crate::hierarchy::PackageSetHierarchy;
use crate::overrides::OverrideConfig;
use crate::report::Reporter;
use crate::set::PackageSet;
use crate::source::SourceDescriptor;
use crate::transport::{FetchOptions, SourceTransport};

/// Options for one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Forbid network access; only existing checkouts are used.
    pub only_local: bool,
    /// Skip updating sets that already have a checkout.
    pub checkout_only: bool,
    /// Record per-set failures and continue instead of aborting.
    pub keep_going: bool,
    /// Discard local modifications in existing checkouts.
    pub reset: bool,
    /// Additional retry attempts for network operations.
    pub retries: u32,
}

/// One recorded failure from a keep-going pass.
#[derive(Debug)]
pub struct ImportFailure {
    pub source: SourceDescriptor,
    pub error: Error,
}

impl std::fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// The outcome of a resolution pass.
#[derive(Debug)]
pub struct Resolution {
    /// All resolved sets in topological order, root last.
    pub sets: Vec<PackageSet>,
    /// Failures recorded under keep-going. Empty in fail-fast mode.
    pub failures: Vec<ImportFailure>,
    /// Identities of the root's direct imports, in configuration order.
    pub direct_imports: Vec<String>,
}

impl Resolution {
    /// The root package set. Always present and always last.
    pub fn root(&self) -> &PackageSet {
        self.sets.last().expect("resolution always contains the root")
    }

    /// Raise the aggregate [`Error::ImportFailed`] if any failures were
    /// recorded. Callers that tolerate a partial workspace inspect
    /// `failures` instead.
    pub fn ensure_complete(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::ImportFailed {
                failures: self.failures.iter().map(|f| f.to_string()).collect(),
            })
        }
    }

    /// Rebuild the dependency graph over this resolution, for
    /// diagnostics and the `graph` command.
    pub fn hierarchy(&self) -> PackageSetHierarchy {
        PackageSetHierarchy::build(&self.sets, &self.root().identity(), &self.direct_imports)
    }
}

struct PendingImport {
    source: SourceDescriptor,
    checkout_only: bool,
    /// Identity of the set that declared this import.
    importer: String,
}

struct Discovery {
    sets: Vec<PackageSet>,
    by_identity: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    frontier: VecDeque<PendingImport>,
    failures: Vec<ImportFailure>,
    direct_imports: Vec<String>,
    root_key: String,
}

impl Discovery {
    /// Record the cross-reference edges between an importer and a
    /// resolved set.
    fn link(&mut self, importer: &str, resolved_index: usize) {
        let resolved_key = self.sets[resolved_index].identity();
        if resolved_key == importer {
            return;
        }
        self.sets[resolved_index]
            .imported_from
            .insert(importer.to_string());
        if let Some(&importer_index) = self.by_identity.get(importer) {
            self.sets[importer_index].imports.insert(resolved_key);
        }
    }

    /// Track the root's direct imports in configuration order; these
    /// become the positional edges of the hierarchy.
    fn note_direct(&mut self, importer: &str, key: &str) {
        if importer == self.root_key && !self.direct_imports.iter().any(|k| k == key) {
            self.direct_imports.push(key.to_string());
        }
    }
}

/// The traversal/resolution engine.
pub struct Resolver<'a> {
    transport: &'a dyn SourceTransport,
    reporter: &'a dyn Reporter,
    cancel: CancelToken,
}

impl<'a> Resolver<'a> {
    pub fn new(transport: &'a dyn SourceTransport, reporter: &'a dyn Reporter) -> Self {
        Self {
            transport,
            reporter,
            cancel: CancelToken::new(),
        }
    }

    /// Use a caller-provided cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run a full resolution pass rooted at `root_dir`.
    ///
    /// The root's description must load; everything downstream follows
    /// the keep-going policy in `options`.
    pub fn resolve(&self, root_dir: &Path, options: &ResolveOptions) -> Result<Resolution> {
        let root_dir = root_dir.canonicalize().map_err(|e| Error::ConfigParse {
            message: format!("workspace root {}: {}", root_dir.display(), e),
            hint: None,
        })?;
        let root_description = config::load(&root_dir)?;
        let root_source = SourceDescriptor::local(root_dir.clone());
        let root_key = root_source.identity();
        // Overrides are always evaluated relative to the top-level
        // configuration, whichever set declared the import.
        let scope = format!("pkg_set:{}", root_key);
        let overrides = OverrideConfig::new(root_description.overrides.clone());
        if !overrides.is_empty() {
            debug!("{} override rule(s) active", root_description.overrides.len());
        }

        let root_set = PackageSet::from_description(
            &root_description,
            root_dir.clone(),
            root_source,
            true,
        );

        let mut discovery = Discovery {
            sets: vec![root_set],
            by_identity: HashMap::from([(root_key.clone(), 0)]),
            by_name: HashMap::from([(root_description.name.clone(), 0)]),
            frontier: VecDeque::new(),
            failures: Vec::new(),
            direct_imports: Vec::new(),
            root_key: root_key.clone(),
        };

        if root_description.auto_import {
            enqueue_imports(
                &mut discovery.frontier,
                &root_description,
                &root_dir,
                &root_key,
            )?;
        } else {
            debug!("root has auto-import disabled; skipping transitive discovery");
        }

        while let Some(entry) = discovery.frontier.pop_front() {
            // Failures are recorded against the override-resolved
            // descriptor; that is the one the transport actually fetched
            // and the one the reaper must keep protecting.
            let resolved = overrides.resolve(&scope, &entry.source);
            match self.process_entry(&entry, &resolved, &mut discovery, options) {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if options.keep_going => {
                    self.reporter.import_failed(&resolved, &e);
                    discovery.failures.push(ImportFailure {
                        source: resolved,
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let hierarchy = PackageSetHierarchy::build(
            &discovery.sets,
            &root_key,
            &discovery.direct_imports,
        );
        hierarchy.verify_acyclic()?;
        let order = hierarchy.topological_order()?;

        let mut by_key: HashMap<String, PackageSet> = discovery
            .sets
            .into_iter()
            .map(|set| (set.identity(), set))
            .collect();
        let sets = order
            .iter()
            .map(|key| {
                by_key.remove(key).ok_or_else(|| Error::Internal {
                    message: format!("ordered vertex {} has no package set", key),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "resolved {} package set(s), {} failure(s)",
            sets.len(),
            discovery.failures.len()
        );
        Ok(Resolution {
            sets,
            failures: discovery.failures,
            direct_imports: discovery.direct_imports,
        })
    }

    fn process_entry(
        &self,
        entry: &PendingImport,
        resolved: &SourceDescriptor,
        discovery: &mut Discovery,
        options: &ResolveOptions,
    ) -> Result<()> {
        let key = resolved.identity();

        // Already processed: never re-fetched or re-parsed. Warn only on
        // a genuine conflicting redefinition, whoever imported it.
        if let Some(&index) = discovery.by_identity.get(&key) {
            if discovery.sets[index].source != *resolved {
                self.reporter
                    .identity_conflict(&key, &discovery.sets[index].source, resolved);
            }
            if entry.importer == discovery.root_key {
                discovery.sets[index].explicit = true;
            }
            discovery.link(&entry.importer, index);
            discovery.note_direct(&entry.importer, &key);
            return Ok(());
        }

        let mut stale = false;
        let dir = match resolved {
            SourceDescriptor::Local { path } => path.clone(),
            SourceDescriptor::Git { .. } => {
                let destination = self.transport.canonical_dir(resolved);
                self.cancel.check()?;
                self.reporter.fetching(resolved);
                let fetch_options = FetchOptions {
                    only_local: options.only_local,
                    checkout_only: options.checkout_only || entry.checkout_only,
                    reset: options.reset,
                    retries: options.retries,
                };
                if let Err(e) =
                    self.transport
                        .fetch_or_update(resolved, &destination, &fetch_options)
                {
                    if e.is_cancelled() || !options.keep_going {
                        return Err(e);
                    }
                    self.reporter.import_failed(resolved, &e);
                    discovery.failures.push(ImportFailure {
                        source: resolved.clone(),
                        error: e,
                    });
                    if !destination.join(config::DESCRIPTION_FILE).exists() {
                        // Unresolved: no content to explore.
                        return Ok(());
                    }
                    // A previous pass left a usable checkout; keep
                    // discovering from the stale content.
                    info!("using stale checkout for {}", resolved);
                    stale = true;
                }
                destination
            }
        };

        self.cancel.check()?;
        // The entry is already recorded as failed when the checkout is
        // stale; an unreadable stale description just means there is no
        // content to explore after all.
        let description = match config::load(&dir) {
            Ok(description) => description,
            Err(e) if stale && !e.is_cancelled() => {
                debug!("stale checkout for {} is unusable: {}", resolved, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // A different identity already claimed this name: the earlier
        // one stays canonical, only cross-references are recorded.
        if let Some(&existing) = discovery.by_name.get(&description.name) {
            if discovery.sets[existing].identity() != key {
                self.reporter.name_conflict(
                    &description.name,
                    &discovery.sets[existing].source,
                    resolved,
                );
                discovery.link(&entry.importer, existing);
                return Ok(());
            }
        }

        let explicit = entry.importer == discovery.root_key;
        let set = PackageSet::from_description(&description, dir.clone(), resolved.clone(), explicit);
        let index = discovery.sets.len();
        discovery.sets.push(set);
        discovery.by_identity.insert(key.clone(), index);
        discovery.by_name.insert(description.name.clone(), index);
        discovery.link(&entry.importer, index);
        discovery.note_direct(&entry.importer, &key);

        if description.auto_import {
            enqueue_imports(&mut discovery.frontier, &description, &dir, &key)?;
        } else {
            debug!("{} has auto-import disabled", description.name);
        }
        Ok(())
    }
}

/// Append a description's declared imports to the frontier.
fn enqueue_imports(
    frontier: &mut VecDeque<PendingImport>,
    description: &SetDescription,
    dir: &Path,
    importer: &str,
) -> Result<()> {
    for decl in &description.imports {
        let source = decl.descriptor()?.anchored_to(dir);
        frontier.push_back(PendingImport {
            source,
            checkout_only: decl.checkout_only,
            importer: importer.to_string(),
        });
    }
    Ok(())
}

/// Convenience wrapper: resolve with the default transport against a
/// cache root.
pub fn resolve_workspace(
    root_dir: &Path,
    cache_root: PathBuf,
    reporter: &dyn Reporter,
    cancel: CancelToken,
    options: &ResolveOptions,
) -> Result<Resolution> {
    let transport = crate::transport::GitTransport::new(cache_root);
    Resolver::new(&transport, reporter)
        .with_cancel_token(cancel)
        .resolve(root_dir, options)
}
