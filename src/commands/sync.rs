//! # Sync Command Implementation
//!
//! Runs a full resolution pass against a workspace: discovers the
//! transitive closure of package sets from the root `pkgset.yaml`,
//! fetches or updates each remote set exactly once, computes the
//! dependency-respecting load order, refreshes the per-name symlinks,
//! and reaps on-disk entries that no longer belong to the workspace.
//!
//! Failures are printed as they occur; with `--keep-going` the pass
//! continues past them and the command exits non-zero with an aggregate
//! error at the end.

use anyhow::Result;
use clap::Args;
use console::style;
use std::path::PathBuf;

use pkgset::cancel::CancelToken;
use pkgset::output::OutputConfig;
use pkgset::reaper;
use pkgset::report::Reporter;
use pkgset::resolver::{resolve_workspace, ResolveOptions};
use pkgset::source::SourceDescriptor;
use pkgset::workspace::Workspace;

/// Resolve the workspace and bring the on-disk state in step
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Workspace root directory (must contain pkgset.yaml).
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// The root directory for the fetch cache.
    ///
    /// If not provided, it defaults to the system's cache directory
    /// (e.g., `~/.cache/pkgset/sets` on Linux).
    /// Can also be set with the `PKGSET_CACHE` environment variable.
    #[arg(long, value_name = "DIR", env = "PKGSET_CACHE")]
    pub cache_dir: Option<PathBuf>,

    /// Forbid network access; use only existing checkouts.
    #[arg(long)]
    pub only_local: bool,

    /// Skip updating sets that already have a checkout.
    #[arg(long)]
    pub checkout_only: bool,

    /// Continue past individual fetch failures and report them all.
    #[arg(short, long)]
    pub keep_going: bool,

    /// Discard local modifications in existing checkouts.
    #[arg(long)]
    pub reset: bool,

    /// Additional retry attempts for network operations.
    #[arg(long, value_name = "NUM", default_value_t = 2)]
    pub retries: u32,
}

/// Reporter that prints progress and failures to the terminal, in
/// addition to the log.
struct CliReporter {
    output: OutputConfig,
}

impl CliReporter {
    fn paint_err(&self, text: &str) -> String {
        if self.output.use_color {
            style(text).red().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_warn(&self, text: &str) -> String {
        if self.output.use_color {
            style(text).yellow().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Reporter for CliReporter {
    fn fetching(&self, source: &SourceDescriptor) {
        println!("Fetching {}", source);
    }

    fn import_failed(&self, source: &SourceDescriptor, error: &pkgset::Error) {
        eprintln!("{} {}: {}", self.paint_err("import failed:"), source, error);
    }

    fn identity_conflict(
        &self,
        identity: &str,
        kept: &SourceDescriptor,
        ignored: &SourceDescriptor,
    ) {
        eprintln!(
            "{} conflicting sources for {}: keeping {}, ignoring {}",
            self.paint_warn("warning:"),
            identity,
            kept,
            ignored
        );
    }

    fn name_conflict(&self, name: &str, kept: &SourceDescriptor, ignored: &SourceDescriptor) {
        eprintln!(
            "{} package set '{}' defined by both {} and {}: keeping the first",
            self.paint_warn("warning:"),
            name,
            kept,
            ignored
        );
    }
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, output: &OutputConfig) -> Result<()> {
    let workspace = Workspace::new(args.workspace, args.cache_dir);
    workspace.ensure_layout()?;

    let options = ResolveOptions {
        only_local: args.only_local,
        checkout_only: args.checkout_only,
        keep_going: args.keep_going,
        reset: args.reset,
        retries: args.retries,
    };
    let reporter = CliReporter {
        output: output.clone(),
    };

    let resolution = resolve_workspace(
        &workspace.root_dir,
        workspace.cache_dir.clone(),
        &reporter,
        CancelToken::new(),
        &options,
    )?;

    reaper::link_sets(&workspace.links_dir, &resolution);
    let stats = reaper::reap(&workspace.cache_dir, &workspace.links_dir, &resolution);
    if !stats.removed_checkouts.is_empty() || !stats.removed_links.is_empty() {
        println!(
            "Reaped {} stale checkout(s), {} stale link(s)",
            stats.removed_checkouts.len(),
            stats.removed_links.len()
        );
    }

    println!("Resolved {} package set(s):", resolution.sets.len());
    for set in &resolution.sets {
        println!("  {}", set.name);
    }

    if !resolution.failures.is_empty() {
        eprintln!(
            "{} {} import(s) failed",
            reporter.paint_err("error:"),
            resolution.failures.len()
        );
    }
    resolution.ensure_complete()?;
    Ok(())
}
