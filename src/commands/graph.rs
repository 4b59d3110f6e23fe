//! # Graph Command Implementation
//!
//! Displays the resolved package-set dependency graph, either as a tree
//! rooted at the workspace (children are the sets each set imports) or
//! as JSON for tooling.
//!
//! This command never touches the network: it resolves with the
//! only-local and keep-going policies so whatever checkouts exist are
//! used as-is.

use anyhow::Result;
use clap::{Args, ValueEnum};
use ptree::{print_tree, TreeItem};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use pkgset::cancel::CancelToken;
use pkgset::hierarchy::EdgeOrigin;
use pkgset::report::LogReporter;
use pkgset::resolver::{resolve_workspace, Resolution, ResolveOptions};
use pkgset::set::PackageSet;
use pkgset::workspace::Workspace;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GraphFormat {
    /// Hierarchical tree rendering
    Tree,
    /// Machine-readable JSON
    Json,
}

/// Display the package-set dependency graph
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Workspace root directory (must contain pkgset.yaml).
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// The root directory for the fetch cache.
    #[arg(long, value_name = "DIR", env = "PKGSET_CACHE")]
    pub cache_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = GraphFormat::Tree)]
    pub format: GraphFormat,
}

/// Execute the `graph` command.
pub fn execute(args: GraphArgs) -> Result<()> {
    let workspace = Workspace::new(args.workspace, args.cache_dir);
    let options = ResolveOptions {
        only_local: true,
        keep_going: true,
        ..ResolveOptions::default()
    };
    let resolution = resolve_workspace(
        &workspace.root_dir,
        workspace.cache_dir.clone(),
        &LogReporter,
        CancelToken::new(),
        &options,
    )?;

    match args.format {
        GraphFormat::Tree => {
            let by_identity: BTreeMap<String, &PackageSet> = resolution
                .sets
                .iter()
                .map(|set| (set.identity(), set))
                .collect();
            let tree = build_tree_node(resolution.root(), &by_identity, &mut Vec::new());
            print_tree(&tree)?;
        }
        GraphFormat::Json => {
            let export = GraphExport::from_resolution(&resolution);
            println!("{}", serde_json::to_string_pretty(&export)?);
        }
    }
    Ok(())
}

/// JSON export of the graph: one record per set, the load order, and the
/// dependency edges with their origin.
#[derive(Debug, Serialize)]
struct GraphExport<'a> {
    load_order: Vec<&'a str>,
    sets: &'a [PackageSet],
    edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize)]
struct GraphEdge {
    dependency: String,
    dependent: String,
    origin: &'static str,
}

impl<'a> GraphExport<'a> {
    fn from_resolution(resolution: &'a Resolution) -> Self {
        let hierarchy = resolution.hierarchy();
        let edges = hierarchy
            .edges()
            .map(|(from, to, origin)| GraphEdge {
                dependency: hierarchy.display_name(from).to_string(),
                dependent: hierarchy.display_name(to).to_string(),
                origin: match origin {
                    EdgeOrigin::Declared => "declared",
                    EdgeOrigin::RootOrder => "root-order",
                },
            })
            .collect();
        Self {
            load_order: resolution.sets.iter().map(|s| s.name.as_str()).collect(),
            sets: &resolution.sets,
            edges,
        }
    }
}

/// Build a display tree downward from a set through its imports.
///
/// `path` guards against revisiting a set already on the current branch;
/// shared imports appear once per importer.
fn build_tree_node(
    set: &PackageSet,
    by_identity: &BTreeMap<String, &PackageSet>,
    path: &mut Vec<String>,
) -> TreeNode {
    let label = format!("{} ({})", set.name, set.source);
    path.push(set.identity());
    let unvisited: Vec<&String> = set
        .imports
        .iter()
        .filter(|key| !path.contains(key))
        .collect();
    let children = unvisited
        .into_iter()
        .filter_map(|key| by_identity.get(key))
        .map(|child| build_tree_node(child, by_identity, path))
        .collect();
    path.pop();
    TreeNode { label, children }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
