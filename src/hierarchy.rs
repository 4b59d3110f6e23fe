//! # Package Set Dependency Graph
//!
//! [`PackageSetHierarchy`] is the directed graph the resolver hands its
//! discovered vertex set to once the traversal frontier has drained. It
//! encodes two kinds of edges, both pointing dependency -> dependent:
//!
//! - **Declared** edges, one per import relation recorded on a set.
//! - **RootOrder** edges, synthesized from the *order* in which the root
//!   configuration lists its direct imports: each direct import points to
//!   the next one in listed order, and every direct import points to the
//!   root. This makes the root configuration's listing order binding for
//!   otherwise independent sets.
//!
//! The graph must be acyclic, and the root must come last in any valid
//! topological order. Cycle diagnostics distinguish the two edge origins,
//! since "you declared this dependency" and "the root configuration lists
//! these in this order" call for different fixes.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::set::PackageSet;

/// Why an edge exists in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrigin {
    /// The dependent set declared an import on the dependency.
    Declared,
    /// Synthesized from the root configuration's listing order.
    RootOrder,
}

impl EdgeOrigin {
    fn label(self) -> &'static str {
        match self {
            EdgeOrigin::Declared => "declared",
            EdgeOrigin::RootOrder => "root order",
        }
    }
}

/// Directed dependency graph over package sets, keyed by repository
/// identity.
#[derive(Debug)]
pub struct PackageSetHierarchy {
    /// dependency -> (dependent -> origin)
    edges: BTreeMap<String, BTreeMap<String, EdgeOrigin>>,
    /// identity -> logical name, for diagnostics
    names: BTreeMap<String, String>,
    root: String,
}

impl PackageSetHierarchy {
    /// Build the graph from the discovered sets, the root, and the root's
    /// direct imports in configuration order.
    ///
    /// Declared edges come from each set's recorded `imports` relation;
    /// positional edges chain `direct_imports` in listed order and attach
    /// every direct import to the root. A positional edge never replaces
    /// an existing declared edge between the same pair.
    pub fn build(sets: &[PackageSet], root_key: &str, direct_imports: &[String]) -> Self {
        let mut edges: BTreeMap<String, BTreeMap<String, EdgeOrigin>> = BTreeMap::new();
        let mut names = BTreeMap::new();

        for set in sets {
            let key = set.identity();
            names.insert(key.clone(), set.name.clone());
            edges.entry(key.clone()).or_default();
            for dependency in &set.imports {
                edges
                    .entry(dependency.clone())
                    .or_default()
                    .insert(key.clone(), EdgeOrigin::Declared);
            }
        }
        edges.entry(root_key.to_string()).or_default();

        for pair in direct_imports.windows(2) {
            edges
                .entry(pair[0].clone())
                .or_default()
                .entry(pair[1].clone())
                .or_insert(EdgeOrigin::RootOrder);
        }
        for direct in direct_imports {
            edges
                .entry(direct.clone())
                .or_default()
                .entry(root_key.to_string())
                .or_insert(EdgeOrigin::RootOrder);
        }

        Self {
            edges,
            names,
            root: root_key.to_string(),
        }
    }

    /// All vertices, in identity order.
    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// All edges as `(dependency, dependent, origin)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, EdgeOrigin)> {
        self.edges.iter().flat_map(|(from, outgoing)| {
            outgoing
                .iter()
                .map(move |(to, origin)| (from.as_str(), to.as_str(), *origin))
        })
    }

    /// Logical name for a vertex when known, identity otherwise.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.names.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Fail with [`Error::ConfigurationCycle`] if the graph contains any
    /// cycle. Every cyclic cluster is reported, each as a walkable trace
    /// whose consecutive pairs are annotated with the edge origin.
    pub fn verify_acyclic(&self) -> Result<()> {
        let components = self.strongly_connected_components();
        let mut cycles = Vec::new();

        for component in components {
            if component.len() > 1 {
                cycles.push(self.render_cycle(&component));
            } else if let Some(origin) = self
                .edges
                .get(&component[0])
                .and_then(|out| out.get(&component[0]))
            {
                let name = self.display_name(&component[0]);
                cycles.push(format!("{} -({})-> {}", name, origin.label(), name));
            }
        }

        if cycles.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigurationCycle { cycles })
        }
    }

    /// Compute a topological order, root last.
    ///
    /// Ties between mutually independent vertices are broken by identity
    /// key order, which makes the output deterministic. Callers are
    /// expected to have run [`verify_acyclic`](Self::verify_acyclic)
    /// first; a cycle still surfaces as `ConfigurationCycle` here.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut indegree: BTreeMap<&str, usize> =
            self.edges.keys().map(|k| (k.as_str(), 0)).collect();
        for (_, to, _) in self.edges() {
            *indegree.get_mut(to).ok_or_else(|| Error::Internal {
                message: format!("edge to unknown vertex {}", to),
            })? += 1;
        }

        // BTreeMap iteration keeps the ready set sorted by identity.
        let mut order = Vec::with_capacity(self.edges.len());
        while order.len() < self.edges.len() {
            let next = indegree
                .iter()
                .find(|(_, &degree)| degree == 0)
                .map(|(&key, _)| key);
            let Some(next) = next else {
                return self.verify_acyclic().and(Err(Error::Internal {
                    message: "no ready vertex but no cycle found".to_string(),
                }));
            };
            indegree.remove(next);
            if let Some(outgoing) = self.edges.get(next) {
                for to in outgoing.keys() {
                    if let Some(degree) = indegree.get_mut(to.as_str()) {
                        *degree -= 1;
                    }
                }
            }
            order.push(next.to_string());
        }

        if order.last().map(String::as_str) != Some(self.root.as_str()) {
            return Err(Error::Internal {
                message: format!(
                    "root package set '{}' did not sort last",
                    self.display_name(&self.root)
                ),
            });
        }
        Ok(order)
    }

    /// Tarjan's algorithm, iterative. Returns every strongly connected
    /// component in vertex order.
    fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        struct State<'a> {
            index: HashMap<&'a str, usize>,
            lowlink: HashMap<&'a str, usize>,
            on_stack: HashMap<&'a str, bool>,
            stack: Vec<&'a str>,
            next_index: usize,
            components: Vec<Vec<String>>,
        }

        let mut state = State {
            index: HashMap::new(),
            lowlink: HashMap::new(),
            on_stack: HashMap::new(),
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        };

        // Explicit work stack: (vertex, iterator position over successors).
        for start in self.edges.keys() {
            if state.index.contains_key(start.as_str()) {
                continue;
            }
            let mut work: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            while let Some((vertex, successor_pos)) = work.last().copied() {
                if successor_pos == 0 {
                    state.index.insert(vertex, state.next_index);
                    state.lowlink.insert(vertex, state.next_index);
                    state.next_index += 1;
                    state.stack.push(vertex);
                    state.on_stack.insert(vertex, true);
                }

                let successors: Vec<&str> = self
                    .edges
                    .get(vertex)
                    .map(|out| out.keys().map(String::as_str).collect())
                    .unwrap_or_default();

                if let Some(&successor) = successors.get(successor_pos) {
                    work.last_mut().unwrap().1 += 1;
                    if !state.index.contains_key(successor) {
                        work.push((successor, 0));
                    } else if state.on_stack.get(successor).copied().unwrap_or(false) {
                        let low = state.lowlink[vertex].min(state.index[successor]);
                        state.lowlink.insert(vertex, low);
                    }
                } else {
                    work.pop();
                    if let Some(&(parent, _)) = work.last() {
                        let low = state.lowlink[parent].min(state.lowlink[vertex]);
                        state.lowlink.insert(parent, low);
                    }
                    if state.lowlink[vertex] == state.index[vertex] {
                        let mut component = Vec::new();
                        while let Some(member) = state.stack.pop() {
                            state.on_stack.insert(member, false);
                            component.push(member.to_string());
                            if member == vertex {
                                break;
                            }
                        }
                        component.reverse();
                        state.components.push(component);
                    }
                }
            }
        }
        state.components
    }

    /// Walk one concrete cycle inside a non-trivial strongly connected
    /// component and render it with edge origins.
    fn render_cycle(&self, component: &[String]) -> String {
        let members: std::collections::HashSet<&str> =
            component.iter().map(String::as_str).collect();
        let start = component[0].as_str();

        // DFS restricted to the component until we come back to start.
        let mut path: Vec<&str> = vec![start];
        let mut visited: std::collections::HashSet<&str> = [start].into_iter().collect();
        loop {
            let current = *path.last().unwrap();
            let next = self
                .edges
                .get(current)
                .into_iter()
                .flat_map(|out| out.keys())
                .map(String::as_str)
                .find(|candidate| {
                    members.contains(candidate)
                        && (*candidate == start || !visited.contains(candidate))
                });
            match next {
                Some(successor) if successor == start && path.len() > 1 => {
                    path.push(start);
                    break;
                }
                Some(successor) if successor != start => {
                    visited.insert(successor);
                    path.push(successor);
                }
                _ => {
                    // Dead end inside the component; back out one step.
                    path.pop();
                    if path.is_empty() {
                        // Cannot happen in a genuine SCC, but fail soft.
                        return component.join(" -> ");
                    }
                }
            }
        }

        let mut rendered = String::new();
        for pair in path.windows(2) {
            let origin = self
                .edges
                .get(pair[0])
                .and_then(|out| out.get(pair[1]))
                .map(|o| o.label())
                .unwrap_or("unknown");
            if rendered.is_empty() {
                rendered.push_str(self.display_name(pair[0]));
            }
            rendered.push_str(&format!(" -({})-> {}", origin, self.display_name(pair[1])));
        }
        rendered
    }
}
