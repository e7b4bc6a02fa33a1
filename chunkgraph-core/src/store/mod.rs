//! In-memory resource graph with directional and per-file indices.
//!
//! Edges live in one append-only vector; the inbound and outbound indices
//! hold positions into it, so both directions see the exact same edge.

mod stats;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chunkgraph_extract::{Reference, ResourceClass, ResourceIdentifier, ResourceNode, Scope};
use tracing::trace;

pub use stats::GraphStats;

/// Outcome of [`ResourceGraph::add_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeInsert {
    /// The identifier was new.
    Inserted,
    /// A phantom was replaced by a decoded node with the same identifier.
    Upgraded,
    /// The identifier was already present; nothing changed.
    Existing,
}

/// Outcome of [`ResourceGraph::add_reference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeInsert {
    /// Position of the new edge in [`ResourceGraph::edges`].
    pub index: usize,
    /// Phantom nodes created to hold missing endpoints (0, 1, or 2).
    pub phantoms_created: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: HashMap<ResourceIdentifier, ResourceNode>,
    /// Identifiers in insertion order, for deterministic iteration.
    order: Vec<ResourceIdentifier>,
    edges: Vec<Reference>,
    inbound: HashMap<ResourceIdentifier, Vec<usize>>,
    outbound: HashMap<ResourceIdentifier, Vec<usize>>,
    by_file: HashMap<PathBuf, Vec<ResourceIdentifier>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless its identifier is already present.
    ///
    /// A stored phantom is upgraded in place by a decoded node: the decoded
    /// fields are adopted and the owning file is indexed. Edges already
    /// pointing at the phantom stay attached. Every other duplicate is a
    /// no-op that leaves the stored node untouched.
    pub fn add_node(&mut self, node: ResourceNode) -> NodeInsert {
        let id = node.id;
        if let Some(existing) = self.nodes.get_mut(&id) {
            if existing.is_phantom && !node.is_phantom {
                trace!(id = %id, "Upgrading phantom node");
                if let Some(file) = &node.file {
                    self.by_file.entry(file.clone()).or_default().push(id);
                }
                *existing = node;
                return NodeInsert::Upgraded;
            }
            return NodeInsert::Existing;
        }

        if let Some(file) = &node.file {
            self.by_file.entry(file.clone()).or_default().push(id);
        }
        self.order.push(id);
        self.nodes.insert(id, node);
        NodeInsert::Inserted
    }

    /// Append an edge, creating phantom endpoints for unknown identifiers.
    ///
    /// A missing target takes the scope the rule inferred for it; a missing
    /// source (only possible for hand-built graphs) is `Unknown`.
    pub fn add_reference(&mut self, reference: Reference) -> EdgeInsert {
        let mut phantoms_created = 0;
        if !self.nodes.contains_key(&reference.source) {
            self.add_node(ResourceNode::phantom(reference.source, Scope::Unknown));
            phantoms_created += 1;
        }
        if !self.nodes.contains_key(&reference.target) {
            self.add_node(ResourceNode::phantom(reference.target, reference.target_scope));
            phantoms_created += 1;
        }

        let index = self.edges.len();
        self.outbound.entry(reference.source).or_default().push(index);
        self.inbound.entry(reference.target).or_default().push(index);
        self.edges.push(reference);
        EdgeInsert {
            index,
            phantoms_created,
        }
    }

    pub fn node(&self, id: &ResourceIdentifier) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &ResourceIdentifier) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> &[Reference] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges whose target is `id`; empty for unknown identifiers.
    pub fn who_references(&self, id: &ResourceIdentifier) -> Vec<&Reference> {
        self.resolve(self.inbound.get(id))
    }

    /// Edges whose source is `id`; empty for unknown identifiers.
    pub fn what_references(&self, id: &ResourceIdentifier) -> Vec<&Reference> {
        self.resolve(self.outbound.get(id))
    }

    pub fn inbound_count(&self, id: &ResourceIdentifier) -> usize {
        self.inbound.get(id).map_or(0, Vec::len)
    }

    pub fn outbound_count(&self, id: &ResourceIdentifier) -> usize {
        self.outbound.get(id).map_or(0, Vec::len)
    }

    /// Nodes that no edge targets, in insertion order. Phantoms never
    /// qualify since they exist only because something referenced them.
    pub fn find_orphans(&self) -> Vec<&ResourceNode> {
        self.nodes()
            .filter(|node| self.inbound_count(&node.id) == 0)
            .collect()
    }

    pub fn is_orphan(&self, id: &ResourceIdentifier) -> bool {
        self.contains(id) && self.inbound_count(id) == 0
    }

    pub fn phantoms(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes().filter(|node| node.is_phantom)
    }

    /// Nodes decoded from `path`, in insertion order.
    pub fn get_nodes_in_file(&self, path: &Path) -> Vec<&ResourceNode> {
        self.by_file
            .get(path)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Distinct owning files, sorted.
    pub fn files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = self.by_file.keys().map(PathBuf::as_path).collect();
        files.sort();
        files
    }

    /// Whether `path` contains a shared-library import marker chunk.
    pub fn file_declares_import(&self, path: &Path) -> bool {
        self.get_nodes_in_file(path)
            .iter()
            .any(|node| node.class() == ResourceClass::ImportMarker)
    }

    /// Derived counts; never cached.
    pub fn statistics(&self) -> GraphStats {
        GraphStats::compute(self)
    }

    fn resolve(&self, indices: Option<&Vec<usize>>) -> Vec<&Reference> {
        indices
            .map(|ix| ix.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }
}
