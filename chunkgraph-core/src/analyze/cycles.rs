// Strongly-connected-component detection over the outbound edge index.
//
// Cycles are descriptive: mutual recursion and self-referencing tables are
// legitimate content. Reachability of a whole cycle is judged by the
// dead-code finder, not here.

use std::collections::{BTreeSet, HashMap, HashSet};

use chunkgraph_extract::{Reference, ResourceIdentifier, SemanticCategory};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::ResourceGraph;

/// Shape of a cycle, by member count alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleClass {
    /// One node with an edge to itself.
    SelfReferential,
    /// Two nodes referencing each other.
    Mutual,
    /// Three or more nodes.
    Complex,
}

impl CycleClass {
    pub fn for_size(size: usize) -> Self {
        match size {
            0 | 1 => Self::SelfReferential,
            2 => Self::Mutual,
            _ => Self::Complex,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfReferential => "self-referential",
            Self::Mutual => "mutual",
            Self::Complex => "complex",
        }
    }
}

/// One strongly connected component worth reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    /// Members, sorted.
    pub members: Vec<ResourceIdentifier>,
    pub class: CycleClass,
    /// Union of the categories of the edges inside the component.
    pub categories: BTreeSet<SemanticCategory>,
    /// Edges whose source and target are both members.
    pub edges: Vec<Reference>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &ResourceIdentifier) -> bool {
        self.members.binary_search(id).is_ok()
    }

    pub fn is_behavioral(&self) -> bool {
        self.categories.contains(&SemanticCategory::Behavioral)
    }
}

/// Petgraph projection of a resource graph.
struct Projection {
    graph: DiGraph<ResourceIdentifier, ()>,
}

impl Projection {
    fn from_graph(source: &ResourceGraph) -> Self {
        let mut graph = DiGraph::with_capacity(source.node_count(), source.edge_count());
        let mut index: HashMap<ResourceIdentifier, NodeIndex> =
            HashMap::with_capacity(source.node_count());
        for node in source.nodes() {
            index.insert(node.id, graph.add_node(node.id));
        }
        for edge in source.edges() {
            if let (Some(&a), Some(&b)) = (index.get(&edge.source), index.get(&edge.target)) {
                graph.add_edge(a, b, ());
            }
        }
        Self { graph }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CycleAnalyzer;

impl CycleAnalyzer {
    /// All non-trivial strongly connected components, ordered by their
    /// smallest member.
    pub fn find_cycles(graph: &ResourceGraph) -> Vec<Cycle> {
        let projection = Projection::from_graph(graph);
        let mut cycles: Vec<Cycle> = tarjan_scc(&projection.graph)
            .into_iter()
            .filter_map(|component| {
                let members: Vec<ResourceIdentifier> =
                    component.iter().map(|&ix| projection.graph[ix]).collect();
                Self::describe(graph, members)
            })
            .collect();
        cycles.sort_by(|a, b| a.members.cmp(&b.members));

        info!(
            cycles = cycles.len(),
            behavioral = cycles.iter().filter(|c| c.is_behavioral()).count(),
            "Cycle analysis complete"
        );
        cycles
    }

    /// Cycles that include `id`.
    pub fn cycles_containing<'c>(
        cycles: &'c [Cycle],
        id: &ResourceIdentifier,
    ) -> impl Iterator<Item = &'c Cycle> {
        let id = *id;
        cycles.iter().filter(move |c| c.contains(&id))
    }

    fn describe(graph: &ResourceGraph, mut members: Vec<ResourceIdentifier>) -> Option<Cycle> {
        members.sort_unstable();
        let member_set: HashSet<ResourceIdentifier> = members.iter().copied().collect();

        let edges: Vec<Reference> = members
            .iter()
            .flat_map(|id| graph.what_references(id))
            .filter(|e| member_set.contains(&e.target))
            .cloned()
            .collect();

        // Singletons count only when they reference themselves.
        if members.len() == 1 && edges.is_empty() {
            return None;
        }

        let categories = edges.iter().filter_map(|e| e.category).collect();
        Some(Cycle {
            class: CycleClass::for_size(members.len()),
            members,
            categories,
            edges,
        })
    }
}
