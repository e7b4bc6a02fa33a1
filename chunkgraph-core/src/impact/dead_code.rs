use std::collections::HashSet;
use std::path::PathBuf;

use chunkgraph_extract::{ResourceClass, ResourceIdentifier, ResourceNode, SemanticCategory};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyze::{Cycle, CycleAnalyzer, Severity};
use crate::store::ResourceGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadCodeKind {
    /// Routine with outgoing calls that nothing calls.
    UnreachableCode,
    /// Routine with no calls in or out.
    EmptyStub,
    OrphanedInteractionTable,
    OrphanedDrawGroup,
    /// Member of a behavioral cycle that nothing outside the cycle references.
    UnreachableCycle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadCodeItem {
    pub id: ResourceIdentifier,
    pub kind: DeadCodeKind,
    pub severity: Severity,
    pub reason: String,
    pub file: Option<PathBuf>,
}

impl DeadCodeItem {
    fn new(node: &ResourceNode, kind: DeadCodeKind, severity: Severity, reason: String) -> Self {
        Self {
            id: node.id,
            kind,
            severity,
            reason,
            file: node.file.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeadCodeFinder;

impl DeadCodeFinder {
    /// Find dead resources, computing cycles first.
    pub fn find(graph: &ResourceGraph) -> Vec<DeadCodeItem> {
        let cycles = CycleAnalyzer::find_cycles(graph);
        Self::find_with_cycles(graph, &cycles)
    }

    /// Find dead resources using already-computed cycles.
    pub fn find_with_cycles(graph: &ResourceGraph, cycles: &[Cycle]) -> Vec<DeadCodeItem> {
        let mut items = Vec::new();
        let mut flagged = HashSet::new();

        for node in graph.nodes().filter(|n| !n.is_phantom) {
            let item = match node.class() {
                ResourceClass::Behavior => Self::check_routine(graph, node),
                ResourceClass::InteractionTable if graph.is_orphan(&node.id) => {
                    Some(DeadCodeItem::new(
                        node,
                        DeadCodeKind::OrphanedInteractionTable,
                        Severity::Warning,
                        "interaction table not referenced by any object".into(),
                    ))
                }
                ResourceClass::DrawGroup if graph.is_orphan(&node.id) => Some(DeadCodeItem::new(
                    node,
                    DeadCodeKind::OrphanedDrawGroup,
                    Severity::Warning,
                    "drawable group not referenced by any object".into(),
                )),
                _ => None,
            };
            if let Some(item) = item {
                flagged.insert(item.id);
                items.push(item);
            }
        }

        for cycle in cycles.iter().filter(|c| c.is_behavioral()) {
            let entered_from_outside = cycle.members.iter().any(|member| {
                graph
                    .who_references(member)
                    .iter()
                    .any(|e| !cycle.contains(&e.source))
            });
            if entered_from_outside {
                continue;
            }
            for member in &cycle.members {
                let Some(node) = graph.node(member) else {
                    continue;
                };
                if node.is_phantom || !flagged.insert(node.id) {
                    continue;
                }
                items.push(DeadCodeItem::new(
                    node,
                    DeadCodeKind::UnreachableCycle,
                    Severity::Warning,
                    format!(
                        "in a {} cycle of {} that nothing outside the cycle references",
                        cycle.class.as_str(),
                        cycle.len()
                    ),
                ));
            }
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        info!(items = items.len(), "Dead code scan complete");
        items
    }

    fn check_routine(graph: &ResourceGraph, node: &ResourceNode) -> Option<DeadCodeItem> {
        let called = graph
            .who_references(&node.id)
            .iter()
            .any(|e| e.is(SemanticCategory::Behavioral));
        if called {
            return None;
        }
        let calls_out = graph
            .what_references(&node.id)
            .iter()
            .any(|e| e.is(SemanticCategory::Behavioral));
        Some(if calls_out {
            DeadCodeItem::new(
                node,
                DeadCodeKind::UnreachableCode,
                Severity::Warning,
                "contains code but unreachable".into(),
            )
        } else {
            DeadCodeItem::new(node, DeadCodeKind::EmptyStub, Severity::Info, "empty stub".into())
        })
    }
}
