//! Graph export as JSON (nodes and edges) or Graphviz DOT.

use std::fmt::Write as _;

use chunkgraph_extract::{Reference, ResourceNode, SemanticCategory};
use serde::{Deserialize, Serialize};

use crate::store::{GraphStats, ResourceGraph};

/// Owned snapshot of a graph, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub stats: GraphStats,
    pub nodes: Vec<ResourceNode>,
    pub edges: Vec<Reference>,
}

impl GraphExport {
    pub fn from_graph(graph: &ResourceGraph) -> Self {
        Self {
            stats: graph.statistics(),
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().to_vec(),
        }
    }

    /// Rebuild a graph from an export.
    pub fn into_graph(self) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for node in self.nodes {
            graph.add_node(node);
        }
        for edge in self.edges {
            graph.add_reference(edge);
        }
        graph
    }
}

pub fn to_json(graph: &ResourceGraph) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&GraphExport::from_graph(graph))
}

fn category_color(category: Option<SemanticCategory>) -> &'static str {
    match category {
        Some(SemanticCategory::Behavioral) => "firebrick",
        Some(SemanticCategory::Visual) => "royalblue",
        Some(SemanticCategory::Tuning) => "darkgreen",
        Some(SemanticCategory::Structural) => "gray40",
        None => "black",
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render as a DOT digraph. Phantoms are dashed; edge colour encodes the
/// semantic category and soft references are dotted.
pub fn to_dot(graph: &ResourceGraph) -> String {
    let mut out = String::from(
        "digraph chunkgraph {\n  rankdir=LR;\n  node [shape=box, fontname=\"monospace\"];\n",
    );

    for node in graph.nodes() {
        let style = if node.is_phantom { ", style=dashed" } else { "" };
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\"{style}];",
            node.id.long_form(),
            escape(&node.display_name())
        );
    }

    for edge in graph.edges() {
        let dotted = if edge.kind == chunkgraph_extract::ReferenceKind::Soft {
            ", style=dotted"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [color={}, tooltip=\"{}\"{dotted}];",
            edge.source.long_form(),
            edge.target.long_form(),
            category_color(edge.category),
            escape(&edge.locus)
        );
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use chunkgraph_extract::{ReferenceKind, ResourceIdentifier, Scope, TypeCode};

    use super::*;

    fn sample() -> ResourceGraph {
        let objd = ResourceIdentifier::new(TypeCode::OBJD, 0, 128);
        let mut graph = ResourceGraph::new();
        graph.add_node(
            ResourceNode::decoded(objd, "obj.iff", Scope::ObjectLocal)
                .with_label("chair \"deluxe\""),
        );
        graph.add_reference(
            Reference::new(
                objd,
                ResourceIdentifier::new(TypeCode::DGRP, 0, 100),
                ReferenceKind::Hard,
            )
                .category(SemanticCategory::Visual)
                .locus("field:base_graphic_id"),
        );
        graph
    }

    #[test]
    fn dot_marks_phantoms_and_categories() {
        let dot = to_dot(&sample());
        assert!(dot.starts_with("digraph chunkgraph {"));
        assert!(dot.contains("\"DGRP#100@0x0\" [label=\"DGRP#100\", style=dashed];"));
        assert!(dot.contains("color=royalblue"));
        assert!(dot.contains("chair \\\"deluxe\\\""));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn json_export_rebuilds_the_same_graph() {
        let graph = sample();
        let json = to_json(&graph).unwrap();
        let export: GraphExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export.stats.node_count, 2);
        let rebuilt = export.into_graph();
        assert_eq!(rebuilt.edge_count(), 1);
        assert_eq!(rebuilt.phantoms().count(), 1);
        assert_eq!(rebuilt.statistics(), graph.statistics());
    }
}
