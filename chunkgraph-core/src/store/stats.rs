use serde::{Deserialize, Serialize};

use super::ResourceGraph;

/// Summary counts over a [`ResourceGraph`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub orphan_count: usize,
    pub phantom_count: usize,
    pub file_count: usize,
    pub mean_in_degree: f64,
    pub mean_out_degree: f64,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
}

impl GraphStats {
    pub(super) fn compute(graph: &ResourceGraph) -> Self {
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();

        let mut orphan_count = 0;
        let mut phantom_count = 0;
        let mut max_in_degree = 0;
        let mut max_out_degree = 0;
        let mut in_total = 0usize;
        let mut out_total = 0usize;
        for node in graph.nodes() {
            let inbound = graph.inbound_count(&node.id);
            let outbound = graph.outbound_count(&node.id);
            if inbound == 0 {
                orphan_count += 1;
            }
            if node.is_phantom {
                phantom_count += 1;
            }
            in_total += inbound;
            out_total += outbound;
            max_in_degree = max_in_degree.max(inbound);
            max_out_degree = max_out_degree.max(outbound);
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = |total: usize| {
            if node_count == 0 {
                0.0
            } else {
                total as f64 / node_count as f64
            }
        };

        Self {
            node_count,
            edge_count,
            orphan_count,
            phantom_count,
            file_count: graph.files().len(),
            mean_in_degree: mean(in_total),
            mean_out_degree: mean(out_total),
            max_in_degree,
            max_out_degree,
        }
    }
}

#[cfg(test)]
mod tests {
    use chunkgraph_extract::{
        Reference, ReferenceKind, ResourceIdentifier, ResourceNode, Scope, TypeCode,
    };

    use super::*;

    #[test]
    fn empty_graph_has_zero_means() {
        let stats = ResourceGraph::new().statistics();
        assert_eq!(stats, GraphStats::default());
    }

    #[test]
    fn counts_and_degrees() {
        let a = ResourceIdentifier::new(TypeCode::BHAV, 0, 0x1000);
        let b = ResourceIdentifier::new(TypeCode::BHAV, 0, 0x1001);
        let c = ResourceIdentifier::new(TypeCode::BHAV, 0, 0x1002);
        let mut graph = ResourceGraph::new();
        graph.add_node(ResourceNode::decoded(a, "x.iff", Scope::ObjectLocal));
        graph.add_node(ResourceNode::decoded(b, "y.iff", Scope::ObjectLocal));
        graph.add_reference(Reference::new(a, b, ReferenceKind::Hard));
        graph.add_reference(Reference::new(a, c, ReferenceKind::Hard));

        let stats = graph.statistics();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.orphan_count, 1);
        assert_eq!(stats.phantom_count, 1);
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.max_out_degree, 2);
        assert_eq!(stats.max_in_degree, 1);
        assert!((stats.mean_in_degree - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.mean_out_degree - stats.mean_in_degree).abs() < 1e-9);
    }
}
