use std::path::PathBuf;

use chunkgraph_extract::{ResourceClass, ResourceIdentifier, ResourceNode, TypeCode};
use serde::{Deserialize, Serialize};

use crate::store::ResourceGraph;

/// A same-file, same-type resource that is referenced correctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingExample {
    pub id: ResourceIdentifier,
    pub referenced_by: ResourceIdentifier,
    /// Where in the referrer the reference sits.
    pub locus: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanExplanation {
    pub id: ResourceIdentifier,
    pub file: Option<PathBuf>,
    /// Types that normally reference a resource of this type.
    pub expected_referrers: Vec<TypeCode>,
    pub sibling_examples: Vec<SiblingExample>,
    pub remediation: String,
}

/// Explains why orphaned resources have no referrers and how to fix it.
#[derive(Debug, Clone)]
pub struct OrphanExplainer<'g> {
    graph: &'g ResourceGraph,
    max_examples: usize,
}

impl<'g> OrphanExplainer<'g> {
    pub fn new(graph: &'g ResourceGraph) -> Self {
        Self {
            graph,
            max_examples: 3,
        }
    }

    #[must_use]
    pub fn max_examples(mut self, max: usize) -> Self {
        self.max_examples = max;
        self
    }

    /// `None` unless `id` is a decoded node with no inbound references.
    pub fn explain(&self, id: &ResourceIdentifier) -> Option<OrphanExplanation> {
        let node = self.graph.node(id)?;
        if node.is_phantom || !self.graph.is_orphan(id) {
            return None;
        }
        let (expected_referrers, remediation) = expectations(node);
        Some(OrphanExplanation {
            id: *id,
            file: node.file.clone(),
            expected_referrers,
            sibling_examples: self.siblings(node),
            remediation,
        })
    }

    /// Explanations for every orphan that is expected to have a referrer.
    /// Object definitions and import markers are roots and are skipped.
    pub fn explain_all(&self) -> Vec<OrphanExplanation> {
        self.graph
            .find_orphans()
            .into_iter()
            .filter(|n| !is_root(n.class()))
            .filter_map(|n| self.explain(&n.id))
            .collect()
    }

    fn siblings(&self, node: &ResourceNode) -> Vec<SiblingExample> {
        let Some(file) = node.file.as_deref() else {
            return Vec::new();
        };
        self.graph
            .get_nodes_in_file(file)
            .into_iter()
            .filter(|n| n.id != node.id && n.resource_type() == node.resource_type())
            .filter_map(|n| {
                let edge = self.graph.who_references(&n.id).into_iter().next()?;
                Some(SiblingExample {
                    id: n.id,
                    referenced_by: edge.source,
                    locus: edge.locus.clone(),
                })
            })
            .take(self.max_examples)
            .collect()
    }
}

fn is_root(class: ResourceClass) -> bool {
    matches!(class, ResourceClass::ObjectDefinition | ResourceClass::ImportMarker)
}

fn expectations(node: &ResourceNode) -> (Vec<TypeCode>, String) {
    let id = node.id;
    let n = id.instance;
    match node.class() {
        ResourceClass::Behavior => (
            vec![TypeCode::OBJD, TypeCode::TTAB, TypeCode::OBJF, TypeCode::BHAV],
            format!(
                "Call {id} from another routine (opcode {n:#06x}), bind it as a guard or action \
                 in an interaction table, or name it as an object entry point"
            ),
        ),
        ResourceClass::InteractionTable => (
            vec![TypeCode::OBJD],
            format!(
                "Set tree_table_id = {n} on the object definition that should offer these \
                 interactions"
            ),
        ),
        ResourceClass::FunctionTable => (
            vec![TypeCode::OBJD],
            format!("Set function_table_id = {n} on the owning object definition"),
        ),
        ResourceClass::DrawGroup => (
            vec![TypeCode::OBJD],
            format!("Set base_graphic_id = {n} on the object definition that should draw it"),
        ),
        ResourceClass::Sprite => (
            vec![TypeCode::DGRP],
            format!("Add sprite {n} to an image layer of a drawable group"),
        ),
        ResourceClass::Palette => (
            vec![TypeCode::SPR2],
            format!("Set palette_id = {n} on the sprites that should use it"),
        ),
        ResourceClass::Constants => (
            vec![TypeCode::BHAV],
            format!(
                "Read {id} from an expression operand with the tuning owner, or remove the table"
            ),
        ),
        ResourceClass::Slots => (
            vec![TypeCode::OBJD],
            format!("Set slot_id = {n} on the object definition"),
        ),
        ResourceClass::Strings => strings_expectations(id),
        ResourceClass::ObjectDefinition | ResourceClass::ImportMarker => (
            Vec::new(),
            format!("{id} is a root resource; nothing is expected to reference it"),
        ),
        ResourceClass::Other => (
            Vec::new(),
            format!(
                "No referencing convention is known for {}; check whether it is still used",
                id.type_code
            ),
        ),
    }
}

fn strings_expectations(id: ResourceIdentifier) -> (Vec<TypeCode>, String) {
    let n = id.instance;
    match id.type_code {
        TypeCode::TTAS => (
            vec![TypeCode::TTAB],
            format!(
                "Create interaction table {n}; menu strings attach to the table with the same \
                 instance"
            ),
        ),
        TypeCode::CTSS => (
            vec![TypeCode::OBJD],
            format!("Set catalog_strings_id = {n} on the object definition"),
        ),
        _ => (
            vec![TypeCode::OBJD, TypeCode::BHAV],
            format!(
                "Set body_strings_id = {n} on an object definition, or show it from a dialog \
                 instruction"
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use chunkgraph_extract::{Reference, ReferenceKind, Scope, SemanticCategory};

    use super::*;

    fn node(code: TypeCode, instance: u32) -> ResourceNode {
        ResourceNode::decoded(
            ResourceIdentifier::new(code, 0, instance),
            "obj.iff",
            Scope::ObjectLocal,
        )
    }

    fn graph_with_two_tables() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        let objd = node(TypeCode::OBJD, 128);
        let bound = node(TypeCode::TTAB, 128);
        let orphan = node(TypeCode::TTAB, 129);
        let (objd_id, bound_id) = (objd.id, bound.id);
        graph.add_node(objd);
        graph.add_node(bound);
        graph.add_node(orphan);
        graph.add_reference(
            Reference::new(objd_id, bound_id, ReferenceKind::Hard)
                .category(SemanticCategory::Structural)
                .locus("field:tree_table_id"),
        );
        graph
    }

    #[test]
    fn explains_orphaned_table_with_sibling() {
        let graph = graph_with_two_tables();
        let explanation = OrphanExplainer::new(&graph)
            .explain(&ResourceIdentifier::new(TypeCode::TTAB, 0, 129))
            .unwrap();
        assert_eq!(explanation.expected_referrers, vec![TypeCode::OBJD]);
        assert!(explanation.remediation.contains("tree_table_id = 129"));
        assert_eq!(explanation.sibling_examples.len(), 1);
        let example = &explanation.sibling_examples[0];
        assert_eq!(example.id, ResourceIdentifier::new(TypeCode::TTAB, 0, 128));
        assert_eq!(example.locus, "field:tree_table_id");
    }

    #[test]
    fn referenced_or_unknown_nodes_get_no_explanation() {
        let graph = graph_with_two_tables();
        let explainer = OrphanExplainer::new(&graph);
        assert!(explainer.explain(&ResourceIdentifier::new(TypeCode::TTAB, 0, 128)).is_none());
        assert!(explainer.explain(&ResourceIdentifier::new(TypeCode::TTAB, 0, 999)).is_none());
    }

    #[test]
    fn sibling_examples_are_capped() {
        let mut graph = ResourceGraph::new();
        let caller = node(TypeCode::BHAV, 0x1000);
        let caller_id = caller.id;
        graph.add_node(caller);
        for i in 1..=5 {
            let callee = node(TypeCode::BHAV, 0x1000 + i);
            let callee_id = callee.id;
            graph.add_node(callee);
            graph.add_reference(
                Reference::new(caller_id, callee_id, ReferenceKind::Hard)
                    .category(SemanticCategory::Behavioral),
            );
        }
        graph.add_node(node(TypeCode::BHAV, 0x1100));

        let explainer = OrphanExplainer::new(&graph).max_examples(2);
        let explanation = explainer
            .explain(&ResourceIdentifier::new(TypeCode::BHAV, 0, 0x1100))
            .unwrap();
        assert_eq!(explanation.sibling_examples.len(), 2);
        assert_eq!(explanation.expected_referrers.len(), 4);
    }

    #[test]
    fn explain_all_skips_roots() {
        let graph = graph_with_two_tables();
        let all = OrphanExplainer::new(&graph).explain_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, ResourceIdentifier::new(TypeCode::TTAB, 0, 129));
    }

    #[test]
    fn string_tables_dispatch_on_type() {
        let mut graph = ResourceGraph::new();
        graph.add_node(node(TypeCode::TTAS, 130));
        let explanation = OrphanExplainer::new(&graph)
            .explain(&ResourceIdentifier::new(TypeCode::TTAS, 0, 130))
            .unwrap();
        assert_eq!(explanation.expected_referrers, vec![TypeCode::TTAB]);
        assert!(explanation.sibling_examples.is_empty());
    }
}
