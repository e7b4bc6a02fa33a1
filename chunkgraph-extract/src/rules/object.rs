use crate::decoded::{DecodedChunk, ObjectDefinition};
use crate::model::{Reference, ReferenceKind, ResourceNode, SemanticCategory, TypeCode};
use crate::registry::{ExtractContext, ExtractionRule};

use super::{local_ref, routine_ref};

/// Object definitions bind an object's tables, graphics, strings, and entry points.
#[derive(Debug, Default)]
pub struct ObjectDefinitionRule;

/// (field name, value accessor, target type, kind, category, description)
type FieldSpec = (
    &'static str,
    fn(&ObjectDefinition) -> u16,
    TypeCode,
    ReferenceKind,
    SemanticCategory,
    &'static str,
);

const FIELDS: [FieldSpec; 6] = [
    (
        "tree_table_id",
        |o| o.tree_table_id,
        TypeCode::TTAB,
        ReferenceKind::Hard,
        SemanticCategory::Structural,
        "interaction table",
    ),
    (
        "base_graphic_id",
        |o| o.base_graphic_id,
        TypeCode::DGRP,
        ReferenceKind::Hard,
        SemanticCategory::Visual,
        "base graphic",
    ),
    (
        "slot_id",
        |o| o.slot_id,
        TypeCode::SLOT,
        ReferenceKind::Soft,
        SemanticCategory::Structural,
        "routing slots",
    ),
    (
        "catalog_strings_id",
        |o| o.catalog_strings_id,
        TypeCode::CTSS,
        ReferenceKind::Soft,
        SemanticCategory::Structural,
        "catalog strings",
    ),
    (
        "body_strings_id",
        |o| o.body_strings_id,
        TypeCode::STR,
        ReferenceKind::Soft,
        SemanticCategory::Structural,
        "body strings",
    ),
    (
        "function_table_id",
        |o| o.function_table_id,
        TypeCode::OBJF,
        ReferenceKind::Hard,
        SemanticCategory::Structural,
        "function table",
    ),
];

impl ExtractionRule for ObjectDefinitionRule {
    fn type_code(&self) -> TypeCode {
        TypeCode::OBJD
    }

    fn name(&self) -> &'static str {
        "object_definition"
    }

    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        let DecodedChunk::ObjectDefinition(objd) = chunk else {
            return Vec::new();
        };

        let mut refs: Vec<Reference> = FIELDS
            .iter()
            .filter_map(|&(field, get, type_code, kind, category, what)| {
                let value = get(objd);
                (value != 0).then(|| {
                    local_ref(ctx.scopes, &node.id, type_code, u32::from(value), kind, category)
                        .locus(format!("field:{field}"))
                        .description(what)
                })
            })
            .collect();

        for entry in &objd.entry_points {
            if entry.routine_id == 0 {
                continue;
            }
            refs.push(routine_ref(
                ctx.scopes,
                &node.id,
                u32::from(entry.routine_id),
                format!("entry:{}", entry.name),
                format!("{} entry point", entry.name),
            ));
        }

        refs
    }
}
