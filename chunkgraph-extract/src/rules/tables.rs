// Interaction tables and object function tables: both bind guard/action
// routine pairs, so both produce behavioral edges.

use crate::decoded::DecodedChunk;
use crate::model::{Reference, ReferenceKind, ResourceNode, SemanticCategory, TypeCode};
use crate::registry::{ExtractContext, ExtractionRule};

use super::{local_ref, routine_ref};

#[derive(Debug, Default)]
pub struct InteractionTableRule;

impl ExtractionRule for InteractionTableRule {
    fn type_code(&self) -> TypeCode {
        TypeCode::TTAB
    }

    fn name(&self) -> &'static str {
        "interaction_table"
    }

    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        let DecodedChunk::InteractionTable(table) = chunk else {
            return Vec::new();
        };

        let mut refs = Vec::new();
        for (i, entry) in table.entries.iter().enumerate() {
            if entry.guard_routine != 0 {
                refs.push(routine_ref(
                    ctx.scopes,
                    &node.id,
                    u32::from(entry.guard_routine),
                    format!("entry[{i}].guard"),
                    format!("guard for interaction {}", entry.string_index),
                ));
            }
            if entry.action_routine != 0 {
                refs.push(routine_ref(
                    ctx.scopes,
                    &node.id,
                    u32::from(entry.action_routine),
                    format!("entry[{i}].action"),
                    format!("action for interaction {}", entry.string_index),
                ));
            }
        }

        // Menu text lives in the strings chunk sharing the table's instance.
        if !table.entries.is_empty() {
            refs.push(
                local_ref(
                    ctx.scopes,
                    &node.id,
                    TypeCode::TTAS,
                    node.id.instance,
                    ReferenceKind::Soft,
                    SemanticCategory::Structural,
                )
                .locus("strings")
                .description("interaction menu strings"),
            );
        }

        refs
    }
}

#[derive(Debug, Default)]
pub struct FunctionTableRule;

impl ExtractionRule for FunctionTableRule {
    fn type_code(&self) -> TypeCode {
        TypeCode::OBJF
    }

    fn name(&self) -> &'static str {
        "function_table"
    }

    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        let DecodedChunk::FunctionTable(table) = chunk else {
            return Vec::new();
        };

        table
            .entries
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| {
                [("guard", entry.guard_routine), ("action", entry.action_routine)]
                    .into_iter()
                    .filter(|(_, id)| *id != 0)
                    .map(move |(role, id)| (i, role, id))
            })
            .map(|(i, role, id)| {
                routine_ref(
                    ctx.scopes,
                    &node.id,
                    u32::from(id),
                    format!("function[{i}].{role}"),
                    format!("object function {i} {role}"),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoded::{FunctionEntry, FunctionTable, InteractionEntry, InteractionTable};
    use crate::model::{ResourceIdentifier, Scope};
    use crate::scope::ScopeRanges;

    fn node(code: TypeCode) -> ResourceNode {
        ResourceNode::decoded(ResourceIdentifier::new(code, 1, 128), "obj.iff", Scope::ObjectLocal)
    }

    #[test]
    fn interaction_entries_yield_guard_action_and_strings() {
        let scopes = ScopeRanges::default();
        let ctx = ExtractContext { scopes: &scopes };
        let chunk = DecodedChunk::InteractionTable(InteractionTable {
            entries: vec![
                InteractionEntry {
                    guard_routine: 0x1001,
                    action_routine: 0x1002,
                    string_index: 0,
                },
                InteractionEntry {
                    guard_routine: 0,
                    action_routine: 0x2010,
                    string_index: 1,
                },
            ],
        });
        let refs = InteractionTableRule.extract(&chunk, &node(TypeCode::TTAB), &ctx);
        assert_eq!(refs.len(), 4);

        let behavioral: Vec<_> = refs
            .iter()
            .filter(|r| r.is(SemanticCategory::Behavioral))
            .collect();
        assert_eq!(behavioral.len(), 3);
        assert_eq!(behavioral[0].locus, "entry[0].guard");
        assert_eq!(behavioral[2].kind, ReferenceKind::Import);

        let strings = refs.iter().find(|r| r.target.type_code == TypeCode::TTAS).unwrap();
        assert_eq!(strings.target.instance, 128);
    }

    #[test]
    fn empty_interaction_table_yields_nothing() {
        let scopes = ScopeRanges::default();
        let ctx = ExtractContext { scopes: &scopes };
        let chunk = DecodedChunk::InteractionTable(InteractionTable::default());
        assert!(InteractionTableRule.extract(&chunk, &node(TypeCode::TTAB), &ctx).is_empty());
    }

    #[test]
    fn function_table_skips_zero_slots() {
        let scopes = ScopeRanges::default();
        let ctx = ExtractContext { scopes: &scopes };
        let chunk = DecodedChunk::FunctionTable(FunctionTable {
            entries: vec![
                FunctionEntry {
                    guard_routine: 0,
                    action_routine: 0x1003,
                },
                FunctionEntry {
                    guard_routine: 0x1004,
                    action_routine: 0x1005,
                },
            ],
        });
        let refs = FunctionTableRule.extract(&chunk, &node(TypeCode::OBJF), &ctx);
        let loci: Vec<&str> = refs.iter().map(|r| r.locus.as_str()).collect();
        assert_eq!(loci, ["function[0].action", "function[1].guard", "function[1].action"]);
    }
}
