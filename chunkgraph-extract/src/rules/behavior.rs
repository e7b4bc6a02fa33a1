// Behavior routine extraction: subroutine calls, tuning reads, dialog strings.

use crate::decoded::{BehaviorRoutine, DecodedChunk, Instruction};
use crate::model::{Reference, ReferenceKind, ResourceNode, SemanticCategory, TypeCode};
use crate::registry::{ExtractContext, ExtractionRule};

use super::{local_ref, routine_ref};

/// Primitive that evaluates `lhs <op> rhs` over two variable operands.
pub const EXPRESSION_OPCODE: u16 = 0x0002;
/// Primitive that shows a dialog built from a string table.
pub const DIALOG_OPCODE: u16 = 0x0024;
/// Variable owner code for constants-table (tuning) reads.
pub const TUNING_OWNER: u8 = 0x1A;

/// Confidence for tuning reads decoded from expression operands.
const TUNING_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Default)]
pub struct BehaviorRule;

impl ExtractionRule for BehaviorRule {
    fn type_code(&self) -> TypeCode {
        TypeCode::BHAV
    }

    fn name(&self) -> &'static str {
        "behavior"
    }

    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        let DecodedChunk::Behavior(routine) = chunk else {
            return Vec::new();
        };
        extract_routine(routine, node, ctx)
    }
}

fn extract_routine(
    routine: &BehaviorRoutine,
    node: &ResourceNode,
    ctx: &ExtractContext<'_>,
) -> Vec<Reference> {
    let mut refs = Vec::new();

    for (i, instr) in routine.instructions.iter().enumerate() {
        let opcode = u32::from(instr.opcode);
        if !ctx.scopes.is_primitive(opcode) {
            refs.push(routine_ref(
                ctx.scopes,
                &node.id,
                opcode,
                format!("instr[{i}].opcode"),
                format!("calls routine {opcode:#06x}"),
            ));
            continue;
        }

        match instr.opcode {
            EXPRESSION_OPCODE => refs.extend(tuning_reads(i, instr, node, ctx)),
            DIALOG_OPCODE => refs.extend(dialog_strings(i, instr, node, ctx)),
            _ => {}
        }
    }

    refs
}

fn tuning_reads(
    i: usize,
    instr: &Instruction,
    node: &ResourceNode,
    ctx: &ExtractContext<'_>,
) -> Vec<Reference> {
    let Some(expr) = ExpressionOperand::parse(&instr.operand) else {
        return Vec::new();
    };

    [("lhs", expr.lhs_owner, expr.lhs_data), ("rhs", expr.rhs_owner, expr.rhs_data)]
        .into_iter()
        .filter(|(_, owner, _)| *owner == TUNING_OWNER)
        .filter_map(|(side, _, data)| {
            let (table, index) = ExpressionOperand::tuning_slot(data);
            let (target, scope) = ctx.scopes.tuning_table(table, &node.id)?;
            Some(
                Reference::new(node.id, target, ReferenceKind::Indexed)
                    .category(SemanticCategory::Tuning)
                    .locus(format!("instr[{i}].operand.{side}"))
                    .description(format!("reads constant {index} of tuning table {table}"))
                    .confidence(TUNING_CONFIDENCE)
                    .target_scope(scope),
            )
        })
        .collect()
}

fn dialog_strings(
    i: usize,
    instr: &Instruction,
    node: &ResourceNode,
    ctx: &ExtractContext<'_>,
) -> Option<Reference> {
    let bytes = instr.operand.get(4..6)?;
    let table_id = u16::from_le_bytes([bytes[0], bytes[1]]);
    if table_id == 0 {
        return None;
    }
    Some(
        local_ref(
            ctx.scopes,
            &node.id,
            TypeCode::STR,
            u32::from(table_id),
            ReferenceKind::Soft,
            SemanticCategory::Visual,
        )
        .locus(format!("instr[{i}].operand.strings"))
        .description("dialog text"),
    )
}

/// Fixed-layout operand of the expression primitive.
///
/// `lhs_data u16 LE, rhs_data u16 LE, flags u8, operator u8, lhs_owner u8, rhs_owner u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionOperand {
    pub lhs_data: u16,
    pub rhs_data: u16,
    pub flags: u8,
    pub operator: u8,
    pub lhs_owner: u8,
    pub rhs_owner: u8,
}

impl ExpressionOperand {
    pub const LEN: usize = 8;

    /// `None` when the block is shorter than the fixed layout.
    pub fn parse(operand: &[u8]) -> Option<Self> {
        let b = operand.get(..Self::LEN)?;
        Some(Self {
            lhs_data: u16::from_le_bytes([b[0], b[1]]),
            rhs_data: u16::from_le_bytes([b[2], b[3]]),
            flags: b[4],
            operator: b[5],
            lhs_owner: b[6],
            rhs_owner: b[7],
        })
    }

    /// Split tuning operand data into (table number, constant index).
    pub fn tuning_slot(data: u16) -> (u16, u16) {
        (data >> 7, data & 0x7F)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
