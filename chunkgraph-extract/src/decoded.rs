// Typed chunk payloads as produced by the external chunk decoder.
//
// Decoding raw bytes into these shapes is not this crate's concern; rules
// only read them. Every field defaults so partially-populated payloads from
// hand-edited content still deserialize.

use serde::{Deserialize, Serialize};

/// A decoded chunk payload, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedChunk {
    Behavior(BehaviorRoutine),
    ObjectDefinition(ObjectDefinition),
    InteractionTable(InteractionTable),
    FunctionTable(FunctionTable),
    DrawGroup(DrawGroup),
    Sprite(Sprite),
    Constants(ConstantsTable),
    Strings(StringTable),
    /// Decoded, but with no structure any rule inspects.
    Opaque,
}

impl DecodedChunk {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Behavior(_) => "behavior",
            Self::ObjectDefinition(_) => "object_definition",
            Self::InteractionTable(_) => "interaction_table",
            Self::FunctionTable(_) => "function_table",
            Self::DrawGroup(_) => "draw_group",
            Self::Sprite(_) => "sprite",
            Self::Constants(_) => "constants",
            Self::Strings(_) => "strings",
            Self::Opaque => "opaque",
        }
    }
}

// ── Behavior routines ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorRoutine {
    pub arg_count: u8,
    pub local_count: u8,
    pub instructions: Vec<Instruction>,
}

/// One instruction: opcode, two branch targets, and a raw operand block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instruction {
    pub opcode: u16,
    pub true_target: u8,
    pub false_target: u8,
    pub operand: Vec<u8>,
}

impl Instruction {
    pub fn new(opcode: u16) -> Self {
        Self {
            opcode,
            true_target: RETURN_TRUE,
            false_target: RETURN_FALSE,
            operand: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_operand(mut self, operand: impl Into<Vec<u8>>) -> Self {
        self.operand = operand.into();
        self
    }

    #[must_use]
    pub fn with_targets(mut self, true_target: u8, false_target: u8) -> Self {
        self.true_target = true_target;
        self.false_target = false_target;
        self
    }
}

/// Branch target meaning "return error".
pub const RETURN_ERROR: u8 = 0xFD;
/// Branch target meaning "return true".
pub const RETURN_TRUE: u8 = 0xFE;
/// Branch target meaning "return false".
pub const RETURN_FALSE: u8 = 0xFF;

// ── Object definitions ─────────────────────────────────────────────

/// Numeric fields of an object definition. Zero means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDefinition {
    pub guid: u32,
    pub base_graphic_id: u16,
    pub tree_table_id: u16,
    pub slot_id: u16,
    pub catalog_strings_id: u16,
    pub body_strings_id: u16,
    pub function_table_id: u16,
    pub entry_points: Vec<EntryPoint>,
}

/// A named routine slot on an object definition (init, main, cleanup, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPoint {
    pub name: String,
    pub routine_id: u16,
}

// ── Tables ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionTable {
    pub entries: Vec<InteractionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionEntry {
    pub guard_routine: u16,
    pub action_routine: u16,
    pub string_index: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionTable {
    pub entries: Vec<FunctionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionEntry {
    pub guard_routine: u16,
    pub action_routine: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantsTable {
    pub values: Vec<i16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringTable {
    pub entries: Vec<String>,
}

// ── Graphics ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawGroup {
    pub images: Vec<DrawImage>,
}

/// One (direction, zoom) image layer of a drawable group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawImage {
    pub direction: u8,
    pub zoom: u8,
    pub sprite_ids: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sprite {
    pub palette_id: u16,
    pub frame_count: u16,
}
