// Identifier & entity model: the value types every other layer keys on.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ExtractError;

// ── Type codes ─────────────────────────────────────────────────────

/// Four-byte chunk type tag (`BHAV`, `OBJD`, `STR#`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeCode(pub [u8; 4]);

impl TypeCode {
    pub const BHAV: Self = Self(*b"BHAV");
    pub const OBJD: Self = Self(*b"OBJD");
    pub const TTAB: Self = Self(*b"TTAB");
    pub const TTAS: Self = Self(*b"TTAs");
    pub const OBJF: Self = Self(*b"OBJf");
    pub const DGRP: Self = Self(*b"DGRP");
    pub const SPR2: Self = Self(*b"SPR2");
    pub const PALT: Self = Self(*b"PALT");
    pub const BCON: Self = Self(*b"BCON");
    pub const STR: Self = Self(*b"STR#");
    pub const CTSS: Self = Self(*b"CTSS");
    pub const SLOT: Self = Self(*b"SLOT");
    pub const GLOB: Self = Self(*b"GLOB");

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Semantic class of this chunk type, used by the validator and impact tools.
    pub fn class(self) -> ResourceClass {
        match &self.0 {
            b"BHAV" => ResourceClass::Behavior,
            b"OBJD" => ResourceClass::ObjectDefinition,
            b"TTAB" => ResourceClass::InteractionTable,
            b"OBJf" => ResourceClass::FunctionTable,
            b"DGRP" => ResourceClass::DrawGroup,
            b"SPR2" => ResourceClass::Sprite,
            b"PALT" => ResourceClass::Palette,
            b"BCON" => ResourceClass::Constants,
            b"STR#" | b"CTSS" | b"TTAs" => ResourceClass::Strings,
            b"SLOT" => ResourceClass::Slots,
            b"GLOB" => ResourceClass::ImportMarker,
            _ => ResourceClass::Other,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({self})")
    }
}

impl FromStr for TypeCode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| ExtractError::InvalidTypeCode(s.to_string()))?;
        if !bytes.is_ascii() {
            return Err(ExtractError::InvalidTypeCode(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for TypeCode {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeCode> for String {
    fn from(code: TypeCode) -> Self {
        code.to_string()
    }
}

/// Coarse role of a chunk type within the content format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Behavior,
    ObjectDefinition,
    InteractionTable,
    FunctionTable,
    DrawGroup,
    Sprite,
    Palette,
    Constants,
    Strings,
    Slots,
    ImportMarker,
    Other,
}

impl ResourceClass {
    /// Classes whose orphaning means content is silently unused.
    pub fn is_load_bearing(self) -> bool {
        matches!(self, Self::InteractionTable | Self::DrawGroup)
    }
}

// ── Identifiers ────────────────────────────────────────────────────

/// The (type, group, instance) triple naming one resource.
///
/// Equal triples denote the same logical resource no matter which
/// container produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub type_code: TypeCode,
    pub group: u32,
    pub instance: u32,
}

impl ResourceIdentifier {
    pub const fn new(type_code: TypeCode, group: u32, instance: u32) -> Self {
        Self {
            type_code,
            group,
            instance,
        }
    }

    /// `TYPE#instance@0xgroup`, unambiguous across groups.
    pub fn long_form(&self) -> String {
        format!("{}#{}@{:#x}", self.type_code, self.instance, self.group)
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_code, self.instance)
    }
}

impl fmt::Debug for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.long_form())
    }
}

/// Parses `TYPE#instance` or `TYPE#instance@group`; numbers may be decimal or `0x` hex.
impl FromStr for ResourceIdentifier {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ExtractError::InvalidIdentifier {
            input: s.to_string(),
            message: message.to_string(),
        };

        let (code, rest) = s.split_once('#').ok_or_else(|| invalid("missing '#'"))?;
        // `STR#` itself contains the separator; a three-byte prefix means the
        // real split is at the last '#'.
        let (code, rest) = if code.len() == 3 {
            s.rsplit_once('#').ok_or_else(|| invalid("missing '#'"))?
        } else {
            (code, rest)
        };
        let type_code: TypeCode = code.parse()?;

        let (instance, group) = match rest.split_once('@') {
            Some((inst, grp)) => (inst, Some(grp)),
            None => (rest, None),
        };
        let instance = parse_number(instance).ok_or_else(|| invalid("bad instance number"))?;
        let group = match group {
            Some(g) => parse_number(g).ok_or_else(|| invalid("bad group number"))?,
            None => 0,
        };

        Ok(Self::new(type_code, group, instance))
    }
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

// ── Scope ──────────────────────────────────────────────────────────

/// Sharing tier of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    ObjectLocal,
    SharedLibrary,
    Global,
    #[default]
    Unknown,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ObjectLocal => "object_local",
            Self::SharedLibrary => "shared_library",
            Self::Global => "global",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Nodes ──────────────────────────────────────────────────────────

/// One decoded (or merely referenced) resource in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: ResourceIdentifier,
    /// Container the resource was decoded from; `None` for phantoms.
    pub file: Option<PathBuf>,
    pub scope: Scope,
    pub label: Option<String>,
    pub size: u64,
    pub is_phantom: bool,
}

impl ResourceNode {
    /// A node for a resource actually decoded from `file`.
    pub fn decoded(id: ResourceIdentifier, file: impl Into<PathBuf>, scope: Scope) -> Self {
        Self {
            id,
            file: Some(file.into()),
            scope,
            label: None,
            size: 0,
            is_phantom: false,
        }
    }

    /// A placeholder for a resource known only because something references it.
    pub fn phantom(id: ResourceIdentifier, scope: Scope) -> Self {
        Self {
            id,
            file: None,
            scope,
            label: None,
            size: 0,
            is_phantom: true,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn resource_type(&self) -> TypeCode {
        self.id.type_code
    }

    pub fn class(&self) -> ResourceClass {
        self.id.type_code.class()
    }

    /// Label if present, otherwise the identifier.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => format!("{} ({label})", self.id),
            _ => self.id.to_string(),
        }
    }
}

// ── References ─────────────────────────────────────────────────────

/// How a reference is resolved by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Required; the referencing resource is broken without the target.
    Hard,
    /// Optional; absence degrades gracefully.
    Soft,
    /// Table lookup by computed index.
    Indexed,
    /// Resolved in another container.
    Import,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
            Self::Indexed => "indexed",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reference means to the content, independent of mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticCategory {
    Structural,
    Behavioral,
    Visual,
    Tuning,
}

impl SemanticCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Behavioral => "behavioral",
            Self::Visual => "visual",
            Self::Tuning => "tuning",
        }
    }
}

impl fmt::Display for SemanticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge: `source` depends on `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub source: ResourceIdentifier,
    pub target: ResourceIdentifier,
    pub kind: ReferenceKind,
    /// Field or instruction that produced the edge, e.g. `instr[3].opcode`.
    pub locus: String,
    pub description: String,
    /// 0.0–1.0; below 1.0 for heuristic decodes.
    pub confidence: f64,
    pub category: Option<SemanticCategory>,
    /// Scope inferred for the target; used when it has to be created as a phantom.
    pub target_scope: Scope,
}

impl Reference {
    pub fn new(
        source: ResourceIdentifier,
        target: ResourceIdentifier,
        kind: ReferenceKind,
    ) -> Self {
        Self {
            source,
            target,
            kind,
            locus: String::new(),
            description: String::new(),
            confidence: 1.0,
            category: None,
            target_scope: Scope::Unknown,
        }
    }

    #[must_use]
    pub fn category(mut self, category: SemanticCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn locus(mut self, locus: impl Into<String>) -> Self {
        self.locus = locus.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn target_scope(mut self, scope: Scope) -> Self {
        self.target_scope = scope;
        self
    }

    pub fn is(&self, category: SemanticCategory) -> bool {
        self.category == Some(category)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
