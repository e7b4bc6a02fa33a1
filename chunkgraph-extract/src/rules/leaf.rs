use crate::decoded::DecodedChunk;
use crate::model::{Reference, ResourceNode, TypeCode};
use crate::registry::{ExtractContext, ExtractionRule};

/// Rule for chunk types with no outgoing structure. Always yields nothing.
#[derive(Debug, Clone)]
pub struct LeafRule {
    code: TypeCode,
    name: &'static str,
}

impl LeafRule {
    pub const fn new(code: TypeCode, name: &'static str) -> Self {
        Self { code, name }
    }
}

impl ExtractionRule for LeafRule {
    fn type_code(&self) -> TypeCode {
        self.code
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(
        &self,
        _chunk: &DecodedChunk,
        _node: &ResourceNode,
        _ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        Vec::new()
    }
}

/// Leaf types shipped with the default registry.
///
/// `GLOB` is a leaf too: its presence in a container is the shared-library
/// import declaration, which the validator reads off the graph.
pub fn builtin_leaves() -> [LeafRule; 7] {
    [
        LeafRule::new(TypeCode::BCON, "constants"),
        LeafRule::new(TypeCode::STR, "strings"),
        LeafRule::new(TypeCode::CTSS, "catalog_strings"),
        LeafRule::new(TypeCode::TTAS, "interaction_strings"),
        LeafRule::new(TypeCode::SLOT, "slots"),
        LeafRule::new(TypeCode::PALT, "palette"),
        LeafRule::new(TypeCode::GLOB, "import_marker"),
    ]
}
