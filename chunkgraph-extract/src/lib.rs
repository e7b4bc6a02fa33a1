pub mod decoded;
pub mod model;
pub mod registry;
pub mod rules;
pub mod scope;

pub use decoded::DecodedChunk;
pub use model::{
    Reference, ReferenceKind, ResourceClass, ResourceIdentifier, ResourceNode, Scope,
    SemanticCategory, TypeCode,
};
pub use registry::{ExtractContext, ExtractionRule, RuleRegistry, RuleState};
pub use scope::{IdRange, ScopeRanges};

/// Error type for the extraction engine.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Invalid identifier {input:?}: {message}")]
    InvalidIdentifier { input: String, message: String },

    #[error("Invalid type code {0:?}: expected exactly four ASCII bytes")]
    InvalidTypeCode(String),

    #[error("Invalid scope ranges: {0}")]
    InvalidScopeRanges(String),

    #[error("No extraction rule registered for: {}", format_codes(.0))]
    MissingRules(Vec<TypeCode>),

    #[error("Extraction rule for {code} failed to load: {reason}")]
    RuleUnavailable { code: TypeCode, reason: String },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

fn format_codes(codes: &[TypeCode]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
