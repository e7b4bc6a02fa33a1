pub mod behavior;
pub mod graphics;
pub mod leaf;
pub mod object;
pub mod tables;

use crate::model::{Reference, ReferenceKind, ResourceIdentifier, Scope, SemanticCategory, TypeCode};
use crate::scope::ScopeRanges;

/// Edge to a routine, typed by where the routine lives.
///
/// Object-local routines are hard references; global and shared-library
/// routines live in another container and are imports. Routines outside
/// every known range are still recorded, at reduced confidence.
pub(crate) fn routine_ref(
    scopes: &ScopeRanges,
    source: &ResourceIdentifier,
    routine_id: u32,
    locus: String,
    description: String,
) -> Reference {
    let (target, scope) = scopes.resolve(TypeCode::BHAV, routine_id, source);
    let (kind, confidence) = match scope {
        Scope::ObjectLocal => (ReferenceKind::Hard, 1.0),
        Scope::Global | Scope::SharedLibrary => (ReferenceKind::Import, 1.0),
        Scope::Unknown => (ReferenceKind::Hard, 0.5),
    };
    Reference::new(*source, target, kind)
        .category(SemanticCategory::Behavioral)
        .locus(locus)
        .description(description)
        .confidence(confidence)
        .target_scope(scope)
}

/// Edge to another chunk in the same container.
pub(crate) fn local_ref(
    scopes: &ScopeRanges,
    source: &ResourceIdentifier,
    type_code: TypeCode,
    instance: u32,
    kind: ReferenceKind,
    category: SemanticCategory,
) -> Reference {
    let target = scopes.local(type_code, instance, source);
    Reference::new(*source, target, kind)
        .category(category)
        .target_scope(Scope::ObjectLocal)
}
