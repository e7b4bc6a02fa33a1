use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::decoded::DecodedChunk;
use crate::model::{Reference, ResourceNode, TypeCode};
use crate::rules;
use crate::scope::ScopeRanges;
use crate::{ExtractError, Result};

/// Inputs shared by every rule invocation in one build.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub scopes: &'a ScopeRanges,
}

/// Trait implemented by each chunk type's reference extraction.
///
/// A rule never fails: a payload of the wrong shape, a short operand, or an
/// out-of-range id yields no reference for that occurrence.
pub trait ExtractionRule: Send + Sync + fmt::Debug {
    /// Chunk type this rule handles.
    fn type_code(&self) -> TypeCode;

    /// Short rule name for logs.
    fn name(&self) -> &'static str;

    /// References implied by one decoded resource.
    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference>;
}

/// Builds a rule on first use. An `Err` is cached and never retried.
pub type RuleFactory =
    Box<dyn Fn() -> std::result::Result<Arc<dyn ExtractionRule>, String> + Send + Sync>;

/// Factory for a built-in rule that cannot fail to construct.
pub fn deferred<R>() -> RuleFactory
where
    R: ExtractionRule + Default + 'static,
{
    Box::new(|| Ok::<Arc<dyn ExtractionRule>, String>(Arc::new(R::default())))
}

/// Observable registration state of one type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleState {
    Unregistered,
    /// Deferred and not yet looked up.
    Unresolved,
    Resolved,
    Failed(String),
}

enum RuleSlot {
    Eager(Arc<dyn ExtractionRule>),
    Deferred {
        factory: RuleFactory,
        resolved: OnceLock<std::result::Result<Arc<dyn ExtractionRule>, String>>,
    },
}

impl fmt::Debug for RuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager(rule) => f.debug_tuple("Eager").field(&rule.name()).finish(),
            Self::Deferred { resolved, .. } => f
                .debug_struct("Deferred")
                .field("resolved", &resolved.get().map(|r| r.as_ref().map(|rule| rule.name())))
                .finish_non_exhaustive(),
        }
    }
}

/// Registry mapping chunk type codes to extraction rules.
///
/// Constructed explicitly and passed by reference; there is no process-wide
/// instance, so independent registries never share state.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    slots: HashMap<TypeCode, RuleSlot>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in rule.
    ///
    /// Leaf types are registered eagerly; structured types are deferred and
    /// resolved the first time a chunk of that type is extracted.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        for leaf in rules::leaf::builtin_leaves() {
            reg.register(Arc::new(leaf));
        }
        reg.register_deferred(TypeCode::BHAV, deferred::<rules::behavior::BehaviorRule>());
        reg.register_deferred(TypeCode::OBJD, deferred::<rules::object::ObjectDefinitionRule>());
        reg.register_deferred(TypeCode::TTAB, deferred::<rules::tables::InteractionTableRule>());
        reg.register_deferred(TypeCode::OBJF, deferred::<rules::tables::FunctionTableRule>());
        reg.register_deferred(TypeCode::DGRP, deferred::<rules::graphics::DrawGroupRule>());
        reg.register_deferred(TypeCode::SPR2, deferred::<rules::graphics::SpriteRule>());
        reg
    }

    /// Register a ready rule, replacing any previous registration for its type.
    pub fn register(&mut self, rule: Arc<dyn ExtractionRule>) {
        let code = rule.type_code();
        if self.slots.insert(code, RuleSlot::Eager(rule)).is_some() {
            debug!(%code, "Replaced extraction rule");
        }
    }

    /// Register a rule to be built on first lookup.
    pub fn register_deferred(&mut self, code: TypeCode, factory: RuleFactory) {
        let slot = RuleSlot::Deferred {
            factory,
            resolved: OnceLock::new(),
        };
        if self.slots.insert(code, slot).is_some() {
            debug!(%code, "Replaced extraction rule");
        }
    }

    /// Look up the rule for `code`, resolving a deferred registration once.
    pub fn get(&self, code: TypeCode) -> Option<Arc<dyn ExtractionRule>> {
        match self.slots.get(&code)? {
            RuleSlot::Eager(rule) => Some(Arc::clone(rule)),
            RuleSlot::Deferred { factory, resolved } => resolved
                .get_or_init(|| {
                    let outcome = factory();
                    match &outcome {
                        Ok(rule) => debug!(%code, rule = rule.name(), "Resolved deferred rule"),
                        Err(reason) => warn!(%code, %reason, "Deferred rule failed to load"),
                    }
                    outcome
                })
                .as_ref()
                .ok()
                .cloned(),
        }
    }

    /// Current registration state; never triggers resolution.
    pub fn state(&self, code: TypeCode) -> RuleState {
        match self.slots.get(&code) {
            None => RuleState::Unregistered,
            Some(RuleSlot::Eager(_)) => RuleState::Resolved,
            Some(RuleSlot::Deferred { resolved, .. }) => match resolved.get() {
                None => RuleState::Unresolved,
                Some(Ok(_)) => RuleState::Resolved,
                Some(Err(reason)) => RuleState::Failed(reason.clone()),
            },
        }
    }

    pub fn contains(&self, code: TypeCode) -> bool {
        self.slots.contains_key(&code)
    }

    /// Registered type codes, sorted.
    pub fn registered_types(&self) -> Vec<TypeCode> {
        let mut codes: Vec<TypeCode> = self.slots.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Startup check: every `required` type must have a rule that resolves.
    ///
    /// Resolves deferred rules as a side effect, so a failing factory is
    /// reported here rather than silently skipped mid-build.
    pub fn validate(&self, required: &[TypeCode]) -> Result<()> {
        let mut missing: Vec<TypeCode> = required
            .iter()
            .copied()
            .filter(|code| !self.contains(*code))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        if !missing.is_empty() {
            return Err(ExtractError::MissingRules(missing));
        }

        for &code in required {
            if self.get(code).is_none() {
                let reason = match self.state(code) {
                    RuleState::Failed(reason) => reason,
                    other => format!("unexpected state {other:?}"),
                };
                return Err(ExtractError::RuleUnavailable { code, reason });
            }
        }
        Ok(())
    }
}
