// Range-based scope classification.
//
// Which instance sub-ranges mean object-local, shared-library, or global is
// a property of the format version under analysis, so the boundaries are
// configuration rather than constants.

use serde::{Deserialize, Serialize};

use crate::model::{ResourceIdentifier, Scope, TypeCode};
use crate::{ExtractError, Result};

/// Half-open instance range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instance: u32) -> bool {
        instance >= self.start && instance < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Scope boundaries and group assignment for one format version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeRanges {
    /// Opcodes in this range are primitives, not routine calls.
    pub primitive: IdRange,
    pub global: IdRange,
    pub object_local: IdRange,
    pub shared_library: IdRange,
    /// Group id assigned to global-scope targets.
    pub global_group: u32,
    /// Group id assigned to shared-library targets.
    pub shared_group: u32,
    /// Instance of constants table 0 for each tier of tuning reads.
    pub tuning_local_base: u32,
    pub tuning_shared_base: u32,
    pub tuning_global_base: u32,
}

impl Default for ScopeRanges {
    fn default() -> Self {
        Self {
            primitive: IdRange::new(0x0000, 0x0100),
            global: IdRange::new(0x0100, 0x1000),
            object_local: IdRange::new(0x1000, 0x2000),
            shared_library: IdRange::new(0x2000, 0x3000),
            global_group: 0,
            shared_group: 0,
            tuning_local_base: 0x1000,
            tuning_shared_base: 0x2000,
            tuning_global_base: 0x0100,
        }
    }
}

/// Tuning table numbers below this are object-local.
const TUNING_LOCAL_TABLES: u16 = 64;
/// Tuning table numbers below this (and not local) are shared-library.
const TUNING_SHARED_TABLES: u16 = 128;
/// Highest table number a 9-bit operand field can name.
const TUNING_MAX_TABLE: u16 = 0x1FF;

impl ScopeRanges {
    /// Reject empty or overlapping ranges, and tuning bases too close to
    /// the top of the id space to hold every table of their tier.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("primitive", self.primitive),
            ("global", self.global),
            ("object_local", self.object_local),
            ("shared_library", self.shared_library),
        ];
        for (name, range) in &named {
            if range.is_empty() {
                return Err(ExtractError::InvalidScopeRanges(format!(
                    "{name} range [{:#x}, {:#x}) is empty",
                    range.start, range.end
                )));
            }
        }
        for (i, (a_name, a)) in named.iter().enumerate() {
            for (b_name, b) in &named[i + 1..] {
                if a.overlaps(b) {
                    return Err(ExtractError::InvalidScopeRanges(format!(
                        "{a_name} and {b_name} ranges overlap"
                    )));
                }
            }
        }
        let tiers = [
            ("tuning_local_base", self.tuning_local_base, TUNING_LOCAL_TABLES - 1),
            (
                "tuning_shared_base",
                self.tuning_shared_base,
                TUNING_SHARED_TABLES - TUNING_LOCAL_TABLES - 1,
            ),
            (
                "tuning_global_base",
                self.tuning_global_base,
                TUNING_MAX_TABLE - TUNING_SHARED_TABLES,
            ),
        ];
        for (name, base, span) in tiers {
            if base.checked_add(u32::from(span)).is_none() {
                return Err(ExtractError::InvalidScopeRanges(format!(
                    "{name} {base:#x} leaves no room for {} tables",
                    span + 1
                )));
            }
        }
        Ok(())
    }

    pub fn is_primitive(&self, instance: u32) -> bool {
        self.primitive.contains(instance)
    }

    /// Scope implied by where `instance` falls in the routine id space.
    pub fn classify(&self, instance: u32) -> Scope {
        if self.object_local.contains(instance) {
            Scope::ObjectLocal
        } else if self.shared_library.contains(instance) {
            Scope::SharedLibrary
        } else if self.global.contains(instance) {
            Scope::Global
        } else {
            Scope::Unknown
        }
    }

    /// Group a target in `scope` lives in, given the referencing resource's group.
    pub fn target_group(&self, scope: Scope, source_group: u32) -> u32 {
        match scope {
            Scope::Global => self.global_group,
            Scope::SharedLibrary => self.shared_group,
            Scope::ObjectLocal | Scope::Unknown => source_group,
        }
    }

    /// Resolve a range-classified target referenced from `source`.
    pub fn resolve(
        &self,
        type_code: TypeCode,
        instance: u32,
        source: &ResourceIdentifier,
    ) -> (ResourceIdentifier, Scope) {
        let scope = self.classify(instance);
        let group = self.target_group(scope, source.group);
        (ResourceIdentifier::new(type_code, group, instance), scope)
    }

    /// Resolve a same-container target; these are always object-local.
    pub fn local(
        &self,
        type_code: TypeCode,
        instance: u32,
        source: &ResourceIdentifier,
    ) -> ResourceIdentifier {
        ResourceIdentifier::new(type_code, source.group, instance)
    }

    /// Map a tuning table number from an expression operand to a constants-table target.
    ///
    /// `None` when the configured base plus the table offset leaves the id space.
    pub fn tuning_table(
        &self,
        table: u16,
        source: &ResourceIdentifier,
    ) -> Option<(ResourceIdentifier, Scope)> {
        let (base, offset, scope) = if table < TUNING_LOCAL_TABLES {
            (self.tuning_local_base, table, Scope::ObjectLocal)
        } else if table < TUNING_SHARED_TABLES {
            (
                self.tuning_shared_base,
                table - TUNING_LOCAL_TABLES,
                Scope::SharedLibrary,
            )
        } else {
            (
                self.tuning_global_base,
                table - TUNING_SHARED_TABLES,
                Scope::Global,
            )
        };
        let instance = base.checked_add(u32::from(offset))?;
        let group = self.target_group(scope, source.group);
        Some((ResourceIdentifier::new(TypeCode::BCON, group, instance), scope))
    }

    /// Default scope for a freshly decoded resource.
    ///
    /// Routine and constants ids live in the classified id space; everything
    /// else, and anything outside the known ranges, is object-local.
    pub fn node_scope(&self, id: &ResourceIdentifier) -> Scope {
        if id.type_code == TypeCode::BHAV || id.type_code == TypeCode::BCON {
            match self.classify(id.instance) {
                Scope::Unknown => Scope::ObjectLocal,
                scope => scope,
            }
        } else {
            Scope::ObjectLocal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ResourceIdentifier {
        ResourceIdentifier::new(TypeCode::BHAV, 42, 0x1000)
    }

    #[test]
    fn classifies_default_ranges() {
        let ranges = ScopeRanges::default();
        assert_eq!(ranges.classify(0x0150), Scope::Global);
        assert_eq!(ranges.classify(0x1001), Scope::ObjectLocal);
        assert_eq!(ranges.classify(0x2fff), Scope::SharedLibrary);
        assert_eq!(ranges.classify(0x3000), Scope::Unknown);
        assert!(ranges.is_primitive(0x0002));
        assert!(!ranges.is_primitive(0x0100));
    }

    #[test]
    fn boundaries_are_injectable() {
        let ranges = ScopeRanges {
            object_local: IdRange::new(0x4000, 0x5000),
            ..ScopeRanges::default()
        };
        assert_eq!(ranges.classify(0x4000), Scope::ObjectLocal);
        assert_eq!(ranges.classify(0x1000), Scope::Unknown);
    }

    #[test]
    fn resolve_assigns_groups_by_scope() {
        let ranges = ScopeRanges {
            global_group: 0x7FD4_6CD0,
            shared_group: 9,
            ..ScopeRanges::default()
        };
        let (local, scope) = ranges.resolve(TypeCode::BHAV, 0x1002, &source());
        assert_eq!((local.group, scope), (42, Scope::ObjectLocal));
        let (shared, scope) = ranges.resolve(TypeCode::BHAV, 0x2002, &source());
        assert_eq!((shared.group, scope), (9, Scope::SharedLibrary));
        let (global, scope) = ranges.resolve(TypeCode::BHAV, 0x0102, &source());
        assert_eq!((global.group, scope), (0x7FD4_6CD0, Scope::Global));
    }

    #[test]
    fn tuning_tables_map_to_tiers() {
        let ranges = ScopeRanges::default();
        let (id, scope) = ranges.tuning_table(3, &source()).unwrap();
        assert_eq!((id.instance, scope), (0x1003, Scope::ObjectLocal));
        let (id, scope) = ranges.tuning_table(65, &source()).unwrap();
        assert_eq!((id.instance, scope), (0x2001, Scope::SharedLibrary));
        let (id, scope) = ranges.tuning_table(130, &source()).unwrap();
        assert_eq!((id.instance, scope), (0x0102, Scope::Global));
        assert_eq!(id.type_code, TypeCode::BCON);
    }

    #[test]
    fn tuning_base_near_id_space_top() {
        let ranges = ScopeRanges {
            tuning_global_base: u32::MAX,
            ..ScopeRanges::default()
        };
        assert!(ranges.validate().is_err());
        assert!(ranges.tuning_table(200, &source()).is_none());
        let (id, _) = ranges.tuning_table(128, &source()).unwrap();
        assert_eq!(id.instance, u32::MAX);

        let fits = ScopeRanges {
            tuning_global_base: u32::MAX - u32::from(TUNING_MAX_TABLE - TUNING_SHARED_TABLES),
            ..ScopeRanges::default()
        };
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn validate_rejects_overlap_and_empty() {
        assert!(ScopeRanges::default().validate().is_ok());

        let overlapping = ScopeRanges {
            shared_library: IdRange::new(0x1800, 0x3000),
            ..ScopeRanges::default()
        };
        assert!(overlapping.validate().is_err());

        let empty = ScopeRanges {
            global: IdRange::new(0x0100, 0x0100),
            ..ScopeRanges::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn node_scope_defaults_to_object_local() {
        let ranges = ScopeRanges::default();
        let ttab = ResourceIdentifier::new(TypeCode::TTAB, 0, 0x2000);
        assert_eq!(ranges.node_scope(&ttab), Scope::ObjectLocal);
        let shared = ResourceIdentifier::new(TypeCode::BHAV, 0, 0x2000);
        assert_eq!(ranges.node_scope(&shared), Scope::SharedLibrary);
        let odd = ResourceIdentifier::new(TypeCode::BHAV, 0, 0x9000);
        assert_eq!(ranges.node_scope(&odd), Scope::ObjectLocal);
    }
}
