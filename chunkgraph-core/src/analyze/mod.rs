//! Read-only analyses over a finished [`ResourceGraph`](crate::store::ResourceGraph).

pub mod cycles;
pub mod validate;

pub use cycles::{Cycle, CycleAnalyzer, CycleClass};
pub use validate::{Severity, ValidationIssue, ValidationPass, Validator};
