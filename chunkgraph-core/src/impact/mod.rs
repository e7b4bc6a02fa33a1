//! Impact tools: what is dead, what a change touches, and why something is
//! orphaned.

pub mod blast_radius;
pub mod dead_code;
pub mod orphans;

pub use blast_radius::{BlastRadius, BlastRadiusCalculator, IndirectCaller};
pub use dead_code::{DeadCodeFinder, DeadCodeItem, DeadCodeKind};
pub use orphans::{OrphanExplainer, OrphanExplanation, SiblingExample};
