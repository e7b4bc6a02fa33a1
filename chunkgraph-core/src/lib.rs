//! chunkgraph core library: graph store, builder, analyses, and reports.
//!
//! The usual flow is [`build::GraphBuilder`] over a [`build::ChunkSource`],
//! producing a closed [`store::ResourceGraph`] that the read-only analyses in
//! [`analyze`] and [`impact`] then query. [`report::AnalysisReport`] runs all
//! of them at once.

pub mod analyze;
pub mod build;
pub mod config;
pub mod error;
pub mod export;
pub mod impact;
pub mod progress;
pub mod report;
pub mod store;

pub use chunkgraph_extract as extract;
