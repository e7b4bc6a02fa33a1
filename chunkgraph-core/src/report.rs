//! Combined analysis report over one built graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyze::{Cycle, CycleAnalyzer, Severity, ValidationIssue, Validator};
use crate::build::BuildSummary;
use crate::config::ChunkgraphConfig;
use crate::error::ConfigError;
use crate::impact::{DeadCodeFinder, DeadCodeItem, OrphanExplainer, OrphanExplanation};
use crate::store::{GraphStats, ResourceGraph};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub suggestion: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(severities: impl IntoIterator<Item = &'a Severity>) -> Self {
        let mut counts = Self::default();
        for severity in severities {
            match severity {
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
                Severity::Suggestion => counts.suggestion += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSummary>,
    pub stats: GraphStats,
    pub cycles: Vec<Cycle>,
    pub issues: Vec<ValidationIssue>,
    pub dead_code: Vec<DeadCodeItem>,
    pub orphans: Vec<OrphanExplanation>,
    /// Counts over `issues`.
    pub severity_counts: SeverityCounts,
}

impl AnalysisReport {
    /// Run every analysis with the configured validation passes.
    pub fn generate(graph: &ResourceGraph, config: &ChunkgraphConfig) -> Result<Self, ConfigError> {
        let validator = Validator::with_passes(&config.validation.passes)?;
        let cycles = CycleAnalyzer::find_cycles(graph);
        let issues = validator.validate(graph);
        let dead_code = DeadCodeFinder::find_with_cycles(graph, &cycles);
        let orphans = OrphanExplainer::new(graph)
            .max_examples(config.analysis.max_sibling_examples)
            .explain_all();
        let severity_counts = SeverityCounts::tally(issues.iter().map(|i| &i.severity));

        info!(
            cycles = cycles.len(),
            issues = issues.len(),
            dead = dead_code.len(),
            orphans = orphans.len(),
            "Report generated"
        );
        Ok(Self {
            generated_at: Utc::now(),
            build: None,
            stats: graph.statistics(),
            cycles,
            issues,
            dead_code,
            orphans,
            severity_counts,
        })
    }

    #[must_use]
    pub fn with_build(mut self, build: BuildSummary) -> Self {
        self.build = Some(build);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.severity_counts.error > 0
    }
}
