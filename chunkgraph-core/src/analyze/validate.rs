//! Scope and consistency validation.
//!
//! Each pass is independent and only appends issues, so passes can run in
//! any order or in isolation. Dangling references are data here, not errors:
//! the graph already holds them as phantom nodes.

use std::collections::HashMap;
use std::fmt;

use chunkgraph_extract::{
    Reference, ReferenceKind, ResourceClass, ResourceIdentifier, ResourceNode, Scope,
    SemanticCategory,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::store::ResourceGraph;

/// Names accepted by [`Validator::with_passes`], in default run order.
pub const PASS_NAMES: [&str; 6] = [
    "scope_consistency",
    "dangling_reference",
    "orphaned_resource",
    "tuning_integrity",
    "interaction_integrity",
    "cross_scope_import",
];

/// Issue severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    /// Advisory only; nothing is broken.
    Suggestion,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Machine-readable issue kind, e.g. `missing_ref`.
    pub category: String,
    pub source: Option<ResourceIdentifier>,
    pub target: Option<ResourceIdentifier>,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, category: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.to_string(),
            source: None,
            target: None,
            message: message.into(),
            suggestion: None,
        }
    }

    #[must_use]
    pub fn source(mut self, id: ResourceIdentifier) -> Self {
        self.source = Some(id);
        self
    }

    #[must_use]
    pub fn target(mut self, id: ResourceIdentifier) -> Self {
        self.target = Some(id);
        self
    }

    #[must_use]
    pub fn suggestion(mut self, text: impl Into<String>) -> Self {
        self.suggestion = Some(text.into());
        self
    }
}

/// One independent validation rule.
pub trait ValidationPass: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>);
}

/// Runs a set of passes and returns issues sorted by severity.
#[derive(Debug)]
pub struct Validator {
    passes: Vec<Box<dyn ValidationPass>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// A validator running every built-in pass.
    pub fn new() -> Self {
        Self {
            passes: PASS_NAMES.iter().filter_map(|name| builtin_pass(name)).collect(),
        }
    }

    /// A validator running only the named passes.
    pub fn with_passes<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let passes = names
            .iter()
            .map(|name| {
                builtin_pass(name.as_ref())
                    .ok_or_else(|| {
                        ConfigError::Invalid(format!("unknown validation pass {:?}", name.as_ref()))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { passes })
    }

    /// Add a caller-defined pass.
    pub fn push(&mut self, pass: Box<dyn ValidationPass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn validate(&self, graph: &ResourceGraph) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for pass in &self.passes {
            let before = issues.len();
            pass.check(graph, &mut issues);
            debug!(pass = pass.name(), issues = issues.len() - before, "Validation pass done");
        }
        issues.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.target.cmp(&b.target))
        });
        info!(
            issues = issues.len(),
            errors = issues.iter().filter(|i| i.severity == Severity::Error).count(),
            "Validation complete"
        );
        issues
    }
}

fn builtin_pass(name: &str) -> Option<Box<dyn ValidationPass>> {
    let pass: Box<dyn ValidationPass> = match name {
        "scope_consistency" => Box::new(ScopeConsistency),
        "dangling_reference" => Box::new(DanglingReference),
        "orphaned_resource" => Box::new(OrphanedResource),
        "tuning_integrity" => Box::new(TuningIntegrity),
        "interaction_integrity" => Box::new(InteractionIntegrity),
        "cross_scope_import" => Box::new(CrossScopeImport),
        _ => return None,
    };
    Some(pass)
}

/// Source's owning file when it is a decoded node without an import marker.
fn file_without_import<'g>(
    graph: &'g ResourceGraph,
    source: &ResourceIdentifier,
) -> Option<&'g ResourceNode> {
    let node = graph.node(source)?;
    let file = node.file.as_deref()?;
    (!graph.file_declares_import(file)).then_some(node)
}

fn file_name(node: &ResourceNode) -> String {
    node.file
        .as_deref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string())
}

fn target_scope(graph: &ResourceGraph, edge: &Reference) -> Scope {
    graph.node(&edge.target).map_or(edge.target_scope, |n| n.scope)
}

// ── Passes ────────────────────────────────────────────────────────────

/// Behavioral edge into a shared library from a file with no import marker.
#[derive(Debug)]
struct ScopeConsistency;

impl ValidationPass for ScopeConsistency {
    fn name(&self) -> &'static str {
        "scope_consistency"
    }

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>) {
        for edge in graph.edges() {
            if !edge.is(SemanticCategory::Behavioral)
                || target_scope(graph, edge) != Scope::SharedLibrary
            {
                continue;
            }
            let Some(source) = file_without_import(graph, &edge.source) else {
                continue;
            };
            // The library calling itself needs no import.
            if source.scope == Scope::SharedLibrary {
                continue;
            }
            issues.push(
                ValidationIssue::new(
                    Severity::Warning,
                    "scope_mismatch",
                    format!(
                        "{} calls shared-library routine {} at {}, \
                         but {} declares no library import",
                        edge.source,
                        edge.target,
                        edge.locus,
                        file_name(source)
                    ),
                )
                .source(edge.source)
                .target(edge.target)
                .suggestion(
                    "Add the shared-library import marker (GLOB) to the container, \
                     or call an object-local routine",
                ),
            );
        }
    }
}

/// Severity of an edge whose target was never decoded.
pub fn dangling_severity(edge: &Reference) -> Severity {
    if edge.is(SemanticCategory::Tuning) {
        Severity::Error
    } else if edge.kind == ReferenceKind::Soft {
        Severity::Info
    } else if edge.is(SemanticCategory::Behavioral) && edge.kind == ReferenceKind::Hard {
        Severity::Error
    } else {
        Severity::Warning
    }
}

#[derive(Debug)]
struct DanglingReference;

impl ValidationPass for DanglingReference {
    fn name(&self) -> &'static str {
        "dangling_reference"
    }

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>) {
        for phantom in graph.phantoms() {
            for edge in graph.who_references(&phantom.id) {
                let what = edge.category.map_or("untyped", SemanticCategory::as_str);
                issues.push(
                    ValidationIssue::new(
                        dangling_severity(edge),
                        "missing_ref",
                        format!(
                            "{} has a {} {} reference to {} at {}, which is not in any loaded file",
                            edge.source, edge.kind, what, edge.target, edge.locus
                        ),
                    )
                    .source(edge.source)
                    .target(edge.target)
                    .suggestion(format!(
                        "Load the container defining {}, or fix the reference at {}",
                        edge.target.long_form(),
                        edge.locus
                    )),
                );
            }
        }
    }
}

#[derive(Debug)]
struct OrphanedResource;

impl ValidationPass for OrphanedResource {
    fn name(&self) -> &'static str {
        "orphaned_resource"
    }

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>) {
        for node in graph.find_orphans() {
            let class = node.class();
            if class.is_load_bearing() {
                issues.push(
                    ValidationIssue::new(
                        Severity::Warning,
                        "orphan_resource",
                        format!(
                            "{} is not referenced by any object definition",
                            node.display_name()
                        ),
                    )
                    .target(node.id)
                    .suggestion("Point an object definition at it, or remove it"),
                );
            } else if class == ResourceClass::Behavior {
                let calls_out = graph
                    .what_references(&node.id)
                    .iter()
                    .any(|e| e.is(SemanticCategory::Behavioral));
                let issue = if calls_out {
                    ValidationIssue::new(
                        Severity::Warning,
                        "unreachable_code",
                        format!(
                            "{} does something but is unreachable: nothing calls it",
                            node.display_name()
                        ),
                    )
                    .suggestion(
                        "Call it from an interaction table or another routine, or delete it",
                    )
                } else {
                    ValidationIssue::new(
                        Severity::Info,
                        "empty_stub",
                        format!(
                            "{} is an orphaned stub with no calls in or out",
                            node.display_name()
                        ),
                    )
                    .suggestion("Delete the stub, or fill it in and call it")
                };
                issues.push(issue.target(node.id));
            }
        }
    }
}

/// Missing constants tables, reported once per table.
#[derive(Debug)]
struct TuningIntegrity;

impl ValidationPass for TuningIntegrity {
    fn name(&self) -> &'static str {
        "tuning_integrity"
    }

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>) {
        for phantom in graph.phantoms().filter(|n| n.class() == ResourceClass::Constants) {
            let readers: Vec<&Reference> = graph
                .who_references(&phantom.id)
                .into_iter()
                .filter(|e| e.is(SemanticCategory::Tuning))
                .collect();
            if readers.is_empty() {
                continue;
            }
            issues.push(
                ValidationIssue::new(
                    Severity::Error,
                    "tuning_missing",
                    format!(
                        "constants table {} is read {} time(s) but missing; first read by {} at {}",
                        phantom.id,
                        readers.len(),
                        readers[0].source,
                        readers[0].locus
                    ),
                )
                .target(phantom.id)
                .suggestion(format!(
                    "Restore {} or load the library that defines it",
                    phantom.id.long_form()
                )),
            );
        }
    }
}

#[derive(Debug)]
struct InteractionIntegrity;

impl ValidationPass for InteractionIntegrity {
    fn name(&self) -> &'static str {
        "interaction_integrity"
    }

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>) {
        for table in graph
            .nodes()
            .filter(|n| !n.is_phantom && n.class() == ResourceClass::InteractionTable)
        {
            if graph.inbound_count(&table.id) == 0 {
                issues.push(
                    ValidationIssue::new(
                        Severity::Info,
                        "interaction_unbound",
                        format!("interaction table {} has no inbound references", table.id),
                    )
                    .target(table.id)
                    .suggestion(format!(
                        "Set tree_table_id = {} on the object definition that owns it",
                        table.id.instance
                    )),
                );
            }

            for edge in graph
                .what_references(&table.id)
                .into_iter()
                .filter(|e| e.is(SemanticCategory::Behavioral))
            {
                let exists = graph.node(&edge.target).is_some_and(|n| !n.is_phantom);
                if !exists {
                    issues.push(
                        ValidationIssue::new(
                            Severity::Error,
                            "interaction_handler_missing",
                            format!(
                                "interaction table {} {} names routine {}, which does not exist",
                                table.id, edge.locus, edge.target
                            ),
                        )
                        .source(table.id)
                        .target(edge.target)
                        .suggestion(format!(
                            "Restore {} or point {} at an existing routine",
                            edge.target.long_form(),
                            edge.locus
                        )),
                    );
                }
                // A handler referenced by this table alone is a dedicated
                // handler, which is the normal layout.
            }
        }
    }
}

/// Non-behavioral object-scope references into a shared library without an
/// import marker. Behavioral ones are covered by scope consistency.
#[derive(Debug)]
struct CrossScopeImport;

impl ValidationPass for CrossScopeImport {
    fn name(&self) -> &'static str {
        "cross_scope_import"
    }

    fn check(&self, graph: &ResourceGraph, issues: &mut Vec<ValidationIssue>) {
        let mut per_file: HashMap<(ResourceIdentifier, ResourceIdentifier), &Reference> =
            HashMap::new();
        for edge in graph.edges() {
            if edge.is(SemanticCategory::Behavioral)
                || target_scope(graph, edge) != Scope::SharedLibrary
            {
                continue;
            }
            let Some(source) = file_without_import(graph, &edge.source) else {
                continue;
            };
            if source.scope != Scope::ObjectLocal {
                continue;
            }
            per_file.entry((edge.source, edge.target)).or_insert(edge);
        }

        let mut edges: Vec<&Reference> = per_file.into_values().collect();
        edges.sort_by(|a, b| (a.source, a.target).cmp(&(b.source, b.target)));
        for edge in edges {
            issues.push(
                ValidationIssue::new(
                    Severity::Suggestion,
                    "cross_scope_import",
                    format!(
                        "{} uses shared-library resource {} without an import marker in its file",
                        edge.source, edge.target
                    ),
                )
                .source(edge.source)
                .target(edge.target)
                .suggestion("Add the shared-library import marker (GLOB) to the container"),
            );
        }
    }
}
