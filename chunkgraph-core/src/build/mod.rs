//! Two-phase graph construction.
//!
//! Phase one indexes every chunk of every container as a node. Phase two
//! runs the registered rule for each indexed node. Extraction only starts
//! once indexing has seen every container, so a rule's target is either a
//! real node or becomes a phantom regardless of container order.

mod source;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chunkgraph_extract::{
    ExtractContext, ResourceIdentifier, ResourceNode, RuleRegistry, ScopeRanges, TypeCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::progress::{NoopReporter, ProgressReporter};
use crate::store::{NodeInsert, ResourceGraph};

pub use source::{
    ChunkDecoder, ChunkSource, Container, ContainerDump, DumpChunk, DumpSource, JsonDecoder,
    MemorySource, RawChunk,
};

/// Counters collected during one build.
#[derive(Debug, Default)]
pub struct BuildStats {
    pub files_read: usize,
    pub chunks_indexed: usize,
    /// Chunks whose identifier was already indexed from an earlier container.
    pub duplicate_chunks: usize,
    pub phantoms_upgraded: usize,
    /// Chunks with a rule whose payload the decoder could not decode.
    pub undecoded: usize,
    pub rules_run: usize,
    pub references_added: usize,
    pub phantoms_created: usize,
    /// Type codes seen during indexing that have no registered rule.
    pub skipped_types: BTreeSet<TypeCode>,
    pub duration: Duration,
    pub errors: Vec<(PathBuf, SourceError)>,
}

impl BuildStats {
    pub fn files_failed(&self) -> usize {
        self.errors.len()
    }

    /// Serializable view with errors rendered as text.
    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            files_read: self.files_read,
            files_failed: self.files_failed(),
            chunks_indexed: self.chunks_indexed,
            duplicate_chunks: self.duplicate_chunks,
            undecoded: self.undecoded,
            rules_run: self.rules_run,
            references_added: self.references_added,
            phantoms_created: self.phantoms_created,
            skipped_types: self.skipped_types.iter().copied().collect(),
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            errors: self
                .errors
                .iter()
                .map(|(path, e)| format!("{}: {e}", path.display()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub files_read: usize,
    pub files_failed: usize,
    pub chunks_indexed: usize,
    pub duplicate_chunks: usize,
    pub undecoded: usize,
    pub rules_run: usize,
    pub references_added: usize,
    pub phantoms_created: usize,
    pub skipped_types: Vec<TypeCode>,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

/// A finished graph and the statistics of the build that produced it.
#[derive(Debug)]
pub struct BuildOutput {
    pub graph: ResourceGraph,
    pub stats: BuildStats,
}

/// Drives indexing and extraction over a [`ChunkSource`].
pub struct GraphBuilder<'a> {
    registry: &'a RuleRegistry,
    decoder: &'a dyn ChunkDecoder,
    scopes: &'a ScopeRanges,
    progress: &'a dyn ProgressReporter,
}

impl std::fmt::Debug for GraphBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("registry", self.registry)
            .field("scopes", self.scopes)
            .finish_non_exhaustive()
    }
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        registry: &'a RuleRegistry,
        decoder: &'a dyn ChunkDecoder,
        scopes: &'a ScopeRanges,
    ) -> Self {
        Self {
            registry,
            decoder,
            scopes,
            progress: &NoopReporter,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Read every entry of `source` and build the graph.
    ///
    /// An entry that fails to read is recorded in [`BuildStats::errors`] and
    /// skipped; it never aborts the build.
    pub fn build(&self, source: &dyn ChunkSource) -> BuildOutput {
        let start = Instant::now();
        let mut stats = BuildStats::default();
        let mut graph = ResourceGraph::new();
        let mut payloads: HashMap<ResourceIdentifier, RawChunk> = HashMap::new();

        // ── Phase 1: index ─────────────────────────────────────────
        let entries = source.entries();
        self.progress.start("indexing", Some(entries.len() as u64));
        for entry in &entries {
            match source.read(entry) {
                Ok(container) => {
                    stats.files_read += 1;
                    self.index_container(container, &mut graph, &mut payloads, &mut stats);
                }
                Err(e) => {
                    warn!(path = %entry.display(), error = %e, "Failed to read container");
                    self.progress.message(&format!("skipped {}: {e}", entry.display()));
                    stats.errors.push((entry.clone(), e));
                }
            }
            self.progress.advance(1);
        }
        self.progress.finish();
        info!(
            files = stats.files_read,
            failed = stats.files_failed(),
            chunks = stats.chunks_indexed,
            "Indexed containers"
        );

        // ── Phase 2: extract ───────────────────────────────────────
        self.extract_all(&mut graph, &payloads, &mut stats);

        stats.duration = start.elapsed();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            phantoms = stats.phantoms_created,
            duration_ms = stats.duration.as_millis(),
            "Graph built"
        );
        BuildOutput { graph, stats }
    }

    fn index_container(
        &self,
        container: Container,
        graph: &mut ResourceGraph,
        payloads: &mut HashMap<ResourceIdentifier, RawChunk>,
        stats: &mut BuildStats,
    ) {
        debug!(
            path = %container.path.display(),
            chunks = container.chunks.len(),
            "Indexing container"
        );
        for chunk in container.chunks {
            let id = chunk.id();
            let mut node =
                ResourceNode::decoded(id, container.path.clone(), self.scopes.node_scope(&id))
                    .with_size(chunk.size);
            if let Some(label) = &chunk.label {
                node = node.with_label(label.clone());
            }

            match graph.add_node(node) {
                NodeInsert::Inserted => {}
                NodeInsert::Upgraded => stats.phantoms_upgraded += 1,
                NodeInsert::Existing => {
                    debug!(id = %id, path = %container.path.display(), "Duplicate chunk ignored");
                    stats.duplicate_chunks += 1;
                    continue;
                }
            }
            stats.chunks_indexed += 1;

            if !self.registry.contains(id.type_code) && stats.skipped_types.insert(id.type_code) {
                warn!(
                    type_code = %id.type_code,
                    "No extraction rule registered; chunks of this type are skipped"
                );
            }
            payloads.insert(id, chunk);
        }
    }

    fn extract_all(
        &self,
        graph: &mut ResourceGraph,
        payloads: &HashMap<ResourceIdentifier, RawChunk>,
        stats: &mut BuildStats,
    ) {
        let ctx = ExtractContext { scopes: self.scopes };
        // Snapshot the indexed nodes; phantoms added below have no payload.
        let indexed: Vec<ResourceNode> = graph.nodes().filter(|n| !n.is_phantom).cloned().collect();

        self.progress.start("extracting", Some(indexed.len() as u64));
        for node in &indexed {
            self.progress.advance(1);
            let Some(rule) = self.registry.get(node.id.type_code) else {
                continue;
            };
            let Some(raw) = payloads.get(&node.id) else {
                continue;
            };
            let Some(decoded) = self.decoder.decode(raw) else {
                stats.undecoded += 1;
                continue;
            };

            let refs = rule.extract(&decoded, node, &ctx);
            stats.rules_run += 1;
            for reference in refs {
                let outcome = graph.add_reference(reference);
                stats.references_added += 1;
                stats.phantoms_created += outcome.phantoms_created;
            }
        }
        self.progress.finish();
        info!(
            rules_run = stats.rules_run,
            references = stats.references_added,
            undecoded = stats.undecoded,
            "Extracted references"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use chunkgraph_extract::decoded::{
        BehaviorRoutine, DrawGroup, DrawImage, EntryPoint, Instruction, ObjectDefinition,
    };
    use chunkgraph_extract::registry::deferred;
    use chunkgraph_extract::rules::behavior::BehaviorRule;
    use chunkgraph_extract::{DecodedChunk, ExtractionRule, Scope, SemanticCategory};

    use super::*;

    fn routine(calls: &[u16]) -> DecodedChunk {
        DecodedChunk::Behavior(BehaviorRoutine {
            instructions: calls.iter().map(|&op| Instruction::new(op)).collect(),
            ..BehaviorRoutine::default()
        })
    }

    fn bhav(group: u32, instance: u32) -> ResourceIdentifier {
        ResourceIdentifier::new(TypeCode::BHAV, group, instance)
    }

    fn build(source: &MemorySource, registry: &RuleRegistry) -> BuildOutput {
        let scopes = ScopeRanges::default();
        GraphBuilder::new(registry, &JsonDecoder, &scopes).build(source)
    }

    #[test]
    fn forward_references_resolve_across_containers() {
        // a.iff calls into b.iff's routine, and b.iff is read second.
        let source = MemorySource::new()
            .with_container(
                "a.iff",
                vec![RawChunk::from_decoded(TypeCode::BHAV, 7, 0x1000, &routine(&[0x1001]))],
            )
            .with_container(
                "b.iff",
                vec![RawChunk::from_decoded(TypeCode::BHAV, 7, 0x1001, &routine(&[]))],
            );
        let out = build(&source, &RuleRegistry::with_defaults());

        assert_eq!(out.stats.phantoms_created, 0);
        let target = out.graph.node(&bhav(7, 0x1001)).unwrap();
        assert!(!target.is_phantom);
        assert_eq!(target.file.as_deref(), Some(Path::new("b.iff")));
        assert_eq!(out.graph.who_references(&bhav(7, 0x1001)).len(), 1);
    }

    #[test]
    fn unresolved_targets_become_phantoms() {
        let objd = DecodedChunk::ObjectDefinition(ObjectDefinition {
            base_graphic_id: 100,
            entry_points: vec![EntryPoint {
                name: "main".into(),
                routine_id: 0x1000,
            }],
            ..ObjectDefinition::default()
        });
        let source = MemorySource::new().with_container(
            "chair.iff",
            vec![
                RawChunk::from_decoded(TypeCode::OBJD, 1, 128, &objd).with_label("chair"),
                RawChunk::from_decoded(
                    TypeCode::DGRP,
                    1,
                    100,
                    &DecodedChunk::DrawGroup(DrawGroup {
                        images: vec![DrawImage {
                            direction: 0,
                            zoom: 0,
                            sprite_ids: vec![200],
                        }],
                    }),
                ),
            ],
        );
        let out = build(&source, &RuleRegistry::with_defaults());

        // BHAV#4096 and SPR2#200 were never decoded.
        assert_eq!(out.stats.phantoms_created, 2);
        assert_eq!(out.stats.references_added, 3);
        let routine = out.graph.node(&bhav(1, 0x1000)).unwrap();
        assert!(routine.is_phantom);
        assert_eq!(routine.scope, Scope::ObjectLocal);
        let objd_node = out.graph.node(&ResourceIdentifier::new(TypeCode::OBJD, 1, 128)).unwrap();
        assert_eq!(objd_node.label.as_deref(), Some("chair"));
        assert!(out.graph.edges().iter().any(|e| e.is(SemanticCategory::Visual)));
    }

    #[test]
    fn missing_rule_is_skipped_and_recorded() {
        let mut registry = RuleRegistry::new();
        registry.register_deferred(TypeCode::BHAV, deferred::<BehaviorRule>());
        let source = MemorySource::new().with_container(
            "a.iff",
            vec![
                RawChunk::from_decoded(TypeCode::BHAV, 0, 0x1000, &routine(&[0x1001])),
                RawChunk::new(TypeCode::new(*b"XXXX"), 0, 1, b"{}".to_vec()),
                RawChunk::new(TypeCode::new(*b"XXXX"), 0, 2, b"{}".to_vec()),
            ],
        );
        let out = build(&source, &registry);
        assert_eq!(out.stats.chunks_indexed, 3);
        assert_eq!(out.stats.rules_run, 1);
        assert_eq!(out.stats.skipped_types.len(), 1);
        assert!(out.stats.skipped_types.contains(&TypeCode::new(*b"XXXX")));
    }

    #[test]
    fn undecoded_payloads_yield_no_references() {
        let source = MemorySource::new().with_container(
            "a.iff",
            vec![RawChunk::new(TypeCode::BHAV, 0, 0x1000, b"not json".to_vec())],
        );
        let out = build(&source, &RuleRegistry::with_defaults());
        assert_eq!(out.stats.undecoded, 1);
        assert_eq!(out.graph.edge_count(), 0);
        assert_eq!(out.graph.node_count(), 1);
    }

    #[test]
    fn duplicate_chunks_keep_first_container() {
        let source = MemorySource::new()
            .with_container(
                "a.iff",
                vec![RawChunk::from_decoded(TypeCode::BHAV, 0, 0x1000, &routine(&[]))],
            )
            .with_container(
                "b.iff",
                vec![RawChunk::from_decoded(TypeCode::BHAV, 0, 0x1000, &routine(&[0x1001]))],
            );
        let out = build(&source, &RuleRegistry::with_defaults());
        assert_eq!(out.stats.duplicate_chunks, 1);
        assert_eq!(out.graph.edge_count(), 0);
        assert_eq!(
            out.graph.node(&bhav(0, 0x1000)).unwrap().file.as_deref(),
            Some(Path::new("a.iff"))
        );
    }

    #[derive(Debug)]
    struct Failing;

    impl ChunkSource for Failing {
        fn entries(&self) -> Vec<PathBuf> {
            vec![PathBuf::from("gone.json")]
        }

        fn read(&self, entry: &Path) -> Result<Container, SourceError> {
            Err(SourceError::NotFound(entry.to_path_buf()))
        }
    }

    /// Keeps every message line for inspection.
    #[derive(Debug, Default)]
    struct Recording {
        lines: std::sync::Mutex<Vec<String>>,
    }

    impl ProgressReporter for Recording {
        fn start(&self, _phase: &str, _total: Option<u64>) {}
        fn advance(&self, _amount: u64) {}
        fn finish(&self) {}
        fn message(&self, msg: &str) {
            self.lines.lock().unwrap().push(msg.to_string());
        }
    }

    #[test]
    fn unreadable_entries_are_recorded_not_fatal() {
        let scopes = ScopeRanges::default();
        let registry = RuleRegistry::with_defaults();
        let progress = Recording::default();
        let out = GraphBuilder::new(&registry, &JsonDecoder, &scopes)
            .with_progress(&progress)
            .build(&Failing);
        assert_eq!(out.stats.files_failed(), 1);
        assert_eq!(out.stats.files_read, 0);
        assert_eq!(out.graph.node_count(), 0);
        assert_eq!(
            out.stats.summary().errors,
            vec!["gone.json: Input not found: gone.json".to_string()]
        );
        assert_eq!(
            *progress.lines.lock().unwrap(),
            vec!["skipped gone.json: Input not found: gone.json".to_string()]
        );
    }

    #[test]
    fn failed_rule_resolution_skips_type() {
        let mut registry = RuleRegistry::new();
        registry.register_deferred(
            TypeCode::BHAV,
            Box::new(|| Err::<Arc<dyn ExtractionRule>, _>("broken".to_string())),
        );
        let source = MemorySource::new().with_container(
            "a.iff",
            vec![RawChunk::from_decoded(TypeCode::BHAV, 0, 0x1000, &routine(&[0x1001]))],
        );
        let out = build(&source, &registry);
        assert_eq!(out.stats.rules_run, 0);
        assert_eq!(out.graph.edge_count(), 0);
    }
}
