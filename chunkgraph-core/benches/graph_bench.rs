// Benchmark graph construction, cycle detection, and blast radius on synthetic content.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use chunkgraph_core::analyze::CycleAnalyzer;
use chunkgraph_core::build::{GraphBuilder, JsonDecoder, MemorySource, RawChunk};
use chunkgraph_core::impact::BlastRadiusCalculator;
use chunkgraph_core::store::ResourceGraph;
use chunkgraph_extract::decoded::{BehaviorRoutine, Instruction};
use chunkgraph_extract::{DecodedChunk, ResourceIdentifier, RuleRegistry, ScopeRanges, TypeCode};

/// `files` containers of `per_file` routines each. Routine `i` calls
/// `(i * prime + 1) % per_file` for a few primes, so most files contain
/// call cycles.
fn synthetic_source(files: usize, per_file: u32) -> MemorySource {
    let mut source = MemorySource::new();
    let primes = [7u32, 13, 31];
    for f in 0..files {
        let group = u32::try_from(f).unwrap_or(0);
        let chunks = (0..per_file)
            .map(|i| {
                let instructions = primes
                    .iter()
                    .map(|p| {
                        let target = 0x1000 + (i * p + 1) % per_file;
                        Instruction::new(u16::try_from(target).unwrap_or(0x1000))
                    })
                    .collect();
                let routine = DecodedChunk::Behavior(BehaviorRoutine {
                    instructions,
                    ..BehaviorRoutine::default()
                });
                RawChunk::from_decoded(TypeCode::BHAV, group, 0x1000 + i, &routine)
            })
            .collect();
        source.push(format!("object_{f}.iff"), chunks);
    }
    source
}

fn built_graph(files: usize, per_file: u32) -> ResourceGraph {
    let registry = RuleRegistry::with_defaults();
    let scopes = ScopeRanges::default();
    GraphBuilder::new(&registry, &JsonDecoder, &scopes)
        .build(&synthetic_source(files, per_file))
        .graph
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let registry = RuleRegistry::with_defaults();
    let scopes = ScopeRanges::default();

    for files in [10, 100] {
        let source = synthetic_source(files, 200);
        group.bench_with_input(BenchmarkId::new("files", files), &source, |b, s| {
            b.iter(|| GraphBuilder::new(&registry, &JsonDecoder, &scopes).build(s));
        });
    }
    group.finish();
}

fn bench_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("tarjan");
    for files in [10, 100] {
        let graph = built_graph(files, 200);
        group.bench_with_input(BenchmarkId::new("nodes", graph.node_count()), &graph, |b, g| {
            b.iter(|| CycleAnalyzer::find_cycles(g));
        });
    }
    group.finish();
}

fn bench_blast_radius(c: &mut Criterion) {
    let graph = built_graph(20, 500);
    let calculator = BlastRadiusCalculator::new(&graph);
    let target = ResourceIdentifier::new(TypeCode::BHAV, 0, 0x1001);

    let mut group = c.benchmark_group("blast_radius");
    for depth in [1, 3, 6] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &d| {
            b.iter(|| calculator.compute(&target, d));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_cycles, bench_blast_radius);
criterion_main!(benches);
