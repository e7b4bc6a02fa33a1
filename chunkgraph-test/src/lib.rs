// Content fixtures and pipeline helpers shared by the integration tests.

use std::path::{Path, PathBuf};

use chunkgraph_core::build::{
    BuildOutput, ChunkSource, ContainerDump, DumpChunk, DumpSource, GraphBuilder, JsonDecoder,
    MemorySource, RawChunk,
};
use chunkgraph_core::config::ChunkgraphConfig;
use chunkgraph_core::report::AnalysisReport;
use chunkgraph_extract::decoded::{
    BehaviorRoutine, ConstantsTable, DrawGroup, DrawImage, EntryPoint, Instruction,
    InteractionEntry,
    InteractionTable, ObjectDefinition, Sprite, StringTable,
};
use chunkgraph_extract::rules::behavior::{EXPRESSION_OPCODE, TUNING_OWNER};
use chunkgraph_extract::{DecodedChunk, RuleRegistry, TypeCode};

/// Group id of the object container in every fixture.
pub const OBJECT_GROUP: u32 = 7;

pub const CHAIR_PATH: &str = "objects/chair.iff";
pub const LIBRARY_PATH: &str = "shared/library.iff";
pub const GLOBAL_PATH: &str = "global/global.iff";

/// Which defects to plant in the object container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Defects {
    /// Omit the shared-library import marker.
    pub no_import_marker: bool,
    /// Read tuning table 1, which is never defined.
    pub missing_tuning: bool,
    /// Add a routine that calls out but is never called.
    pub dead_routine: bool,
}

fn chunk(code: TypeCode, group: u32, instance: u32, decoded: &DecodedChunk) -> RawChunk {
    RawChunk::from_decoded(code, group, instance, decoded)
}

fn routine(group: u32, instance: u32, instructions: Vec<Instruction>) -> RawChunk {
    chunk(
        TypeCode::BHAV,
        group,
        instance,
        &DecodedChunk::Behavior(BehaviorRoutine {
            arg_count: 0,
            local_count: 0,
            instructions,
        }),
    )
}

/// Expression operand reading constant `index` of tuning table `table` on the left side.
pub fn tuning_read(table: u16, index: u16) -> Instruction {
    let data = (table << 7) | (index & 0x7F);
    let mut operand = Vec::with_capacity(8);
    operand.extend_from_slice(&data.to_le_bytes());
    operand.extend_from_slice(&0u16.to_le_bytes());
    operand.extend_from_slice(&[0, 0, TUNING_OWNER, 0]);
    Instruction::new(EXPRESSION_OPCODE).with_operand(operand)
}

/// A chair object: definition, interaction table with menu strings, a main
/// routine calling the shared library and a global routine, a mutually
/// recursive action pair, graphics, and a local tuning table.
pub fn chair_chunks(defects: Defects) -> Vec<RawChunk> {
    let g = OBJECT_GROUP;
    let objd = ObjectDefinition {
        guid: 0x0C0F_FEE0,
        base_graphic_id: 100,
        tree_table_id: 128,
        body_strings_id: 300,
        entry_points: vec![EntryPoint {
            name: "main".into(),
            routine_id: 0x1000,
        }],
        ..ObjectDefinition::default()
    };
    let ttab = InteractionTable {
        entries: vec![InteractionEntry {
            guard_routine: 0x1001,
            action_routine: 0x1002,
            string_index: 0,
        }],
    };
    let tuning_table = u16::from(defects.missing_tuning);

    let mut chunks = vec![
        chunk(TypeCode::OBJD, g, 128, &DecodedChunk::ObjectDefinition(objd)).with_label("chair"),
        chunk(TypeCode::TTAB, g, 128, &DecodedChunk::InteractionTable(ttab)),
        chunk(
            TypeCode::TTAS,
            g,
            128,
            &DecodedChunk::Strings(StringTable {
                entries: vec!["Sit".into()],
            }),
        ),
        chunk(
            TypeCode::STR,
            g,
            300,
            &DecodedChunk::Strings(StringTable {
                entries: vec!["A chair.".into()],
            }),
        ),
        routine(
            g,
            0x1000,
            vec![
                Instruction::new(0x2001),
                Instruction::new(0x0150),
                tuning_read(tuning_table, 2),
            ],
        )
        .with_label("main"),
        routine(g, 0x1001, vec![tuning_read(0, 0)]).with_label("guard: sit"),
        routine(g, 0x1002, vec![Instruction::new(0x1003)]).with_label("action: sit"),
        routine(g, 0x1003, vec![Instruction::new(0x1002)]).with_label("settle"),
        chunk(
            TypeCode::BCON,
            g,
            0x1000,
            &DecodedChunk::Constants(ConstantsTable { values: vec![5, 10, 20] }),
        ),
        chunk(
            TypeCode::DGRP,
            g,
            100,
            &DecodedChunk::DrawGroup(DrawGroup {
                images: vec![DrawImage {
                    direction: 0,
                    zoom: 0,
                    sprite_ids: vec![200],
                }],
            }),
        ),
        chunk(
            TypeCode::SPR2,
            g,
            200,
            &DecodedChunk::Sprite(Sprite {
                palette_id: 0,
                frame_count: 1,
            }),
        ),
    ];
    if !defects.no_import_marker {
        chunks.push(chunk(TypeCode::GLOB, g, 1, &DecodedChunk::Opaque));
    }
    if defects.dead_routine {
        chunks.push(routine(g, 0x1005, vec![Instruction::new(0x1001)]).with_label("unused"));
    }
    chunks
}

/// Shared library: two routines, the first calling the second.
pub fn library_chunks(group: u32) -> Vec<RawChunk> {
    vec![
        routine(group, 0x2001, vec![Instruction::new(0x2002)]).with_label("lib: wander"),
        routine(group, 0x2002, Vec::new()).with_label("lib: idle"),
    ]
}

/// Global container with one routine.
pub fn global_chunks(global_group: u32) -> Vec<RawChunk> {
    vec![routine(global_group, 0x0150, Vec::new()).with_label("global: notify")]
}

/// Chair, library, and global containers in memory, in the given order.
pub fn content_source(defects: Defects, order: &[&str]) -> MemorySource {
    let config = ChunkgraphConfig::default();
    let mut source = MemorySource::new();
    for &path in order {
        let chunks = match path {
            CHAIR_PATH => chair_chunks(defects),
            LIBRARY_PATH => library_chunks(config.scope.shared_group),
            GLOBAL_PATH => global_chunks(config.scope.global_group),
            _ => continue,
        };
        source.push(path, chunks);
    }
    source
}

/// Build with the default registry, decoder, and scope ranges.
pub fn build(source: &dyn ChunkSource) -> BuildOutput {
    let config = ChunkgraphConfig::default();
    let registry = RuleRegistry::with_defaults();
    GraphBuilder::new(&registry, &JsonDecoder, &config.scope).build(source)
}

/// Build and run every analysis with the default configuration.
pub fn run_pipeline(source: &dyn ChunkSource) -> (BuildOutput, AnalysisReport) {
    let output = build(source);
    let report = AnalysisReport::generate(&output.graph, &ChunkgraphConfig::default())
        .expect("default config is valid")
        .with_build(output.stats.summary());
    (output, report)
}

// ── On-disk dumps ─────────────────────────────────────────────────────

/// A temporary directory of container dump files.
#[derive(Debug)]
pub struct DumpDir {
    pub dir: tempfile::TempDir,
}

impl DumpDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// All three containers written as JSON dumps.
    pub fn full(defects: Defects) -> Self {
        let config = ChunkgraphConfig::default();
        let dir = tempfile::tempdir().expect("create tempdir");
        write_dump(dir.path(), "chair.json", CHAIR_PATH, chair_chunks(defects));
        write_dump(
            dir.path(),
            "library.json",
            LIBRARY_PATH,
            library_chunks(config.scope.shared_group),
        );
        std::fs::create_dir_all(dir.path().join("global")).expect("create subdir");
        write_dump(
            dir.path(),
            "global/global.json",
            GLOBAL_PATH,
            global_chunks(config.scope.global_group),
        );
        Self { dir }
    }

    /// Discover and read the dumps with the default input patterns.
    pub fn source(&self) -> DumpSource {
        DumpSource::discover(&[self.path().to_path_buf()], &ChunkgraphConfig::default().input)
            .expect("discover dumps")
    }
}

/// Write `chunks` as a dump file named `file` under `dir`.
pub fn write_dump(dir: &Path, file: &str, container: &str, chunks: Vec<RawChunk>) -> PathBuf {
    let dump = ContainerDump {
        path: PathBuf::from(container),
        chunks: chunks.into_iter().map(to_dump_chunk).collect(),
    };
    let path = dir.join(file);
    let text = serde_json::to_string_pretty(&dump).expect("serialize dump");
    std::fs::write(&path, text).expect("write dump");
    path
}

fn to_dump_chunk(raw: RawChunk) -> DumpChunk {
    let decoded = serde_json::from_slice(&raw.payload).ok();
    DumpChunk {
        type_code: raw.type_code,
        instance: raw.instance,
        group: raw.group,
        label: raw.label,
        size: Some(raw.size),
        decoded,
    }
}
