// Chunk sources and decoders: the builder's two collaborator seams, plus the
// in-memory and JSON-dump implementations.

use std::path::{Path, PathBuf};

use chunkgraph_extract::{DecodedChunk, ResourceIdentifier, TypeCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InputSection;
use crate::error::SourceError;

/// One undecoded chunk as stored in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub type_code: TypeCode,
    pub group: u32,
    pub instance: u32,
    pub label: Option<String>,
    pub payload: Vec<u8>,
    /// Size as recorded by the container; defaults to the payload length.
    pub size: u64,
}

impl RawChunk {
    pub fn new(type_code: TypeCode, group: u32, instance: u32, payload: Vec<u8>) -> Self {
        let size = payload.len() as u64;
        Self {
            type_code,
            group,
            instance,
            label: None,
            payload,
            size,
        }
    }

    /// A chunk whose payload is the JSON form [`JsonDecoder`] reads back.
    pub fn from_decoded(
        type_code: TypeCode,
        group: u32,
        instance: u32,
        decoded: &DecodedChunk,
    ) -> Self {
        // Serializing a plain data enum into a Vec cannot fail.
        let payload = serde_json::to_vec(decoded).unwrap_or_default();
        Self::new(type_code, group, instance, payload)
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.type_code, self.group, self.instance)
    }
}

/// All chunks of one container file.
#[derive(Debug, Clone, Default)]
pub struct Container {
    /// Owning-file path recorded on every node from this container.
    pub path: PathBuf,
    pub chunks: Vec<RawChunk>,
}

/// Enumerates containers and reads their chunks.
pub trait ChunkSource {
    /// Entries to read, in processing order.
    fn entries(&self) -> Vec<PathBuf>;

    /// Read one entry. A failure skips that entry only.
    fn read(&self, entry: &Path) -> Result<Container, SourceError>;
}

/// Turns a raw payload into a typed chunk.
pub trait ChunkDecoder {
    /// `None` means undecoded, which extraction treats as "no references".
    fn decode(&self, chunk: &RawChunk) -> Option<DecodedChunk>;
}

/// Containers already held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    containers: Vec<Container>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_container(mut self, path: impl Into<PathBuf>, chunks: Vec<RawChunk>) -> Self {
        self.push(path, chunks);
        self
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, chunks: Vec<RawChunk>) {
        self.containers.push(Container {
            path: path.into(),
            chunks,
        });
    }
}

impl ChunkSource for MemorySource {
    fn entries(&self) -> Vec<PathBuf> {
        self.containers.iter().map(|c| c.path.clone()).collect()
    }

    fn read(&self, entry: &Path) -> Result<Container, SourceError> {
        self.containers
            .iter()
            .find(|c| c.path == entry)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(entry.to_path_buf()))
    }
}

/// Decodes payloads holding the JSON form of [`DecodedChunk`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ChunkDecoder for JsonDecoder {
    fn decode(&self, chunk: &RawChunk) -> Option<DecodedChunk> {
        if chunk.payload.is_empty() {
            return None;
        }
        match serde_json::from_slice(&chunk.payload) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(id = %chunk.id(), error = %e, "Payload did not decode");
                None
            }
        }
    }
}

// ── JSON dump files ───────────────────────────────────────────────────

/// On-disk dump of one container: its path and every chunk, with the
/// decoded form inline (or `null` when the exporter could not decode it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDump {
    pub path: PathBuf,
    #[serde(default)]
    pub chunks: Vec<DumpChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpChunk {
    pub type_code: TypeCode,
    pub instance: u32,
    #[serde(default)]
    pub group: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub decoded: Option<serde_json::Value>,
}

impl From<DumpChunk> for RawChunk {
    fn from(chunk: DumpChunk) -> Self {
        let payload = chunk
            .decoded
            .filter(|v| !v.is_null())
            .map(|v| v.to_string().into_bytes())
            .unwrap_or_default();
        let size = chunk.size.unwrap_or(payload.len() as u64);
        Self {
            type_code: chunk.type_code,
            group: chunk.group,
            instance: chunk.instance,
            label: chunk.label,
            payload,
            size,
        }
    }
}

impl ContainerDump {
    pub fn parse(text: &str, origin: &Path) -> Result<Self, SourceError> {
        serde_json::from_str(text).map_err(|source| SourceError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn into_container(self) -> Container {
        Container {
            path: self.path,
            chunks: self.chunks.into_iter().map(RawChunk::from).collect(),
        }
    }
}

/// Reads [`ContainerDump`] JSON files from disk.
#[derive(Debug, Clone, Default)]
pub struct DumpSource {
    files: Vec<PathBuf>,
}

impl DumpSource {
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Collect dump files from `inputs`: files are taken as-is, directories
    /// are scanned with the configured include/exclude patterns.
    pub fn discover(inputs: &[PathBuf], input: &InputSection) -> Result<Self, SourceError> {
        let excludes = compile_patterns(&input.exclude_patterns)?;
        let mut files = Vec::new();
        for path in inputs {
            if path.is_file() {
                files.push(path.clone());
            } else if path.is_dir() {
                files.extend(scan_dir(path, &input.include_patterns, &excludes)?);
            } else {
                return Err(SourceError::NotFound(path.clone()));
            }
        }
        files.sort();
        files.dedup();
        debug!(count = files.len(), "Discovered dump files");
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl ChunkSource for DumpSource {
    fn entries(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn read(&self, entry: &Path) -> Result<Container, SourceError> {
        let text = std::fs::read_to_string(entry).map_err(|source| SourceError::Io {
            path: entry.to_path_buf(),
            source,
        })?;
        Ok(ContainerDump::parse(&text, entry)?.into_container())
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>, SourceError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| SourceError::Pattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn scan_dir(
    root: &Path,
    includes: &[String],
    excludes: &[glob::Pattern],
) -> Result<Vec<PathBuf>, SourceError> {
    let mut matched = Vec::new();
    for pattern in includes {
        let full = root.join(pattern).to_string_lossy().to_string();
        let paths = glob::glob(&full).map_err(|e| SourceError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() && !is_excluded(&path, root, excludes) => {
                    matched.push(path);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Unreadable path during scan"),
            }
        }
    }
    Ok(matched)
}

fn is_excluded(path: &Path, root: &Path, excludes: &[glob::Pattern]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    excludes.iter().any(|p| p.matches_path(relative))
}

#[cfg(test)]
mod tests {
    use chunkgraph_extract::decoded::{Sprite, StringTable};

    use super::*;

    #[test]
    fn json_decoder_round_trips_and_tolerates_garbage() {
        let decoded = DecodedChunk::Sprite(Sprite {
            palette_id: 3,
            frame_count: 1,
        });
        let chunk = RawChunk::from_decoded(TypeCode::SPR2, 0, 200, &decoded);
        assert_eq!(JsonDecoder.decode(&chunk), Some(decoded));

        let garbage = RawChunk::new(TypeCode::SPR2, 0, 201, b"\x00\x01".to_vec());
        assert_eq!(JsonDecoder.decode(&garbage), None);
        let empty = RawChunk::new(TypeCode::SPR2, 0, 202, Vec::new());
        assert_eq!(JsonDecoder.decode(&empty), None);
    }

    #[test]
    fn dump_chunk_keeps_recorded_size() {
        let dump = ContainerDump::parse(
            r#"{
                "path": "objects/chair.iff",
                "chunks": [
                    { "type_code": "STR#", "instance": 301, "label": "body", "size": 512,
                      "decoded": { "kind": "strings", "entries": ["Sit"] } },
                    { "type_code": "BHAV", "instance": 4096, "decoded": null }
                ]
            }"#,
            Path::new("chair.json"),
        )
        .unwrap();
        let container = dump.into_container();
        assert_eq!(container.path, PathBuf::from("objects/chair.iff"));
        assert_eq!(container.chunks[0].size, 512);
        assert_eq!(container.chunks[0].label.as_deref(), Some("body"));
        assert_eq!(
            JsonDecoder.decode(&container.chunks[0]),
            Some(DecodedChunk::Strings(StringTable {
                entries: vec!["Sit".into()]
            }))
        );
        assert!(container.chunks[1].payload.is_empty());
        assert_eq!(JsonDecoder.decode(&container.chunks[1]), None);
    }

    #[test]
    fn malformed_dump_is_a_parse_error() {
        let err = ContainerDump::parse("{ \"chunks\": 3 }", Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn discover_scans_directories_with_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("nested/b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("chunkgraph.toml"), "").unwrap();

        let source =
            DumpSource::discover(&[dir.path().to_path_buf()], &InputSection::default()).unwrap();
        let names: Vec<_> = source
            .files()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.json"), PathBuf::from("nested/b.json")]);
    }

    #[test]
    fn discover_rejects_missing_input() {
        let err = DumpSource::discover(
            &[PathBuf::from("/no/such/dump.json")],
            &InputSection::default(),
        )
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn memory_source_reads_by_path() {
        let source = MemorySource::new()
            .with_container("a.iff", vec![RawChunk::new(TypeCode::GLOB, 0, 1, vec![])]);
        assert_eq!(source.entries(), vec![PathBuf::from("a.iff")]);
        assert_eq!(source.read(Path::new("a.iff")).unwrap().chunks.len(), 1);
        assert!(source.read(Path::new("b.iff")).is_err());
    }
}
