use std::path::PathBuf;

/// Top-level chunkgraph error type.
///
/// Graph queries and analyses never fail; errors only arise at the edges:
/// loading configuration, reading chunk sources, and validating the rule
/// registry before a build.
#[derive(thiserror::Error, Debug)]
pub enum ChunkgraphError {
    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error reading or parsing a chunk source.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Error from the extraction engine (registry validation, identifiers).
    #[error("Extraction error: {0}")]
    Extract(#[from] chunkgraph_extract::ExtractError),
}

/// Errors in chunkgraph configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors from chunk sources (container enumeration and dump parsing).
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// Filesystem I/O failed for a container or dump file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dump file is not valid JSON or does not match the dump layout.
    #[error("Malformed dump {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An input path does not exist.
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    /// A configured glob pattern is invalid.
    #[error("Invalid input pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}

/// Convenience alias for `Result<T, ChunkgraphError>`.
pub type Result<T> = std::result::Result<T, ChunkgraphError>;
