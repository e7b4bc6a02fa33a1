pub mod export;
pub mod impact;
pub mod inspect;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};

use chunkgraph_core::build::{BuildOutput, DumpSource, GraphBuilder, JsonDecoder};
use chunkgraph_core::config::{CONFIG_FILE_NAME, ChunkgraphConfig};
use chunkgraph_core::error::SourceError;
use chunkgraph_core::progress::IndicatifReporter;
use chunkgraph_extract::RuleRegistry;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every analysis and print a combined report
    Report(report::ReportArgs),
    /// Show build and graph statistics
    Stats(inspect::StatsArgs),
    /// List dependency cycles
    Cycles(inspect::CyclesArgs),
    /// Run consistency checks
    Validate(inspect::ValidateArgs),
    /// List unreachable routines, empty stubs, and orphaned tables
    DeadCode(impact::DeadCodeArgs),
    /// Show what a change to one resource can affect
    BlastRadius(impact::BlastRadiusArgs),
    /// List resources with no referrers, optionally with fixes
    Orphans(impact::OrphansArgs),
    /// Export the graph as JSON or Graphviz DOT
    Export(export::ExportArgs),
}

/// Options shared by every subcommand, parsed at the top level.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub config: Option<PathBuf>,
    pub quiet: bool,
}

/// Input paths and output format, flattened into each subcommand.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Container dump files or directories of them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format: text, json
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

impl InputArgs {
    pub fn json(&self) -> bool {
        self.format == "json"
    }
}

/// Returned when `--fail-on-error` is set and error-severity issues exist.
#[derive(Debug)]
pub struct ValidationFailed {
    pub errors: usize,
}

impl std::fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation found {} error-severity issue(s)", self.errors)
    }
}

impl std::error::Error for ValidationFailed {}

pub fn run(cmd: Command, globals: &Globals) -> anyhow::Result<()> {
    match cmd {
        Command::Report(args) => report::run(&args, globals),
        Command::Stats(args) => inspect::run_stats(&args, globals),
        Command::Cycles(args) => inspect::run_cycles(&args, globals),
        Command::Validate(args) => inspect::run_validate(&args, globals),
        Command::DeadCode(args) => impact::run_dead_code(&args, globals),
        Command::BlastRadius(args) => impact::run_blast_radius(&args, globals),
        Command::Orphans(args) => impact::run_orphans(&args, globals),
        Command::Export(args) => export::run(&args, globals),
    }
}

// ── Shared loading ───────────────────────────────────────────────────

/// Configuration plus the graph built from the inputs.
#[derive(Debug)]
pub struct Loaded {
    pub config: ChunkgraphConfig,
    pub output: BuildOutput,
}

pub fn load_config(globals: &Globals) -> anyhow::Result<ChunkgraphConfig> {
    match &globals.config {
        Some(path) => ChunkgraphConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display())),
        None => ChunkgraphConfig::load_or_default(Some(Path::new(CONFIG_FILE_NAME)))
            .context("Cannot load config from working directory"),
    }
}

/// Load config, check the rule registry, discover inputs, and build the graph.
pub fn load(inputs: &[PathBuf], globals: &Globals) -> anyhow::Result<Loaded> {
    let config = load_config(globals)?;

    let registry = RuleRegistry::with_defaults();
    registry
        .validate(&config.registry.required_types)
        .context("Extraction rule registry is incomplete")?;

    let source = DumpSource::discover(inputs, &config.input).context("Cannot collect inputs")?;
    if source.files().is_empty() {
        let first = inputs.first().cloned().unwrap_or_default();
        return Err(SourceError::NotFound(first))
            .context("No dump files matched the include patterns");
    }

    let reporter = if globals.quiet {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::stderr()
    };
    let output = GraphBuilder::new(&registry, &JsonDecoder, &config.scope)
        .with_progress(&reporter)
        .build(&source);

    for (path, err) in &output.stats.errors {
        tracing::warn!(path = %path.display(), error = %err, "Skipped unreadable dump");
    }
    tracing::info!(
        files = output.stats.files_read,
        nodes = output.graph.node_count(),
        edges = output.graph.edge_count(),
        "Graph built"
    );

    Ok(Loaded { config, output })
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render an optional identifier for text output.
pub fn show_id(id: Option<&chunkgraph_extract::ResourceIdentifier>) -> String {
    id.map_or_else(|| "-".to_string(), ToString::to_string)
}
