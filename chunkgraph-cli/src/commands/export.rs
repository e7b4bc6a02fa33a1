use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use chunkgraph_core::export;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Container dump files or directories of them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format: json, dot
    #[arg(long, default_value = "json", value_parser = ["json", "dot"])]
    pub format: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ExportArgs, globals: &super::Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.inputs, globals)?;
    let graph = &loaded.output.graph;

    let rendered = match args.format.as_str() {
        "dot" => export::to_dot(graph),
        _ => export::to_json(graph).context("Cannot serialize graph")?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered.as_bytes())
                .with_context(|| format!("Cannot write export: {}", path.display()))?;
            tracing::info!(path = %path.display(), format = %args.format, "Graph exported");
        }
        None if rendered.ends_with('\n') => print!("{rendered}"),
        None => println!("{rendered}"),
    }
    Ok(())
}
