use anyhow::Context;
use clap::Args;
use serde_json::json;

use chunkgraph_core::impact::{BlastRadiusCalculator, DeadCodeFinder, OrphanExplainer};
use chunkgraph_extract::ResourceIdentifier;

use super::{Globals, InputArgs, print_json};

#[derive(Args, Debug)]
pub struct DeadCodeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct BlastRadiusArgs {
    /// Resource to analyze, e.g. `BHAV#4097` or `BHAV#0x1001@0x7`
    pub id: String,

    /// Maximum caller depth (default: analysis.blast_radius_depth)
    #[arg(long)]
    pub depth: Option<usize>,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct OrphansArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Explain each orphan: expected referrers, examples, and a fix
    #[arg(long)]
    pub explain: bool,
}

pub fn run_dead_code(args: &DeadCodeArgs, globals: &Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.input.inputs, globals)?;
    let items = DeadCodeFinder::find(&loaded.output.graph);

    if args.input.json() {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No dead code found.");
        return Ok(());
    }
    for item in &items {
        let file = item
            .file
            .as_deref()
            .map_or_else(String::new, |f| format!(" [{}]", f.display()));
        println!(
            "{:<8} {:<12} {}{file}",
            item.severity.as_str(),
            item.id.to_string(),
            item.reason
        );
    }
    println!("\n{} item(s)", items.len());
    Ok(())
}

pub fn run_blast_radius(args: &BlastRadiusArgs, globals: &Globals) -> anyhow::Result<()> {
    let target: ResourceIdentifier = args
        .id
        .parse()
        .with_context(|| format!("Cannot parse resource id: {}", args.id))?;
    let loaded = super::load(&args.input.inputs, globals)?;
    let graph = &loaded.output.graph;
    if !graph.contains(&target) {
        tracing::warn!(%target, "Resource is not in the graph");
    }

    let depth = args.depth.unwrap_or(loaded.config.analysis.blast_radius_depth);
    let radius = BlastRadiusCalculator::new(graph).compute(&target, depth);

    if args.input.json() {
        return print_json(&radius);
    }

    println!(
        "Blast radius of {} (depth {}): {} affected",
        radius.target,
        radius.max_depth,
        radius.total_affected()
    );
    for (bucket, ids) in radius.as_category_map() {
        if ids.is_empty() {
            continue;
        }
        println!("  {bucket}: {}", ids.join(", "));
    }
    for caller in &radius.indirect_callers {
        let path: Vec<String> = caller.path.iter().map(ToString::to_string).collect();
        println!("    depth {}: {}", caller.depth, path.join(" -> "));
    }
    Ok(())
}

pub fn run_orphans(args: &OrphansArgs, globals: &Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.input.inputs, globals)?;
    let graph = &loaded.output.graph;
    let explainer =
        OrphanExplainer::new(graph).max_examples(loaded.config.analysis.max_sibling_examples);
    let explanations = explainer.explain_all();

    if !args.explain {
        if args.input.json() {
            let ids: Vec<String> = explanations.iter().map(|e| e.id.to_string()).collect();
            return print_json(&json!({ "orphans": ids }));
        }
        for explanation in &explanations {
            println!("{}", explanation.id);
        }
        return Ok(());
    }

    if args.input.json() {
        return print_json(&explanations);
    }
    for explanation in &explanations {
        println!("{}", explanation.id);
        if !explanation.expected_referrers.is_empty() {
            let expected: Vec<String> = explanation
                .expected_referrers
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("  expected referrers: {}", expected.join(", "));
        }
        for example in &explanation.sibling_examples {
            println!(
                "  e.g. {} is referenced by {} at {}",
                example.id, example.referenced_by, example.locus
            );
        }
        println!("  fix: {}", explanation.remediation);
    }
    Ok(())
}
