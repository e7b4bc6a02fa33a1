use anyhow::Context;
use clap::Args;
use serde_json::json;

use chunkgraph_core::analyze::{CycleAnalyzer, Validator};
use chunkgraph_core::report::SeverityCounts;

use super::{Globals, InputArgs, ValidationFailed, print_json, show_id};

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct CyclesArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Only list cycles made of behavioral (call) edges
    #[arg(long)]
    pub behavioral: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Run only these passes (repeatable); defaults to the configured set
    #[arg(long = "pass")]
    pub passes: Vec<String>,

    /// Exit with code 10 when any error-severity issue is found
    #[arg(long)]
    pub fail_on_error: bool,
}

// ── Stats ────────────────────────────────────────────────────────────

pub fn run_stats(args: &StatsArgs, globals: &Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.input.inputs, globals)?;
    let graph = &loaded.output.graph;
    let stats = graph.statistics();
    let build = loaded.output.stats.summary();

    if args.input.json() {
        return print_json(&json!({ "build": build, "graph": stats }));
    }

    println!("Build:");
    println!("  Files read:        {}", build.files_read);
    println!("  Files failed:      {}", build.files_failed);
    println!("  Chunks indexed:    {}", build.chunks_indexed);
    println!("  Duplicates:        {}", build.duplicate_chunks);
    println!("  Undecoded:         {}", build.undecoded);
    println!("  References added:  {}", build.references_added);
    if !build.skipped_types.is_empty() {
        let skipped: Vec<String> = build.skipped_types.iter().map(ToString::to_string).collect();
        println!("  No rule for:       {}", skipped.join(", "));
    }
    println!("Graph:");
    println!("  Nodes:             {}", stats.node_count);
    println!("  Edges:             {}", stats.edge_count);
    println!("  Phantoms:          {}", stats.phantom_count);
    println!("  Orphans:           {}", stats.orphan_count);
    println!("  Files:             {}", stats.file_count);
    println!(
        "  Degree in/out:     mean {:.2}/{:.2}, max {}/{}",
        stats.mean_in_degree, stats.mean_out_degree, stats.max_in_degree, stats.max_out_degree
    );
    Ok(())
}

// ── Cycles ───────────────────────────────────────────────────────────

pub fn run_cycles(args: &CyclesArgs, globals: &Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.input.inputs, globals)?;
    let mut cycles = CycleAnalyzer::find_cycles(&loaded.output.graph);
    if args.behavioral {
        cycles.retain(chunkgraph_core::analyze::Cycle::is_behavioral);
    }

    if args.input.json() {
        return print_json(&cycles);
    }

    if cycles.is_empty() {
        println!("No cycles found.");
        return Ok(());
    }
    println!("{} cycle(s):", cycles.len());
    for cycle in &cycles {
        let members: Vec<String> = cycle.members.iter().map(ToString::to_string).collect();
        let categories: Vec<&str> = cycle.categories.iter().map(|c| c.as_str()).collect();
        println!(
            "  [{}] {} ({})",
            cycle.class.as_str(),
            members.join(", "),
            categories.join("+")
        );
    }
    Ok(())
}

// ── Validate ─────────────────────────────────────────────────────────

pub fn run_validate(args: &ValidateArgs, globals: &Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.input.inputs, globals)?;
    let passes: &[String] = if args.passes.is_empty() {
        &loaded.config.validation.passes
    } else {
        &args.passes
    };
    let validator = Validator::with_passes(passes).context("Invalid validation pass selection")?;
    let issues = validator.validate(&loaded.output.graph);
    let counts = SeverityCounts::tally(issues.iter().map(|i| &i.severity));

    if args.input.json() {
        print_json(&json!({ "severity_counts": counts, "issues": issues }))?;
    } else if issues.is_empty() {
        println!("No issues found ({} passes).", validator.pass_names().len());
    } else {
        for issue in &issues {
            println!(
                "{:<10} {:<28} {} -> {}: {}",
                issue.severity.as_str(),
                issue.category,
                show_id(issue.source.as_ref()),
                show_id(issue.target.as_ref()),
                issue.message
            );
            if let Some(suggestion) = &issue.suggestion {
                println!("           fix: {suggestion}");
            }
        }
        println!(
            "\n{} error, {} warning, {} info, {} suggestion",
            counts.error, counts.warning, counts.info, counts.suggestion
        );
    }

    if args.fail_on_error && counts.error > 0 {
        return Err(ValidationFailed { errors: counts.error }.into());
    }
    Ok(())
}
