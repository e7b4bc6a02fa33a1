use std::fmt::Write;

use anyhow::Context;
use clap::Args;

use chunkgraph_core::report::AnalysisReport;

use super::{Globals, InputArgs, ValidationFailed, print_json, show_id};

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Exit with code 10 when any error-severity issue is found
    #[arg(long)]
    pub fail_on_error: bool,
}

pub fn run(args: &ReportArgs, globals: &Globals) -> anyhow::Result<()> {
    let loaded = super::load(&args.input.inputs, globals)?;
    let report = AnalysisReport::generate(&loaded.output.graph, &loaded.config)
        .context("Invalid validation config")?
        .with_build(loaded.output.stats.summary());

    if args.input.json() {
        print_json(&report)?;
    } else {
        print!("{}", render_text(&report));
    }

    if args.fail_on_error && report.has_errors() {
        return Err(ValidationFailed {
            errors: report.severity_counts.error,
        }
        .into());
    }
    Ok(())
}

fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let s = &report.stats;
    let _ = writeln!(
        out,
        "chunkgraph report ({})",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(build) = &report.build {
        let _ = writeln!(
            out,
            "  Files:      {} read, {} failed ({} ms)",
            build.files_read, build.files_failed, build.duration_ms
        );
    }
    let _ = writeln!(
        out,
        "  Graph:      {} nodes ({} phantom), {} edges",
        s.node_count, s.phantom_count, s.edge_count
    );
    let _ = writeln!(
        out,
        "  Issues:     {} error, {} warning, {} info, {} suggestion",
        report.severity_counts.error,
        report.severity_counts.warning,
        report.severity_counts.info,
        report.severity_counts.suggestion
    );
    let _ = writeln!(out, "  Cycles:     {}", report.cycles.len());
    let _ = writeln!(out, "  Dead code:  {}", report.dead_code.len());
    let _ = writeln!(out, "  Orphans:    {}", report.orphans.len());

    if !report.issues.is_empty() {
        let _ = writeln!(out, "\nIssues:");
        for issue in &report.issues {
            let _ = writeln!(
                out,
                "  {:<10} {:<28} {} -> {}: {}",
                issue.severity.as_str(),
                issue.category,
                show_id(issue.source.as_ref()),
                show_id(issue.target.as_ref()),
                issue.message
            );
        }
    }

    if !report.cycles.is_empty() {
        let _ = writeln!(out, "\nCycles:");
        for cycle in &report.cycles {
            let members: Vec<String> = cycle.members.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "  [{}] {}", cycle.class.as_str(), members.join(", "));
        }
    }

    if !report.dead_code.is_empty() {
        let _ = writeln!(out, "\nDead code:");
        for item in &report.dead_code {
            let _ = writeln!(out, "  {:<12} {}", item.id.to_string(), item.reason);
        }
    }

    if !report.orphans.is_empty() {
        let _ = writeln!(out, "\nOrphans:");
        for orphan in &report.orphans {
            let _ = writeln!(out, "  {:<12} {}", orphan.id.to_string(), orphan.remediation);
        }
    }
    out
}
