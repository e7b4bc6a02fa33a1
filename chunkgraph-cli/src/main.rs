use std::path::PathBuf;

use chunkgraph_core::error::{ConfigError, SourceError};
use chunkgraph_extract::ExtractError;
use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "chunkgraph",
    version,
    about = "Dependency graph and static analysis for game content containers"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Config file (default: ./chunkgraph.toml when present)
    #[arg(long, global = true, env = "CHUNKGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map an error chain to a process exit code.
///
/// Exit codes:
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: input not found
///   4: extraction rule registry incomplete
///   10: validation found errors and `--fail-on-error` was set
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<commands::ValidationFailed>().is_some() {
            return 10;
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
        if let Some(SourceError::NotFound(_)) = cause.downcast_ref::<SourceError>() {
            return 3;
        }
        if let Some(e) = cause.downcast_ref::<ExtractError>() {
            match e {
                ExtractError::MissingRules(_) | ExtractError::RuleUnavailable { .. } => return 4,
                ExtractError::InvalidScopeRanges(_) => return 2,
                _ => {}
            }
        }
    }
    1
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let globals = commands::Globals {
        config: cli.config,
        quiet: cli.quiet,
    };

    match commands::run(cli.command, &globals) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
