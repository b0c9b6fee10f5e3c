use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use seekgrep::{
    search_with_cancel, MatchMode, SearchConfig, WalkErrorPolicy, WriterReporter,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Parallel file-content search reporting byte offsets
#[derive(Parser)]
#[command(name = "seekgrep", version, about)]
struct Cli {
    /// Pattern to search for (a regular expression unless -F is given)
    pattern: String,

    /// Files or directories to search (default: current directory)
    paths: Vec<PathBuf>,

    /// Treat the pattern as a literal substring
    #[arg(short = 'F', long)]
    literal: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Number of files to scan in parallel (default: CPU count)
    #[arg(short = 'p', long = "parallel")]
    parallel: Option<NonZeroUsize>,

    /// Bytes read per chunk per file
    #[arg(short = 'b', long = "buffer-size")]
    buffer_size: Option<NonZeroUsize>,

    /// Stop reading a file after this many bytes
    #[arg(short = 'l', long = "max-file-bytes")]
    max_file_bytes: Option<u64>,

    /// Glob patterns to exclude, e.g. -x '*.md' -x .git
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// What to do when a directory cannot be listed
    #[arg(long = "on-walk-error", value_parser = ["skip", "abort"])]
    on_walk_error: Option<String>,

    /// Explicit config file (default: .seekgrep.yaml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose diagnostics: skipped binary files, per-file errors
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let defaults = SearchConfig::default();
    let cli_config = SearchConfig {
        pattern: cli.pattern,
        mode: if cli.literal {
            MatchMode::Literal
        } else {
            MatchMode::Regex
        },
        roots: if cli.paths.is_empty() {
            defaults.roots
        } else {
            cli.paths
        },
        recursive: cli.recursive,
        threads: cli.parallel.unwrap_or(defaults.threads),
        buffer_size: cli.buffer_size.unwrap_or(defaults.buffer_size),
        max_file_bytes: cli.max_file_bytes,
        exclude: cli.exclude,
        walk_errors: match cli.on_walk_error.as_deref() {
            Some("abort") => WalkErrorPolicy::Abort,
            _ => WalkErrorPolicy::Skip,
        },
    };

    let config = SearchConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(cli_config);
    tracing::debug!(?config, "resolved configuration");

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("failed to install interrupt handler")?;
    }

    let reporter = WriterReporter::new(std::io::stdout());
    let summary = search_with_cancel(&config, &reporter, &cancel)?;

    if summary.has_errors() {
        let failed = summary.walk_errors.len() + summary.file_errors.len();
        eprintln!(
            "{} {failed} path(s) could not be searched",
            "warning:".yellow().bold()
        );
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
