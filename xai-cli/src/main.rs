//! xai CLI — aggregate recorded model explanations from the terminal.
//!
//! Reads explanation records as JSON Lines and prints ranked feature
//! statistics, either over all records or per confusion-matrix cell.

mod commands;
mod input;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use xai_core::StatsType;

/// xai: summarize model-agnostic explanations
#[derive(Parser, Debug)]
#[command(name = "xai", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for `.xai/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Aggregate explanation records into per-class feature statistics
    Aggregate {
        /// JSON Lines file, one explanation record per line ("-" for stdin)
        input: PathBuf,
        /// Statistic: top_k, average_score or average_ranking
        #[arg(short, long)]
        stats: Option<StatsType>,
        /// Number of features reported per class
        #[arg(short)]
        k: Option<usize>,
        /// Minimum per-class confidence (defaults to interpret.confidence_threshold)
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Group explanations of misclassified samples by confusion-matrix cell
    Errors {
        /// JSON Lines file of {"ground_truth": ..., "explanation": ...} ("-" for stdin)
        input: PathBuf,
        /// Statistic: top_k, average_score or average_ranking
        #[arg(short, long)]
        stats: Option<StatsType>,
        /// Number of features reported per class
        #[arg(short)]
        k: Option<usize>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr; RUST_LOG wins over -v when set
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "xai", "xai")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "xai.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}
