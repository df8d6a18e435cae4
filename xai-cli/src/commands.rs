//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::input::{self, JsonLines, LabelledExplanation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::Path;
use xai_core::{
    ClassLabel, ClassStatistics, ConfusionAnalysis, ExplanationAggregator, ExplanationRecord,
    Operation, ProgressObserver, ProgressTicker, StatsType, TracingProgress, XaiConfig,
    load_config,
};

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Aggregate {
            input,
            stats,
            k,
            threshold,
        } => {
            let config = load(workspace, config_path)?;
            let options = QueryOptions::resolve(&config, stats, k);
            let threshold = threshold.unwrap_or(config.interpret.confidence_threshold);
            let report = aggregate(input::open(&input)?, &options, threshold)?;
            print_json(&report)
        }
        Commands::Errors { input, stats, k } => {
            let config = load(workspace, config_path)?;
            let options = QueryOptions::resolve(&config, stats, k);
            let report =
                error_analysis(input::open(&input)?, &options, &config, &TracingProgress)?;
            print_json(&report)
        }
        Commands::Config { action } => handle_config(action, workspace, config_path),
    }
}

fn load(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<XaiConfig> {
    let config = load_config(Some(workspace), config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config.validate()?;
    Ok(config)
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".xai");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&XaiConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_path)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Statistic and `k` after applying config defaults.
#[derive(Debug, Clone, Copy)]
struct QueryOptions {
    stats_type: StatsType,
    k: usize,
}

impl QueryOptions {
    fn resolve(config: &XaiConfig, stats: Option<StatsType>, k: Option<usize>) -> Self {
        Self {
            stats_type: stats.unwrap_or(config.stats_type),
            k: k.unwrap_or(config.k),
        }
    }
}

#[derive(Debug, Serialize)]
struct AggregateReport {
    generated_at: DateTime<Utc>,
    stats_type: StatsType,
    k: usize,
    confidence_threshold: f64,
    records: u64,
    statistics: ClassStatistics,
}

fn aggregate<R: BufRead>(
    reader: R,
    options: &QueryOptions,
    threshold: f64,
) -> anyhow::Result<AggregateReport> {
    let mut aggregator = ExplanationAggregator::new(threshold)?;
    for (idx, record) in JsonLines::<_, ExplanationRecord>::new(reader).enumerate() {
        let record = record?;
        if record.is_empty() {
            tracing::warn!(record = idx + 1, "Explanation record has no classes");
        }
        aggregator.feed(&record)?;
    }
    tracing::info!(
        records = aggregator.records_seen(),
        classes = aggregator.classes().count(),
        "Aggregated explanations"
    );

    Ok(AggregateReport {
        generated_at: Utc::now(),
        stats_type: options.stats_type,
        k: options.k,
        confidence_threshold: threshold,
        records: aggregator.records_seen(),
        statistics: aggregator.get_statistics(options.stats_type, options.k)?,
    })
}

#[derive(Debug, Serialize)]
struct CellReport {
    ground_truth: ClassLabel,
    predicted: ClassLabel,
    records: u64,
    statistics: ClassStatistics,
}

#[derive(Debug, Serialize)]
struct ErrorReport {
    generated_at: DateTime<Utc>,
    stats_type: StatsType,
    k: usize,
    observed: u64,
    misclassified: u64,
    cells: Vec<CellReport>,
}

fn error_analysis<R: BufRead>(
    reader: R,
    options: &QueryOptions,
    config: &XaiConfig,
    progress: &dyn ProgressObserver,
) -> anyhow::Result<ErrorReport> {
    let policy = &config.error_analysis;
    let mut analysis = ConfusionAnalysis::new(policy.confidence_threshold)?;
    let mut ticker = ProgressTicker::new(
        Operation::ErrorAnalysis,
        policy.progress_interval,
        None,
        progress,
    );
    for item in JsonLines::<_, LabelledExplanation>::new(reader) {
        let item = item?;
        analysis.observe(&item.ground_truth, &item.explanation)?;
        ticker.tick();
    }
    tracing::info!(
        observed = analysis.observed(),
        misclassified = analysis.misclassified(),
        cells = analysis.cells().count(),
        "Error analysis complete"
    );

    let mut statistics = analysis.get_statistics(options.stats_type, options.k)?;
    let cells = analysis
        .cells()
        .map(|(cell, aggregator)| CellReport {
            ground_truth: cell.ground_truth.clone(),
            predicted: cell.predicted.clone(),
            records: aggregator.records_seen(),
            statistics: statistics.remove(cell).unwrap_or_default(),
        })
        .collect();

    Ok(ErrorReport {
        generated_at: Utc::now(),
        stats_type: options.stats_type,
        k: options.k,
        observed: analysis.observed(),
        misclassified: analysis.misclassified(),
        cells,
    })
}
