//! Housing CLI
//!
//! Command-line interface for the offline pipeline and the request log store.
//!
//! # Usage
//!
//! ```bash
//! housing --help
//! housing preprocess --input data/raw/housing.csv --output-dir data/processed
//! housing train
//! housing logs view --level error --limit 20
//! housing logs prune --days 30
//! ```

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use housing_shared::config::LogRetentionPolicy;
use housing_shared::models::LogLevel;
use housing_shared::pipeline::{
    preprocess, train_and_register, FileTracker, ModelRegistry, SplitConfig, TrainingConfig,
};
use housing_shared::storage::{LogQuery, LogStore, SqliteLogStore};
use std::io::Write;
use std::path::PathBuf;

/// Housing CLI - offline training pipeline and log store tools
#[derive(Parser)]
#[command(name = "housing")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the raw dataset into train/test files
    Preprocess(PreprocessArgs),
    /// Train candidate models, keep the best and register it
    Train(TrainArgs),
    /// Inspect or maintain the request log store
    Logs(LogsArgs),
}

#[derive(Args)]
struct TrackingArgs {
    /// Directory where tracked runs are stored
    #[arg(long, env = "HOUSING_TRACKING_DIR", default_value = "mlruns")]
    tracking_dir: PathBuf,
}

#[derive(Args)]
struct PreprocessArgs {
    /// Raw CSV dataset
    #[arg(short, long, default_value = "data/raw/housing.csv")]
    input: PathBuf,

    /// Directory for the split files
    #[arg(short, long, default_value = "data/processed")]
    output_dir: PathBuf,

    /// Target column
    #[arg(long, default_value = "median_house_value")]
    target: String,

    /// Non-feature columns to drop (repeatable)
    #[arg(long = "drop-column", default_value = "ocean_proximity")]
    drop_columns: Vec<String>,

    /// Fraction of rows in the test split
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Shuffle seed
    #[arg(long, default_value_t = 42)]
    random_state: u64,

    #[command(flatten)]
    tracking: TrackingArgs,
}

#[derive(Args)]
struct TrainArgs {
    /// Directory holding the split files
    #[arg(long, default_value = "data/processed")]
    processed_dir: PathBuf,

    /// Where the selected model artifact is written
    #[arg(long, env = "HOUSING_MODEL_PATH", default_value = "model/CaliforniaHousingModel.json")]
    artifact_path: PathBuf,

    /// Where each candidate artifact is written
    #[arg(long, default_value = "model/candidates")]
    candidates_dir: PathBuf,

    /// Registry name of the model
    #[arg(long, default_value = "CaliforniaHousingModel")]
    model_name: String,

    /// Depth limit of the decision tree candidate
    #[arg(long)]
    tree_max_depth: Option<usize>,

    /// Model registry file; defaults to `registry.json` in the tracking directory
    #[arg(long)]
    registry: Option<PathBuf>,

    #[command(flatten)]
    tracking: TrackingArgs,
}

#[derive(Args)]
struct LogsArgs {
    /// SQLite log store
    #[arg(long, env = "HOUSING_LOG_DB", default_value = "logs/logs.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: LogsCommand,
}

#[derive(Subcommand)]
enum LogsCommand {
    /// Print stored records, newest first
    View {
        /// Only show this level
        #[arg(short, long)]
        level: Option<LogLevel>,

        /// Maximum number of records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Records to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Delete every stored record
    Clear,
    /// Delete records older than a number of days
    Prune {
        /// Maximum record age in days
        #[arg(long)]
        days: u32,
    },
}

fn run_preprocess(args: PreprocessArgs, out: &mut impl Write) -> Result<()> {
    let config = SplitConfig {
        input_path: args.input,
        output_dir: args.output_dir,
        target: args.target,
        drop_columns: args.drop_columns,
        test_size: args.test_size,
        random_state: args.random_state,
    };
    let mut tracker = FileTracker::new(args.tracking.tracking_dir);

    let summary = preprocess(&config, &mut tracker).context("Preprocessing failed")?;

    writeln!(
        out,
        "Wrote {} train and {} test rows to {} (dropped {} incomplete rows, run {})",
        summary.train_rows,
        summary.test_rows,
        config.output_dir.display(),
        summary.dropped_rows,
        summary.run_id
    )?;
    Ok(())
}

fn run_train(args: TrainArgs, out: &mut impl Write) -> Result<()> {
    let registry_path = args
        .registry
        .unwrap_or_else(|| args.tracking.tracking_dir.join("registry.json"));
    let config = TrainingConfig {
        processed_dir: args.processed_dir,
        artifact_path: args.artifact_path,
        candidates_dir: args.candidates_dir,
        registered_model_name: args.model_name,
        tree_max_depth: args.tree_max_depth,
    };
    let mut tracker = FileTracker::new(args.tracking.tracking_dir);
    let registry = ModelRegistry::new(registry_path);

    let outcome =
        train_and_register(&config, &mut tracker, &registry).context("Training failed")?;

    for candidate in &outcome.candidates {
        writeln!(
            out,
            "{} - RMSE: {:.4}, MAE: {:.4}, R2: {:.4}",
            candidate.model_type(),
            candidate.metrics.rmse,
            candidate.metrics.mae,
            candidate.metrics.r2
        )?;
    }
    writeln!(out, "Best model: {}", outcome.best.model_type())?;
    writeln!(
        out,
        "Registered model '{}' version {} and moved to {}.",
        config.registered_model_name, outcome.version.version, outcome.version.stage
    )?;
    Ok(())
}

fn run_logs(args: LogsArgs, out: &mut impl Write) -> Result<()> {
    let store = SqliteLogStore::open(&args.db)
        .with_context(|| format!("Failed to open log store at {}", args.db.display()))?;
    tracing::debug!(db = %args.db.display(), "Opened log store");

    match args.command {
        LogsCommand::View {
            level,
            limit,
            offset,
            json,
        } => {
            let mut query = LogQuery::new().with_offset(offset);
            if let Some(level) = level {
                query = query.with_level(level);
            }
            if let Some(limit) = limit {
                query = query.with_limit(limit);
            }

            let records = store.query(query)?;
            if records.is_empty() {
                writeln!(out, "No logs found.")?;
            }
            for record in records {
                if json {
                    writeln!(out, "{}", serde_json::to_string(&record)?)?;
                } else {
                    writeln!(out, "{record}")?;
                }
            }
        }
        LogsCommand::Clear => {
            let count = store.count()?;
            store.clear()?;
            writeln!(out, "Deleted {count} log records.")?;
        }
        LogsCommand::Prune { days } => {
            let policy = LogRetentionPolicy::new(days);
            policy.validate().map_err(anyhow::Error::msg)?;
            let deleted = match policy.cutoff(Local::now()) {
                Some(cutoff) => store.delete_older_than(&cutoff)?,
                None => 0,
            };
            writeln!(out, "Deleted {deleted} log records older than {days} days.")?;
        }
    }
    Ok(())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::Preprocess(args) => run_preprocess(args, out),
        Commands::Train(args) => run_train(args, out),
        Commands::Logs(args) => run_logs(args, out),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli, &mut std::io::stdout().lock())
}
