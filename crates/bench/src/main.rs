//! xgbench CLI
//!
//! Times one train + predict cycle of the XGBoost bindings on YearPredictionMSD.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use xgbench::{run_benchmark, Backend, BenchConfig, Overrides, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "xgbench")]
#[command(author = "xgbench Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark for the XGBoost C API bindings", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory containing YearPredictionMSD.txt
    #[arg(short, long)]
    data_path: Option<PathBuf>,

    /// Training rows
    #[arg(long)]
    train_rows: Option<usize>,

    /// Held-out rows to predict
    #[arg(long)]
    test_rows: Option<usize>,

    /// Binding implementation
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("xgbench v{} (core v{})", env!("CARGO_PKG_VERSION"), xgbench_core::VERSION);

    let mut config = BenchConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    config
        .apply_env()
        .context("Invalid XGBENCH_* environment override")?;
    config.apply_overrides(&Overrides {
        data_path: args.data_path,
        train_rows: args.train_rows,
        test_rows: args.test_rows,
        backend: args.backend,
    });
    config.validate().context("Invalid configuration")?;

    info!("Configuration:");
    info!("  Data path: {}", config.data_path.display());
    info!("  Train rows: {}", config.train_rows);
    info!("  Test rows: {}", config.test_rows);
    info!("  Rounds: {}", config.params.num_boost_round());
    info!("  Backend: {}", config.backend.as_str());

    let api = config.make_api().context("Failed to select backend")?;
    let report = run_benchmark(&config, api).context("Benchmark failed")?;

    info!(
        "Predicted {} of {} test rows as positive",
        report.positives, report.test_rows
    );
    println!("{report}");
    Ok(())
}
