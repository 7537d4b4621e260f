//! VFM report - batch value-for-money scoring
//!
//! Reads a CSV batch of rental units, runs the VFM engine and writes the batch
//! back out with the result columns appended.
//!
//! # Usage
//! ```sh
//! cargo run --bin vfm-report -- --input data/units.csv --horizon 12
//! ```
//!
//! # Environment Variables
//! - `VFM_CONFIG_FILE` - TOML engine config
//! - `VFM_CONTRACT_TYPE` - `monthly` or `jeonse` (default: monthly)
//! - `VFM_MODEL_ROOT` - artifact root directory (default: models)
//! - `VFM_USE_SCORER`, `VFM_ALPHA`, `VFM_BETA` - blend settings

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;
use vfm_engine::application::vfm::{BatchSummary, VfmEngine};
use vfm_engine::config::{ContractType, EngineConfig};
use vfm_engine::infrastructure::observability::EngineMetrics;
use vfm_engine::infrastructure::{read_table, write_table};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input CSV batch
    #[arg(long)]
    input: PathBuf,

    /// Output CSV (default: <input>_vfm.csv)
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML engine config; overrides VFM_* environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Contract type: monthly or jeonse
    #[arg(long)]
    contract: Option<ContractType>,

    /// Root directory holding lstm/ and mlp/ artifacts
    #[arg(long)]
    model_root: Option<PathBuf>,

    /// Forecast horizon in months (3, 6, 9 or 12; anything else uses 6)
    #[arg(long, default_value_t = 6)]
    horizon: u32,

    /// Disable the location scorer (VFM becomes the price ratio)
    #[arg(long)]
    no_scorer: bool,

    /// Scorer weight
    #[arg(long)]
    alpha: Option<f64>,

    /// Price-ratio weight
    #[arg(long)]
    beta: Option<f64>,
}

fn resolve_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::from_env()?,
    };

    if args.contract.is_some() || args.model_root.is_some() {
        let contract = args.contract.unwrap_or(config.contract);
        let root = args
            .model_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("models"));
        let layout = EngineConfig::for_contract(contract, &root);
        config = EngineConfig {
            use_scorer: config.use_scorer,
            alpha: config.alpha,
            beta: config.beta,
            location_schema: config.location_schema,
            ..layout
        };
    }
    if args.no_scorer {
        config.use_scorer = false;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(beta) = args.beta {
        config.beta = beta;
    }
    config.validate()?;
    Ok(config)
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("units");
    input.with_file_name(format!("{}_vfm.csv", stem))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    info!("VFM report {} starting...", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args)?;
    info!(
        "Configuration loaded: contract={}, scorer={}, alpha={}, beta={}",
        config.contract, config.use_scorer, config.alpha, config.beta
    );

    let metrics = EngineMetrics::new()?;
    let engine = VfmEngine::load(&config)
        .context("VFM engine could not be loaded")?
        .with_metrics(metrics.clone());
    info!("Engine state: {}", engine.state());

    let schema = engine.schema().clone();
    let table = read_table(&args.input, &[schema.unit_id_column.as_str()])?;
    let report = engine
        .calculate_vfm(&table, args.horizon)
        .with_context(|| format!("VFM failed for {}", args.input.display()))?;

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));
    write_table(&output, &report.table)?;

    let summary = BatchSummary::from_report(&report, &schema.unit_id_column)?;
    info!("Batch summary: {}", summary);
    if report.forecast_fallback_rows() > 0 {
        warn!(
            "{} rows used the current price as forecast",
            report.forecast_fallback_rows()
        );
    }
    info!("Metrics:\n{}", metrics.render());
    Ok(())
}
