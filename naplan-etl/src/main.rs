//! naplan-etl - NAPLAN export flattener
//!
//! Reads every JSON export in the input directory, flattens it into the
//! relational schema and writes the SQLite database and/or CSV files.

use anyhow::{Context, Result};
use clap::Parser;
use naplan_common::config::{
    load_toml_config, resolve_input_dir, resolve_output_dir, OutputMode,
};
use naplan_etl::{Pipeline, PipelineOptions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for naplan-etl
#[derive(Parser, Debug)]
#[command(name = "naplan-etl")]
#[command(about = "Flatten NAPLAN JSON exports into SQLite and CSV")]
#[command(version)]
struct Args {
    /// Directory holding the yearly JSON exports
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Directory receiving the database and CSV files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, env = "NAPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output mode: database, csv or both
    #[arg(short, long)]
    mode: Option<OutputMode>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .init();

    info!("Starting naplan-etl");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let input_dir = resolve_input_dir(args.input_dir.as_deref(), &config);
    let output_dir = resolve_output_dir(args.output_dir.as_deref(), &config);
    info!("Input directory: {}", input_dir.display());
    info!("Output directory: {}", output_dir.display());

    let mut options = PipelineOptions::new(&input_dir, &output_dir);
    options.database_path = config.database_path(&output_dir);
    options.mode = args.mode.or(config.mode).unwrap_or_default();
    options.question_columns = config.questions.columns.clone();

    let summary = Pipeline::new(options)
        .run()
        .await
        .with_context(|| format!("Failed to process {}", input_dir.display()))?;
    summary.log();

    Ok(())
}
