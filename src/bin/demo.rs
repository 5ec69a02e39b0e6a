//! CIFAR-10 prediction demo
//!
//! Loads saved parameters and shows each test image with its true label, the
//! predicted label and the time the prediction took.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cifar10_classifier::backend::{default_device, DefaultBackend};
use cifar10_classifier::config::{RunConfig, DEFAULT_MODEL_PATH};
use cifar10_classifier::inference::{run_demo, DemoOptions};
use cifar10_classifier::utils::logging::{init_logging, LogConfig, LogLevel};

/// Show per-sample predictions of a trained classifier
#[derive(Parser, Debug)]
#[command(name = "demo")]
#[command(version)]
#[command(about = "Predict CIFAR-10 test images with a saved model", long_about = None)]
struct Cli {
    /// Saved model parameters
    #[arg(long, alias = "model_input_path", default_value = DEFAULT_MODEL_PATH)]
    model_input_path: PathBuf,

    /// TOML run configuration (dataset location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many samples
    #[arg(short, long)]
    limit: Option<usize>,

    /// Also save every sample as a PNG in this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Background threads preparing samples
    #[arg(long, default_value_t = 1)]
    num_workers: usize,

    /// Skip terminal rendering, only print the summary
    #[arg(long, default_value = "false")]
    no_render: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long)]
    log_level: Option<LogLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    init_logging(&log_config)?;

    let config = RunConfig::load_or_default(cli.config.as_deref()).context("Failed to load run configuration")?;

    let options = DemoOptions {
        model_path: cli.model_input_path,
        limit: cli.limit,
        save_dir: cli.save_dir,
        render: !cli.no_render,
        num_workers: cli.num_workers,
    };

    let summary = run_demo::<DefaultBackend>(&config, &options, default_device())
        .with_context(|| format!("Demo failed for model {}", options.model_path.display()))?;

    println!();
    println!("{}", "Demo Complete!".green().bold());
    println!("  Samples:       {}", summary.samples);
    println!("  Correct:       {} ({:.2}%)", summary.correct, summary.accuracy());
    println!("  Mean latency:  {:.3}ms", summary.mean_latency_ms);

    Ok(())
}
