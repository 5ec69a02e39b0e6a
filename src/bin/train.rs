//! CIFAR-10 training CLI
//!
//! Trains the classifier, evaluates it on the test split and saves the parameters.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cifar10_classifier::backend::backend_name;
use cifar10_classifier::config::RunConfig;
use cifar10_classifier::training::run_training;
use cifar10_classifier::utils::logging::{init_logging, LogConfig, LogLevel};
use cifar10_classifier::VERSION;

/// Train a CNN on CIFAR-10
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(version)]
#[command(about = "Train a CIFAR-10 classifier with Burn", long_about = None)]
struct Cli {
    /// TOML run configuration (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Draw the first training batch in the terminal
    #[arg(long, default_value = "false")]
    show_plot: bool,

    /// Override the number of epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Override the dataset root directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override where the trained parameters are written
    #[arg(long, alias = "model_output_path")]
    model_output_path: Option<PathBuf>,

    /// Override the number of background batch-loading threads
    #[arg(long)]
    num_workers: Option<usize>,

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

    let mut config = RunConfig::load_or_default(cli.config.as_deref()).context("Failed to load run configuration")?;
    if let Some(epochs) = cli.epochs {
        config.training.epochs = epochs;
    }
    if let Some(root) = cli.data_dir {
        config.data.root = root;
    }
    if let Some(path) = cli.model_output_path {
        config.output.model_path = path;
    }
    if let Some(workers) = cli.num_workers {
        config.data.num_workers = workers;
    }

    println!(
        "{} v{} ({})",
        "CIFAR-10 classifier".green().bold(),
        VERSION,
        backend_name()
    );
    println!("  Epochs:        {}", config.training.epochs);
    println!("  Batch size:    {}", config.data.train_batch_size);
    println!("  Learning rate: {}", config.training.learning_rate);
    println!("  Momentum:      {}", config.training.momentum);
    println!("  Seed:          {}", config.training.seed);
    println!("  Workers:       {}", config.data.num_workers);
    println!();

    let report = run_training(&config, cli.show_plot).context("Training failed")?;

    println!();
    println!("{}", "Training Complete!".green().bold());
    println!("  Test accuracy: {:.2}%", report.evaluation.accuracy());
    println!("  Model:         {}", config.output.model_path.display());
    println!("  Run log:       {}", config.output.run_dir.display());

    Ok(())
}
