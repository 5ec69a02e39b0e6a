//! # CIFAR-10 Classifier
//!
//! Trains a small convolutional network on CIFAR-10 with the Burn framework and
//! demonstrates per-sample predictions from the saved parameters.
//!
//! ## Modules
//!
//! - `dataset`: Download, decoding, normalization and batching of CIFAR-10
//! - `model`: The fixed-topology CNN and parameter persistence
//! - `training`: Training loop, evaluation and the end-to-end run
//! - `inference`: Prediction, rendering and the demo loop
//! - `config`: Run configuration
//! - `utils`: Logging, errors, run logs and image helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cifar10_classifier::{config::RunConfig, training::run_training};
//!
//! let config = RunConfig::default();
//! let report = run_training(&config, false)?;
//! println!("accuracy: {:.2}%", report.evaluation.accuracy());
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::RunConfig;
pub use dataset::{
    BatchLoader, Cifar10Batch, Cifar10Batcher, Cifar10Dataset, Cifar10Item, Normalizer, Split,
    CLASS_NAMES, NUM_CLASSES,
};
pub use inference::{DemoOptions, Predictor};
pub use model::{Cifar10Net, Cifar10NetConfig};
pub use training::{EvaluationResult, Trainer, TrainingState};
pub use utils::error::{ClassifierError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
