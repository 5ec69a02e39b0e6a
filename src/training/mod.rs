//! Training module
//!
//! This module provides:
//! - The SGD training loop with periodic loss records
//! - Held-out accuracy evaluation
//! - The end-to-end run used by the `train` binary

pub mod evaluator;
pub mod pipeline;
pub mod trainer;

// Re-export main types for convenience
pub use evaluator::{evaluate, EvaluationResult};
pub use pipeline::{run_training, run_training_on, TrainingReport};
pub use trainer::{global_step, Trainer, TrainingState, TRAINING_LOSS_TAG};
