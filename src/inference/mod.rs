//! Inference module for the prediction demo
//!
//! This module provides:
//! - Loading saved parameters and timing single-sample predictions
//! - Terminal and PNG rendering of samples with their labels
//! - The demo loop over the test split

pub mod demo;
pub mod predictor;
pub mod render;

// Re-export main types for convenience
pub use demo::{run_demo, run_demo_on, DemoOptions, DemoSummary};
pub use predictor::{PredictionResult, Predictor};
pub use render::{batch_to_images, render_terminal, title_line};
