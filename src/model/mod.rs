//! Model module for the CIFAR-10 network using the Burn framework
//!
//! This module provides:
//! - The fixed-topology convolutional classifier and its configuration
//! - Parameter persistence with topology checks on load

pub mod cnn;
pub mod store;

// Re-export main types for convenience
pub use cnn::{Cifar10Net, Cifar10NetConfig};
pub use store::{load_metadata, load_model, save_model, save_model_with_metadata, ModelMetadata};
