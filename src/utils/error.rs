//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model, training and inference code.
//! Every failure is fatal for a run; the binaries wrap these in `anyhow` and exit.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for classifier operations
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset archive could not be fetched
    #[error("Failed to download '{url}': {reason}")]
    Download { url: String, reason: String },

    /// Dataset file exists but its content is not valid CIFAR-10 binary data
    #[error("Failed to decode '{0}': {1}")]
    Decode(PathBuf, String),

    /// Parameter file is missing
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// Parameter file does not match the fixed network topology
    #[error("Model file '{path}' is incompatible with the network: {reason}")]
    IncompatibleModel { path: PathBuf, reason: String },

    /// Recorder failure while encoding or decoding parameters
    #[error("Record error: {0}")]
    Record(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::Image(err.to_string())
    }
}

impl From<burn::record::RecorderError> for ClassifierError {
    fn from(err: burn::record::RecorderError) -> Self {
        ClassifierError::Record(format!("{:?}", err))
    }
}

/// Convenience Result type for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;
