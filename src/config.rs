//! Run configuration
//!
//! Everything a single invocation needs (dataset location, batch sizes, seed,
//! optimizer settings, output paths) lives in one [`RunConfig`] that is built once
//! and passed into each component. Defaults reproduce the reference setup; a TOML
//! file can override any subset of fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{ClassifierError, Result};

/// Default location of the serialized parameters
pub const DEFAULT_MODEL_PATH: &str = "./models/cifar10_model.pth";

/// Default run log directory
pub const DEFAULT_RUN_DIR: &str = "runs/classifier_experiment_1";

/// Top-level configuration for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

/// Dataset location and batching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root directory holding `cifar-10-batches-bin/`
    pub root: PathBuf,
    /// Fetch the archive when it is not present
    pub download: bool,
    /// Batch size for the training split
    pub train_batch_size: usize,
    /// Batch size for the test split during evaluation
    pub test_batch_size: usize,
    /// Shuffle the training split every epoch
    pub shuffle_train: bool,
    /// Background threads assembling batches ahead of the consumer; 0 loads inline
    pub num_workers: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
            download: true,
            train_batch_size: 4,
            test_batch_size: 4,
            shuffle_train: true,
            num_workers: 2,
        }
    }
}

/// Optimization hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of passes over the training split
    pub epochs: usize,
    /// SGD learning rate
    pub learning_rate: f64,
    /// SGD momentum factor
    pub momentum: f64,
    /// Emit a loss record every N batches of an epoch
    pub log_interval: usize,
    /// Seed for parameter initialization and shuffling
    pub seed: u64,
}

impl TrainingConfig {
    /// Reject hyperparameters the training loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ClassifierError::Config(
                "epochs must be greater than 0".to_string(),
            ));
        }

        if self.log_interval == 0 {
            return Err(ClassifierError::Config(
                "log_interval must be greater than 0".to_string(),
            ));
        }

        if !(self.learning_rate > 0.0) {
            return Err(ClassifierError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ClassifierError::Config(
                "momentum must be in range [0.0, 1.0)".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 0.001,
            momentum: 0.9,
            log_interval: 100,
            seed: 666,
        }
    }
}

/// Where artifacts go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Parameter blob path
    pub model_path: PathBuf,
    /// Run log directory (scalars, graph, images)
    pub run_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
        }
    }
}

impl RunConfig {
    /// Load a configuration from a TOML file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClassifierError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ClassifierError::Config(format!("Failed to parse config {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the given file when one is provided
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ClassifierError::Serialization(e.to_string()))
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.data.train_batch_size == 0 || self.data.test_batch_size == 0 {
            return Err(ClassifierError::Config(
                "batch sizes must be greater than 0".to_string(),
            ));
        }

        self.training.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = RunConfig::default();
        assert_eq!(config.training.epochs, 10);
        assert_eq!(config.training.learning_rate, 0.001);
        assert_eq!(config.training.momentum, 0.9);
        assert_eq!(config.training.log_interval, 100);
        assert_eq!(config.data.train_batch_size, 4);
        assert_eq!(config.data.num_workers, 2);
        assert_eq!(config.output.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RunConfig::default();
        config.data.train_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.training.epochs = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.training.learning_rate = -1.0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.training.momentum = 1.5;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.training.log_interval = 0;
        assert!(matches!(config.validate(), Err(ClassifierError::Config(_))));
        assert!(config.training.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "[training]\nepochs = 2\n\n[data]\nroot = \"/tmp/cifar\"\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.training.momentum, 0.9);
        assert_eq!(config.data.root, PathBuf::from("/tmp/cifar"));
        assert_eq!(config.data.test_batch_size, 4);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RunConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: RunConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.training.seed, config.training.seed);
        assert_eq!(parsed.output.run_dir, config.output.run_dir);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = RunConfig::load(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(matches!(err, ClassifierError::Config(_)));
    }
}
