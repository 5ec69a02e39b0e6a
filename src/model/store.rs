//! Saving and loading model parameters
//!
//! Parameters are written as a full-precision binary record so a reloaded model
//! reproduces the saved one's outputs exactly. A small JSON file next to the blob
//! (`<path>.json`) describes how the parameters were produced.

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::Backend,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cnn::{Cifar10Net, Cifar10NetConfig};
use crate::utils::error::{ClassifierError, Result};

type ModelRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Description stored alongside saved parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub architecture: String,
    pub num_classes: usize,
    pub relu_on_logits: bool,
    pub num_params: usize,
    pub epochs: usize,
    /// Test accuracy in percent, when evaluated
    pub test_accuracy: Option<f64>,
    pub backend: String,
    pub saved_at: String,
}

impl ModelMetadata {
    pub fn new<B: Backend>(model: &Cifar10Net<B>, epochs: usize, test_accuracy: Option<f64>) -> Self {
        Self {
            architecture: "Cifar10Net".to_string(),
            num_classes: model.num_classes(),
            relu_on_logits: model.relu_on_logits(),
            num_params: model.num_params(),
            epochs,
            test_accuracy,
            backend: crate::backend::backend_name().to_string(),
            saved_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Path of the metadata file for a parameter blob
pub fn metadata_path(model_path: &Path) -> PathBuf {
    let mut name = model_path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Write parameters to `path`, creating parent directories as needed
pub fn save_model<B: Backend>(model: &Cifar10Net<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let bytes = ModelRecorder::default().record(model.clone().into_record(), ())?;
    fs::write(path, &bytes)?;

    info!("Saved model parameters to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Write parameters plus the metadata sidecar
pub fn save_model_with_metadata<B: Backend>(
    model: &Cifar10Net<B>,
    path: &Path,
    metadata: &ModelMetadata,
) -> Result<()> {
    save_model(model, path)?;

    let sidecar = metadata_path(path);
    fs::write(&sidecar, serde_json::to_string_pretty(metadata)?)?;
    debug!("Wrote model metadata to {}", sidecar.display());
    Ok(())
}

/// Read the metadata sidecar, if one exists
pub fn load_metadata(model_path: &Path) -> Result<Option<ModelMetadata>> {
    let sidecar = metadata_path(model_path);
    if !sidecar.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&sidecar)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Load parameters from `path` into a network built from `config`
///
/// Fails with [`ClassifierError::ModelNotFound`] when the file does not exist and with
/// [`ClassifierError::IncompatibleModel`] when its contents do not fit the topology.
pub fn load_model<B: Backend>(
    path: &Path,
    config: &Cifar10NetConfig,
    device: &B::Device,
) -> Result<Cifar10Net<B>> {
    if !path.is_file() {
        return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let record = ModelRecorder::default()
        .load(bytes, device)
        .map_err(|e| ClassifierError::IncompatibleModel {
            path: path.to_path_buf(),
            reason: format!("{:?}", e),
        })?;

    let model = config.init::<B>(device).load_record(record);

    for ((name, expected), (_, actual)) in config
        .expected_layer_shapes()
        .into_iter()
        .zip(model.layer_shapes())
    {
        if expected != actual {
            return Err(ClassifierError::IncompatibleModel {
                path: path.to_path_buf(),
                reason: format!("{} has shape {:?}, expected {:?}", name, actual, expected),
            });
        }
    }

    info!("Loaded model parameters from {}", path.display());
    Ok(model)
}
