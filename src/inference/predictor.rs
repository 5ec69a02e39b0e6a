//! Inference Predictor Module
//!
//! Loads saved parameters and classifies normalized image batches, timing each
//! forward pass.

use std::path::Path;
use std::time::{Duration, Instant};

use burn::{tensor::backend::Backend, tensor::Tensor};
use serde::{Deserialize, Serialize};

use crate::dataset::{class_name, Cifar10Batcher};
use crate::model::{load_model, Cifar10Net, Cifar10NetConfig};
use crate::utils::error::Result;

/// Result of classifying one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class index
    pub predicted_class: usize,

    /// Predicted class name
    pub class_name: String,

    /// Raw scores for every class
    pub scores: Vec<f32>,

    /// Wall-clock time of the forward pass and argmax, in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionResult {
    pub fn new(scores: Vec<f32>, inference_time: Duration) -> Self {
        let predicted_class = argmax(&scores);
        Self {
            predicted_class,
            class_name: class_name(predicted_class).unwrap_or("unknown").to_string(),
            scores,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    /// Latency truncated to whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.inference_time_ms as u64
    }
}

/// First index of the largest score
fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_score), (i, &s)| {
            if s > best_score {
                (i, s)
            } else {
                (best, best_score)
            }
        })
        .0
}

/// Wraps a model for inference
pub struct Predictor<B: Backend> {
    model: Cifar10Net<B>,
    batcher: Cifar10Batcher,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: Cifar10Net<B>, device: B::Device) -> Self {
        Self {
            model,
            batcher: Cifar10Batcher::default(),
            device,
        }
    }

    /// Load parameters from `path`; fails if the file is missing or does not fit the topology
    pub fn load(path: &Path, config: &Cifar10NetConfig, device: B::Device) -> Result<Self> {
        let model = load_model::<B>(path, config, &device)?;
        Ok(Self::new(model, device))
    }

    pub fn model(&self) -> &Cifar10Net<B> {
        &self.model
    }

    pub fn batcher(&self) -> &Cifar10Batcher {
        &self.batcher
    }

    /// Device the model lives on; batches must be built there
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Classify every sample of a normalized `[N, 3, 32, 32]` batch
    ///
    /// The measured time covers the whole batch and is reported on each result.
    pub fn predict(&self, images: Tensor<B, 4>) -> Vec<PredictionResult> {
        let start = Instant::now();
        let scores = self.model.forward(images);
        let [batch_size, num_classes] = scores.dims();
        let values: Vec<f32> = scores.into_data().iter::<f32>().collect();
        let elapsed = start.elapsed();

        (0..batch_size)
            .map(|i| PredictionResult::new(values[i * num_classes..(i + 1) * num_classes].to_vec(), elapsed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Cifar10Item, IMAGE_BYTES, NUM_CLASSES};
    use burn::data::dataloader::batcher::Batcher;
    use crate::model::save_model;
    use crate::utils::error::ClassifierError;
    use crate::utils::test_support::backend_rng_lock;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.0, 2.0, 2.0, 1.0]), 1);
        assert_eq!(argmax(&[0.0; NUM_CLASSES]), 0);
    }

    #[test]
    fn test_prediction_result() {
        let mut scores = vec![0.0; NUM_CLASSES];
        scores[7] = 3.5;
        let result = PredictionResult::new(scores, Duration::from_micros(2500));

        assert_eq!(result.predicted_class, 7);
        assert_eq!(result.class_name, "horse");
        assert_eq!(result.elapsed_ms(), 2);
    }

    #[test]
    fn test_predict_batch() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let model = Cifar10NetConfig::new().init::<TestBackend>(&device);
        let predictor = Predictor::new(model, device);

        let items = vec![
            Cifar10Item::new(vec![10; IMAGE_BYTES], 0),
            Cifar10Item::new(vec![200; IMAGE_BYTES], 1),
        ];
        let batch = Batcher::<TestBackend, _, _>::batch(predictor.batcher(), items, &Default::default());
        let results = predictor.predict(batch.images);

        assert_eq!(results.len(), 2);
        for result in results {
            assert_eq!(result.scores.len(), NUM_CLASSES);
            assert!(result.predicted_class < NUM_CLASSES);
            assert!(result.inference_time_ms >= 0.0);
        }
    }

    #[test]
    fn test_load_matches_saved_model() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cifar10_model.pth");

        let config = Cifar10NetConfig::new();
        let model = config.init::<TestBackend>(&device);
        save_model(&model, &path).unwrap();

        let item = Cifar10Item::new((0..IMAGE_BYTES).map(|i| (i % 256) as u8).collect(), 4);
        let original = Predictor::new(model, device);
        let loaded = Predictor::<TestBackend>::load(&path, &config, device).unwrap();

        let batch = Batcher::<TestBackend, _, _>::batch(original.batcher(), vec![item], original.device());
        let before = original.predict(batch.images.clone()).remove(0);
        let after = loaded.predict(batch.images).remove(0);

        assert_eq!(before.scores, after.scores);
        assert_eq!(before.predicted_class, after.predicted_class);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let result = Predictor::<TestBackend>::load(
            Path::new("/nonexistent/model.pth"),
            &Cifar10NetConfig::new(),
            Default::default(),
        );
        assert!(matches!(result, Err(ClassifierError::ModelNotFound(_))));
    }
}
