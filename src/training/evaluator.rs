//! Held-out evaluation
//!
//! Runs a model once over a split without gradient tracking and counts how often the
//! highest-scoring class equals the label, overall and per class.

use burn::tensor::backend::Backend;
use colored::Colorize;
use tracing::info;

use crate::dataset::{class_name, BatchLoader};
use crate::model::Cifar10Net;

/// Correct/total counts from one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub correct: usize,
    pub total: usize,
    pub class_correct: Vec<usize>,
    pub class_total: Vec<usize>,
}

impl EvaluationResult {
    pub fn new(num_classes: usize) -> Self {
        Self {
            correct: 0,
            total: 0,
            class_correct: vec![0; num_classes],
            class_total: vec![0; num_classes],
        }
    }

    /// Tally one prediction
    pub fn record(&mut self, predicted: usize, label: usize) {
        self.total += 1;
        if let Some(count) = self.class_total.get_mut(label) {
            *count += 1;
        }
        if predicted == label {
            self.correct += 1;
            if let Some(count) = self.class_correct.get_mut(label) {
                *count += 1;
            }
        }
    }

    /// Accuracy in percent; 0 for an empty split
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.total as f64
        }
    }

    /// Accuracy in percent for one class, if it had any samples
    pub fn class_accuracy(&self, class: usize) -> Option<f64> {
        let total = *self.class_total.get(class)?;
        if total == 0 {
            return None;
        }
        Some(100.0 * self.class_correct[class] as f64 / total as f64)
    }

    /// Print overall and per-class accuracy
    pub fn print_report(&self) {
        println!(
            "Accuracy of the network on the {} test images: {} %",
            self.total,
            format!("{:.0}", self.accuracy().floor()).green().bold()
        );
        for class in 0..self.class_total.len() {
            if let Some(acc) = self.class_accuracy(class) {
                println!(
                    "  {:<6} {:>6.2}%  ({}/{})",
                    class_name(class).unwrap_or("?"),
                    acc,
                    self.class_correct[class],
                    self.class_total[class]
                );
            }
        }
    }
}

/// Evaluate `model` over every batch of `loader`
///
/// Pass an inference-only model (`model.valid()` for a trained autodiff model).
pub fn evaluate<B: Backend>(model: &Cifar10Net<B>, loader: &BatchLoader<B>) -> EvaluationResult {
    let mut result = EvaluationResult::new(model.num_classes());

    for batch in loader.iter(0) {
        let predictions = model.predict(batch.images);

        let predicted = predictions.into_data();
        let labels = batch.targets.into_data();
        for (p, l) in predicted.iter::<i64>().zip(labels.iter::<i64>()) {
            result.record(p as usize, l as usize);
        }
    }

    info!(
        "Evaluated {} samples: {}/{} correct ({:.2}%)",
        result.total,
        result.correct,
        result.total,
        result.accuracy()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Cifar10Batcher, Cifar10Dataset, Cifar10Item, IMAGE_BYTES, NUM_CLASSES};
    use crate::model::Cifar10NetConfig;
    use crate::utils::test_support::backend_rng_lock;
    use burn::backend::Autodiff;
    use burn::module::AutodiffModule;
    use burn_ndarray::NdArray;
    use std::sync::Arc;

    type TestBackend = NdArray<f32>;

    fn loader<B: Backend>(n: usize) -> BatchLoader<B> {
        let items = (0..n)
            .map(|i| Cifar10Item::new(vec![(i * 25) as u8; IMAGE_BYTES], i % NUM_CLASSES))
            .collect();
        let dataset = Arc::new(Cifar10Dataset::from_items(items).unwrap());
        BatchLoader::new(dataset, Cifar10Batcher::default(), 4, Default::default())
    }

    #[test]
    fn test_counts_and_accuracy() {
        let mut result = EvaluationResult::new(NUM_CLASSES);
        result.record(3, 3);
        result.record(1, 3);
        result.record(0, 0);
        result.record(5, 9);

        assert_eq!(result.correct, 2);
        assert_eq!(result.total, 4);
        assert_eq!(result.accuracy(), 50.0);
        assert_eq!(result.class_accuracy(3), Some(50.0));
        assert_eq!(result.class_accuracy(0), Some(100.0));
        assert_eq!(result.class_accuracy(9), Some(0.0));
        assert_eq!(result.class_accuracy(7), None);
    }

    #[test]
    fn test_empty_split_has_zero_accuracy() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let model = Cifar10NetConfig::new().init::<TestBackend>(&device);

        let result = evaluate(&model, &loader::<TestBackend>(0));
        assert_eq!(result.total, 0);
        assert_eq!(result.accuracy(), 0.0);
    }

    #[test]
    fn test_accuracy_in_range() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let model = Cifar10NetConfig::new().init::<TestBackend>(&device);

        let result = evaluate(&model, &loader::<TestBackend>(10));
        assert_eq!(result.total, 10);
        assert_eq!(result.class_total.iter().sum::<usize>(), 10);
        assert!((0.0..=100.0).contains(&result.accuracy()));
    }

    #[test]
    fn test_evaluates_valid_view_of_autodiff_model() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        let model = Cifar10NetConfig::new().init::<Autodiff<TestBackend>>(&device);

        let result = evaluate(&model.valid(), &loader::<TestBackend>(6));
        assert_eq!(result.total, 6);
        assert!((0.0..=100.0).contains(&result.accuracy()));
    }
}
