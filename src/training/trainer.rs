//! Supervised training loop
//!
//! Runs epochs × batches of forward pass, cross-entropy loss, backpropagation and an
//! SGD-with-momentum update. Every `log_interval` batches of an epoch the current
//! batch loss is emitted to a [`MetricsSink`] under the tag `"training loss"`.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    optim::{adaptor::OptimizerAdaptor, momentum::MomentumConfig, GradientsParams, Optimizer, Sgd, SgdConfig},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::dataset::{BatchLoader, Cifar10Batch};
use crate::model::Cifar10Net;
use crate::utils::error::Result;
use crate::utils::run_log::MetricsSink;

/// Tag of the periodic loss record
pub const TRAINING_LOSS_TAG: &str = "training loss";

/// Progress and history of a training run
#[derive(Debug, Clone, Default)]
pub struct TrainingState {
    /// Epochs completed
    pub epochs_completed: usize,
    /// Optimizer steps taken
    pub iteration: usize,
    /// Total training samples seen
    pub samples_seen: usize,
    /// Loss of the most recent batch
    pub last_loss: f64,
    /// Mean batch loss per completed epoch
    pub epoch_losses: Vec<f64>,
    /// Number of loss records emitted
    pub records_emitted: usize,
}

/// Trains a [`Cifar10Net`] in place
pub struct Trainer<B: AutodiffBackend> {
    model: Cifar10Net<B>,
    optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, Cifar10Net<B>, B>,
    config: TrainingConfig,
    pub state: TrainingState,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer around an initialized model
    ///
    /// Fails with a configuration error when `config` cannot drive the loop, e.g. a
    /// zero `log_interval`.
    pub fn new(model: Cifar10Net<B>, config: TrainingConfig) -> Result<Self> {
        config.validate()?;

        let optimizer = SgdConfig::new()
            .with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(config.momentum)
                    .with_dampening(0.0),
            ))
            .init();

        Ok(Self {
            model,
            optimizer,
            config,
            state: TrainingState::default(),
        })
    }

    pub fn model(&self) -> &Cifar10Net<B> {
        &self.model
    }

    /// Give up the trained model
    pub fn into_model(self) -> Cifar10Net<B> {
        self.model
    }

    /// One forward/backward/update cycle; returns the batch loss
    pub fn train_step(&mut self, batch: Cifar10Batch<B>) -> f64 {
        let batch_size = batch.len();
        let output = self.model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output, batch.targets);
        let loss_value: f64 = loss.clone().into_scalar().elem();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optimizer.step(self.config.learning_rate, self.model.clone(), grads);

        self.state.iteration += 1;
        self.state.samples_seen += batch_size;
        self.state.last_loss = loss_value;
        loss_value
    }

    /// Train for one epoch (0-indexed), returning the mean batch loss
    pub fn train_epoch(
        &mut self,
        loader: &BatchLoader<B>,
        epoch: usize,
        sink: &mut dyn MetricsSink,
        progress: &ProgressBar,
    ) -> Result<f64> {
        let batches_per_epoch = loader.num_batches();
        let mut total_loss = 0.0;
        let mut count = 0usize;

        for (batch_idx, batch) in loader.iter(epoch).enumerate() {
            let loss = self.train_step(batch);
            total_loss += loss;
            count += 1;

            let i = batch_idx + 1;
            if i % self.config.log_interval == 0 {
                let step = global_step(epoch, batches_per_epoch, i);
                sink.add_scalar(TRAINING_LOSS_TAG, loss, step)?;
                self.state.records_emitted += 1;

                progress.set_message(format!("epoch: {}, index: {}, loss: {:.4}", epoch, i, loss));
                debug!("epoch {} batch {}/{}: loss = {:.4}", epoch, i, batches_per_epoch, loss);
            }
        }

        let mean_loss = if count > 0 { total_loss / count as f64 } else { 0.0 };
        self.state.epoch_losses.push(mean_loss);
        self.state.epochs_completed += 1;

        info!("Epoch {} finished: mean loss = {:.4}", epoch + 1, mean_loss);
        Ok(mean_loss)
    }

    /// Run the configured number of epochs
    pub fn fit(
        &mut self,
        loader: &BatchLoader<B>,
        sink: &mut dyn MetricsSink,
        progress: &ProgressBar,
    ) -> Result<&TrainingState> {
        info!(
            "Training for {} epochs ({} batches each, lr = {}, momentum = {})",
            self.config.epochs,
            loader.num_batches(),
            self.config.learning_rate,
            self.config.momentum
        );

        for epoch in 0..self.config.epochs {
            self.train_epoch(loader, epoch, sink, progress)?;
            progress.inc(1);
        }
        progress.finish();

        Ok(&self.state)
    }
}

/// Step index of a loss record: `epoch * batches_per_epoch + i` with `i` counted from 1
pub fn global_step(epoch: usize, batches_per_epoch: usize, i: usize) -> usize {
    epoch * batches_per_epoch + i
}

/// Progress bar over epochs
pub fn epoch_progress_bar(epochs: usize) -> ProgressBar {
    let bar = ProgressBar::new(epochs as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} epochs ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Cifar10Batcher, Cifar10Dataset, Cifar10Item, IMAGE_BYTES};
    use crate::model::Cifar10NetConfig;
    use crate::utils::run_log::MemorySink;
    use crate::utils::test_support::backend_rng_lock;
    use burn::backend::Autodiff;
    use crate::utils::error::ClassifierError;
    use burn::module::{Module, Param};
    use burn::tensor::{backend::Backend, Tensor};
    use burn_ndarray::NdArray;
    use std::sync::Arc;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn synthetic_dataset(n: usize) -> Arc<Cifar10Dataset> {
        let items = (0..n)
            .map(|i| {
                let image = (0..IMAGE_BYTES).map(|p| ((p * (i + 3)) % 256) as u8).collect();
                Cifar10Item::new(image, i % 10)
            })
            .collect();
        Arc::new(Cifar10Dataset::from_items(items).unwrap())
    }

    fn config(epochs: usize, log_interval: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            log_interval,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_global_step() {
        assert_eq!(global_step(0, 12500, 100), 100);
        assert_eq!(global_step(2, 12500, 100), 25100);
    }

    #[test]
    fn test_one_epoch_on_ten_samples_emits_records() {
        let _guard = backend_rng_lock();
        let device = Default::default();
        TestBackend::seed(666);

        let loader = BatchLoader::<TestBackend>::new(synthetic_dataset(10), Cifar10Batcher::default(), 1, device)
            .shuffled(666);
        let model = Cifar10NetConfig::new().init::<TestBackend>(&Default::default());
        let mut trainer = Trainer::new(model, config(1, 5)).unwrap();
        let mut sink = MemorySink::default();

        let state = trainer.fit(&loader, &mut sink, &ProgressBar::hidden()).unwrap();

        assert_eq!(state.epochs_completed, 1);
        assert_eq!(state.iteration, 10);
        assert_eq!(state.samples_seen, 10);
        assert!(state.last_loss.is_finite());

        let steps: Vec<usize> = sink.records.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![5, 10]);
        assert!(sink.records.iter().all(|r| r.tag == TRAINING_LOSS_TAG));
    }

    #[test]
    fn test_steps_increase_across_epochs() {
        let _guard = backend_rng_lock();
        TestBackend::seed(1);

        let loader = BatchLoader::<TestBackend>::new(synthetic_dataset(8), Cifar10Batcher::default(), 2, Default::default());
        let model = Cifar10NetConfig::new().init::<TestBackend>(&Default::default());
        let mut trainer = Trainer::new(model, config(3, 2)).unwrap();
        let mut sink = MemorySink::default();

        trainer.fit(&loader, &mut sink, &ProgressBar::hidden()).unwrap();

        let steps: Vec<usize> = sink.records.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![2, 4, 6, 8, 10, 12]);
        assert_eq!(trainer.state.epoch_losses.len(), 3);
    }

    /// Every weight and bias of the network, flattened in declaration order
    fn all_parameters(model: &Cifar10Net<TestBackend>) -> Vec<f32> {
        fn values<const D: usize>(param: &Param<Tensor<TestBackend, D>>) -> Vec<f32> {
            param.val().into_data().iter::<f32>().collect()
        }

        let mut out = Vec::new();
        for (weight, bias) in [(&model.conv1.weight, &model.conv1.bias), (&model.conv2.weight, &model.conv2.bias)] {
            out.extend(values(weight));
            out.extend(bias.as_ref().map(values).unwrap_or_default());
        }
        for layer in [&model.fc1, &model.fc2, &model.fc3] {
            out.extend(values(&layer.weight));
            out.extend(layer.bias.as_ref().map(values).unwrap_or_default());
        }
        out
    }

    #[test]
    fn test_same_seed_gives_same_parameters() {
        let _guard = backend_rng_lock();

        let run = || {
            TestBackend::seed(666);
            let loader = BatchLoader::<TestBackend>::new(synthetic_dataset(6), Cifar10Batcher::default(), 2, Default::default())
                .shuffled(666);
            let model = Cifar10NetConfig::new().init::<TestBackend>(&Default::default());
            let mut trainer = Trainer::new(model, config(2, 100)).unwrap();
            trainer.fit(&loader, &mut MemorySink::default(), &ProgressBar::hidden()).unwrap();
            all_parameters(&trainer.into_model())
        };

        let first = run();
        let second = run();
        assert_eq!(first.len(), 52_306);
        assert_eq!(first.len(), second.len());
        for (i, (a, b)) in first.iter().zip(second.iter()).enumerate() {
            assert!((a - b).abs() < 1e-6, "parameter {} differs: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_zero_log_interval_is_rejected() {
        let _guard = backend_rng_lock();
        let model = Cifar10NetConfig::new().init::<TestBackend>(&Default::default());

        let result = Trainer::new(model, config(1, 0));
        assert!(matches!(result, Err(ClassifierError::Config(_))));
    }

    #[test]
    fn test_training_changes_parameters() {
        let _guard = backend_rng_lock();
        TestBackend::seed(7);

        let loader = BatchLoader::<TestBackend>::new(synthetic_dataset(4), Cifar10Batcher::default(), 4, Default::default());
        let model = Cifar10NetConfig::new().init::<TestBackend>(&Default::default());
        let before: Vec<f32> = model.fc3.weight.val().into_data().to_vec().unwrap();

        let mut trainer = Trainer::new(model, config(1, 100)).unwrap();
        trainer.fit(&loader, &mut MemorySink::default(), &ProgressBar::hidden()).unwrap();

        let after: Vec<f32> = trainer.model().fc3.weight.val().into_data().to_vec().unwrap();
        assert_eq!(trainer.model().num_params(), 52_306);
        assert_ne!(before, after);
    }
}
