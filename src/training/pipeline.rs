//! End-to-end training run
//!
//! Provision data → build model → show info → train → evaluate → save → report.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use burn::{
    module::{AutodiffModule, Module},
    tensor::backend::AutodiffBackend,
};
use colored::Colorize;
use indicatif::ProgressBar;
use tracing::{debug, info};

use super::evaluator::{evaluate, EvaluationResult};
use super::trainer::{epoch_progress_bar, Trainer, TrainingState};
use crate::backend::{backend_name, default_device, TrainingBackend};
use crate::config::RunConfig;
use crate::dataset::{class_name, BatchLoader, Cifar10Batcher, Cifar10Dataset, Split};
use crate::inference::render::{batch_to_images, render_terminal};
use crate::model::{save_model_with_metadata, Cifar10Net, Cifar10NetConfig, ModelMetadata};
use crate::utils::error::Result;
use crate::utils::format_duration;
use crate::utils::images::make_grid;
use crate::utils::run_log::RunLogger;

/// Tag of the sample grid in the run log
pub const TRAIN_IMAGES_TAG: &str = "train_images";

/// Copy of the effective configuration inside the run directory
pub const RUN_CONFIG_FILE: &str = "config.toml";

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub state: TrainingState,
    pub evaluation: EvaluationResult,
    /// Time spent training
    pub training_elapsed: Duration,
    /// Time from the start of training to the end of evaluation
    pub testing_elapsed: Duration,
}

/// Train on CIFAR-10 with the default backend
pub fn run_training(config: &RunConfig, show_plot: bool) -> Result<TrainingReport> {
    config.validate()?;

    let train = Cifar10Dataset::new(&config.data.root, Split::Train, config.data.download)?;
    let test = Cifar10Dataset::new(&config.data.root, Split::Test, config.data.download)?;

    run_training_on::<TrainingBackend>(
        config,
        Arc::new(train),
        Arc::new(test),
        default_device(),
        show_plot,
        epoch_progress_bar(config.training.epochs),
    )
}

/// Train and evaluate on already loaded splits
pub fn run_training_on<B: AutodiffBackend>(
    config: &RunConfig,
    train: Arc<Cifar10Dataset>,
    test: Arc<Cifar10Dataset>,
    device: B::Device,
    show_plot: bool,
    progress: ProgressBar,
) -> Result<TrainingReport> {
    config.validate()?;
    B::seed(config.training.seed);

    debug!("train class distribution: {:?}", train.class_distribution());
    debug!("test class distribution: {:?}", test.class_distribution());

    let mut train_loader =
        BatchLoader::<B>::new(train, Cifar10Batcher::default(), config.data.train_batch_size, device.clone())
            .with_workers(config.data.num_workers);
    if config.data.shuffle_train {
        train_loader = train_loader.shuffled(config.training.seed);
    }
    let test_loader = BatchLoader::<B::InnerBackend>::new(
        test,
        Cifar10Batcher::default(),
        config.data.test_batch_size,
        device.clone(),
    )
    .with_workers(config.data.num_workers);

    let model = Cifar10NetConfig::new().init::<B>(&device);
    let mut run_log = RunLogger::create(&config.output.run_dir)?;
    fs::write(run_log.dir().join(RUN_CONFIG_FILE), config.to_toml()?)?;
    show_info(&model, &train_loader, &run_log, &format!("{:?}", device), show_plot)?;

    let start = Instant::now();
    let mut trainer = Trainer::new(model, config.training.clone())?;
    trainer.fit(&train_loader, &mut run_log, &progress)?;
    let training_elapsed = start.elapsed();

    let state = trainer.state.clone();
    let model = trainer.into_model().valid();

    let evaluation = evaluate(&model, &test_loader);
    let testing_elapsed = start.elapsed();

    evaluation.print_report();
    println!(
        "training elapsed: {} , testing elapsed: {}",
        format_duration(training_elapsed.as_secs_f64()),
        format_duration(testing_elapsed.as_secs_f64())
    );

    let metadata = ModelMetadata::new(&model, config.training.epochs, Some(evaluation.accuracy()));
    save_model_with_metadata(&model, &config.output.model_path, &metadata)?;
    run_log.close()?;

    info!(
        "Model saved to {} ({:.2}% test accuracy)",
        config.output.model_path.display(),
        evaluation.accuracy()
    );

    Ok(TrainingReport {
        state,
        evaluation,
        training_elapsed,
        testing_elapsed,
    })
}

/// Print the run banner and write the graph and first-batch grid to the run log
fn show_info<B: AutodiffBackend>(
    model: &Cifar10Net<B>,
    loader: &BatchLoader<B>,
    run_log: &RunLogger,
    device: &str,
    show_plot: bool,
) -> Result<()> {
    let summary = model.summary();
    let separator = "=".repeat(41);

    println!("{}", separator.cyan());
    println!("device is: {} ({})", device, backend_name());
    println!("net: {}", summary);
    println!("parameters: {}", model.num_params());

    if let Some(batch) = loader.iter(0).next() {
        let labels: Vec<&str> = batch
            .targets
            .clone()
            .into_data()
            .iter::<i64>()
            .map(|l| class_name(l as usize).unwrap_or("?"))
            .collect();
        println!("first mini_batch training data and labels");
        println!("label: {:?}", labels);

        let images = batch_to_images(batch.images, loader.batcher().normalizer())?;
        let grid = make_grid(&images, 8, 2);
        run_log.add_image(TRAIN_IMAGES_TAG, &grid)?;

        if show_plot {
            print!("{}", render_terminal(&grid));
        }
    }
    println!("{}", separator.cyan());

    run_log.add_graph(&summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Cifar10Item, IMAGE_BYTES, NUM_CLASSES};
    use crate::model::store::{load_metadata, load_model};
    use crate::utils::error::ClassifierError;
    use crate::utils::test_support::backend_rng_lock;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn dataset(n: usize, offset: usize) -> Arc<Cifar10Dataset> {
        let items = (0..n)
            .map(|i| {
                let image = (0..IMAGE_BYTES).map(|p| ((p * 3 + (i + offset) * 17) % 256) as u8).collect();
                Cifar10Item::new(image, i % NUM_CLASSES)
            })
            .collect();
        Arc::new(Cifar10Dataset::from_items(items).unwrap())
    }

    #[test]
    fn test_full_run_on_synthetic_data() {
        let _guard = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();

        let mut config = RunConfig::default();
        config.training.epochs = 1;
        config.training.log_interval = 5;
        config.data.train_batch_size = 1;
        config.output.run_dir = dir.path().join("runs");
        config.output.model_path = dir.path().join("models").join("cifar10_model.pth");

        let report = run_training_on::<TestBackend>(
            &config,
            dataset(10, 0),
            dataset(6, 100),
            Default::default(),
            false,
            ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(report.state.epochs_completed, 1);
        assert_eq!(report.state.records_emitted, 2);
        assert_eq!(report.evaluation.total, 6);
        assert!((0.0..=100.0).contains(&report.evaluation.accuracy()));
        assert!(report.testing_elapsed >= report.training_elapsed);

        let run_dir = &config.output.run_dir;
        let scalars = std::fs::read_to_string(run_dir.join("scalars.jsonl")).unwrap();
        assert_eq!(scalars.lines().count(), 2);
        assert!(run_dir.join("graph.txt").exists());
        assert!(run_dir.join("train_images.png").exists());
        assert!(run_dir.join("training_loss.svg").exists());
        let saved: RunConfig = toml::from_str(&std::fs::read_to_string(run_dir.join(RUN_CONFIG_FILE)).unwrap()).unwrap();
        assert_eq!(saved.training.log_interval, 5);

        let loaded = load_model::<NdArray<f32>>(&config.output.model_path, &Cifar10NetConfig::new(), &Default::default());
        assert!(loaded.is_ok());
        let metadata = load_metadata(&config.output.model_path).unwrap().unwrap();
        assert_eq!(metadata.epochs, 1);
        assert_eq!(metadata.test_accuracy, Some(report.evaluation.accuracy()));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_training() {
        let _guard = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();

        let mut config = RunConfig::default();
        config.training.log_interval = 0;
        config.output.run_dir = dir.path().join("runs");
        config.output.model_path = dir.path().join("cifar10_model.pth");

        let result = run_training_on::<TestBackend>(
            &config,
            dataset(4, 0),
            dataset(2, 100),
            Default::default(),
            false,
            ProgressBar::hidden(),
        );

        assert!(matches!(result, Err(ClassifierError::Config(_))));
        assert!(!config.output.run_dir.exists());
        assert!(!config.output.model_path.exists());
    }
}
