//! Per-sample prediction demo over the test split

use std::path::PathBuf;
use std::sync::Arc;

use burn::tensor::backend::Backend;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::predictor::Predictor;
use super::render::{batch_to_images, render_terminal, save_sample, title_line};
use crate::config::RunConfig;
use crate::dataset::{BatchLoader, Cifar10Dataset, Split};
use crate::model::{load_metadata, Cifar10NetConfig};
use crate::utils::error::Result;

/// Options for one demo run
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Parameter blob to load
    pub model_path: PathBuf,
    /// Stop after this many samples
    pub limit: Option<usize>,
    /// Also write each sample as a PNG here
    pub save_dir: Option<PathBuf>,
    /// Draw samples in the terminal
    pub render: bool,
    /// Background threads preparing samples
    pub num_workers: usize,
}

/// Outcome of a demo run
#[derive(Debug, Clone, Default)]
pub struct DemoSummary {
    pub samples: usize,
    pub correct: usize,
    pub predictions: Vec<usize>,
    pub mean_latency_ms: f64,
}

impl DemoSummary {
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.samples as f64
        }
    }
}

/// Load the model, then predict test samples one at a time
pub fn run_demo<B: Backend>(config: &RunConfig, options: &DemoOptions, device: B::Device) -> Result<DemoSummary> {
    // Fail on a missing or incompatible model before touching the dataset
    let predictor = Predictor::<B>::load(&options.model_path, &Cifar10NetConfig::new(), device)?;

    match load_metadata(&options.model_path) {
        Ok(Some(meta)) => {
            let accuracy = meta.test_accuracy.map_or("n/a".to_string(), |a| format!("{:.2}%", a));
            info!(
                "Model: {} trained {} epochs on {}, saved {}, test accuracy {}",
                meta.architecture, meta.epochs, meta.backend, meta.saved_at, accuracy
            );
        }
        Ok(None) => debug!("No metadata next to {}", options.model_path.display()),
        Err(e) => warn!("Ignoring unreadable model metadata: {}", e),
    }

    let dataset = Arc::new(Cifar10Dataset::new(&config.data.root, Split::Test, config.data.download)?);
    run_demo_on::<B>(&predictor, dataset, options)
}

/// Demo loop over an already loaded split
pub fn run_demo_on<B: Backend>(
    predictor: &Predictor<B>,
    dataset: Arc<Cifar10Dataset>,
    options: &DemoOptions,
) -> Result<DemoSummary> {
    let loader = BatchLoader::<B>::new(dataset, predictor.batcher().clone(), 1, predictor.device().clone())
        .with_workers(options.num_workers);
    let total = options.limit.map_or(loader.num_batches(), |l| l.min(loader.num_batches()));

    let progress = if options.render {
        ProgressBar::new(total as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let normalizer = *predictor.batcher().normalizer();
    let mut summary = DemoSummary::default();
    let mut total_latency = 0.0;

    for (index, batch) in loader.iter(0).take(total).enumerate() {
        let label = batch
            .targets
            .clone()
            .into_data()
            .iter::<i64>()
            .next()
            .unwrap_or_default() as usize;

        let Some(prediction) = predictor.predict(batch.images.clone()).into_iter().next() else {
            continue;
        };

        summary.samples += 1;
        summary.predictions.push(prediction.predicted_class);
        if prediction.predicted_class == label {
            summary.correct += 1;
        }
        total_latency += prediction.inference_time_ms;

        let needs_image = options.render || options.save_dir.is_some();
        if needs_image {
            if let Some(image) = batch_to_images(batch.images, &normalizer)?.into_iter().next() {
                if options.render {
                    let title = title_line(label, prediction.predicted_class, prediction.elapsed_ms());
                    let title = if prediction.predicted_class == label {
                        title.green()
                    } else {
                        title.red()
                    };
                    let picture = render_terminal(&image);
                    progress.suspend(|| {
                        println!("{}", title);
                        print!("{}", picture);
                    });
                }

                if let Some(dir) = &options.save_dir {
                    save_sample(dir, index, label, prediction.predicted_class, &image)?;
                }
            }
        }

        progress.inc(1);
    }
    progress.finish_and_clear();

    if summary.samples > 0 {
        summary.mean_latency_ms = total_latency / summary.samples as f64;
    }

    info!(
        "Demo finished: {}/{} correct ({:.2}%), mean latency {:.3}ms",
        summary.correct,
        summary.samples,
        summary.accuracy(),
        summary.mean_latency_ms
    );
    Ok(summary)
}
