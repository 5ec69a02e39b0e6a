//! Run log: the write-only sink for training metrics
//!
//! A [`RunLogger`] owns one run directory (default `runs/classifier_experiment_1`)
//! and writes:
//! - `scalars.jsonl`: one [`MetricRecord`] per line
//! - `graph.txt`: a text summary of the network
//! - `<tag>.png`: sample images
//! - `<tag>.svg`: one line chart per scalar tag, written on [`RunLogger::close`]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::charts::{generate_line_chart, DataPoint, DataSeries, COLOR_PRIMARY};
use super::error::Result;

/// One scalar observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub tag: String,
    pub step: usize,
    pub value: f64,
    /// RFC 3339 wall-clock time
    pub wall_time: String,
}

impl MetricRecord {
    pub fn new(tag: &str, value: f64, step: usize) -> Self {
        Self {
            tag: tag.to_string(),
            step,
            value,
            wall_time: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Destination for scalar metrics emitted by the training loop
pub trait MetricsSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;
}

/// In-memory sink, mostly useful in tests
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<MetricRecord>,
}

impl MetricsSink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        self.records.push(MetricRecord::new(tag, value, step));
        Ok(())
    }
}

/// File-backed run log
pub struct RunLogger {
    dir: PathBuf,
    scalars: BufWriter<File>,
    series: BTreeMap<String, Vec<DataPoint>>,
}

impl RunLogger {
    /// Create (or append to) the run directory
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        // A rerun into the same directory starts a fresh scalar log
        let file = File::create(dir.join("scalars.jsonl"))?;

        info!("Writing run logs to {}", dir.display());

        Ok(Self {
            dir,
            scalars: BufWriter::new(file),
            series: BTreeMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a text description of the model
    pub fn add_graph(&self, summary: &str) -> Result<()> {
        fs::write(self.dir.join("graph.txt"), summary)?;
        Ok(())
    }

    /// Save an image under `<tag>.png`
    pub fn add_image(&self, tag: &str, image: &RgbImage) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.png", slug(tag)));
        image.save(&path)?;
        debug!("Saved image '{}' to {}", tag, path.display());
        Ok(path)
    }

    /// Flush pending records and draw one chart per scalar tag
    pub fn close(mut self) -> Result<()> {
        self.scalars.flush()?;

        for (tag, points) in &self.series {
            let series = DataSeries {
                name: tag.clone(),
                points: points.clone(),
                color: COLOR_PRIMARY.to_string(),
            };
            let path = self.dir.join(format!("{}.svg", slug(tag)));
            generate_line_chart(tag, "step", tag, &[series], &path)?;
        }

        Ok(())
    }
}

impl MetricsSink for RunLogger {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let record = MetricRecord::new(tag, value, step);
        serde_json::to_writer(&mut self.scalars, &record)?;
        self.scalars.write_all(b"\n")?;

        self.series.entry(tag.to_string()).or_default().push(DataPoint {
            x: step as f64,
            y: value,
        });
        Ok(())
    }
}

/// File-name friendly form of a tag: "training loss" -> "training_loss"
fn slug(tag: &str) -> String {
    tag.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
