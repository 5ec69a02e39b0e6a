//! Fixed per-channel normalization
//!
//! Pixels are first scaled to `[0, 1]` and then shifted and scaled per channel:
//! `x' = (x - mean) / std`. The same transform is used for training, evaluation and
//! the demo, and its inverse recovers displayable pixels.
//!
//! Slice functions take one or more whole images laid out channel-major, back to back.

use burn::tensor::{backend::Backend, Tensor, TensorData};

use super::{CHANNELS, IMAGE_BYTES, IMAGE_SIZE};
use crate::utils::error::{ClassifierError, Result};

const PLANE: usize = IMAGE_SIZE * IMAGE_SIZE;

/// Per-channel affine normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    pub mean: [f32; CHANNELS],
    pub std: [f32; CHANNELS],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            mean: [0.5; CHANNELS],
            std: [0.5; CHANNELS],
        }
    }
}

impl Normalizer {
    pub fn new(mean: [f32; CHANNELS], std: [f32; CHANNELS]) -> Self {
        Self { mean, std }
    }

    /// Normalize channel-major values already scaled to `[0, 1]`
    pub fn normalize(&self, values: &[f32]) -> Result<Vec<f32>> {
        check_whole_images(values.len())?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let c = channel_of(i);
                (v - self.mean[c]) / self.std[c]
            })
            .collect())
    }

    /// Inverse of [`Normalizer::normalize`]
    pub fn unnormalize(&self, values: &[f32]) -> Result<Vec<f32>> {
        check_whole_images(values.len())?;
        Ok(values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let c = channel_of(i);
                v * self.std[c] + self.mean[c]
            })
            .collect())
    }

    /// Scale raw bytes to `[0, 1]` and normalize
    pub fn normalize_bytes(&self, pixels: &[u8]) -> Result<Vec<f32>> {
        let scaled: Vec<f32> = pixels.iter().map(|&p| p as f32 / 255.0).collect();
        self.normalize(&scaled)
    }

    /// Undo normalization and quantize back to bytes for display
    pub fn unnormalize_to_bytes(&self, values: &[f32]) -> Result<Vec<u8>> {
        Ok(self
            .unnormalize(values)?
            .into_iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect())
    }

    /// Normalize a `[N, 3, H, W]` tensor of values in `[0, 1]`
    pub fn normalize_tensor<B: Backend>(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = images.device();
        let mean = Tensor::from_data(TensorData::new(self.mean.to_vec(), [1, CHANNELS, 1, 1]), &device);
        let std = Tensor::from_data(TensorData::new(self.std.to_vec(), [1, CHANNELS, 1, 1]), &device);
        (images - mean) / std
    }
}

/// Channel of the `i`-th value in a buffer of back-to-back images
fn channel_of(i: usize) -> usize {
    (i % IMAGE_BYTES) / PLANE
}

fn check_whole_images(len: usize) -> Result<()> {
    if len % IMAGE_BYTES != 0 {
        return Err(ClassifierError::InvalidInput(format!(
            "expected a multiple of {} values, got {}",
            IMAGE_BYTES, len
        )));
    }
    Ok(())
}
