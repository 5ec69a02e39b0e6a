//! Terminal and PNG rendering of samples
//!
//! Images are drawn with the upper-half-block character: each terminal cell shows two
//! vertically stacked pixels, the top one as foreground and the bottom one as
//! background colour.

use std::fs;
use std::path::{Path, PathBuf};

use burn::tensor::{backend::Backend, Tensor};
use colored::Colorize;
use image::RgbImage;

use crate::dataset::{class_name, Normalizer, IMAGE_BYTES, IMAGE_SIZE};
use crate::utils::error::Result;
use crate::utils::images::{rgb_from_chw, upscale};

/// Scale factor for saved sample PNGs
pub const SAVE_SCALE: u32 = 8;

/// Undo normalization on a `[N, 3, 32, 32]` batch and convert each sample to an image
pub fn batch_to_images<B: Backend>(images: Tensor<B, 4>, normalizer: &Normalizer) -> Result<Vec<RgbImage>> {
    let values: Vec<f32> = images.into_data().iter::<f32>().collect();
    let pixels = normalizer.unnormalize_to_bytes(&values)?;

    Ok(pixels
        .chunks_exact(IMAGE_BYTES)
        .map(|chunk| rgb_from_chw(chunk, IMAGE_SIZE as u32, IMAGE_SIZE as u32))
        .collect())
}

/// Title shown above each demo sample
pub fn title_line(label: usize, predicted: usize, elapsed_ms: u64) -> String {
    format!(
        "label:{}, predict:{}, elapsed_time:{}ms",
        class_name(label).unwrap_or("?"),
        class_name(predicted).unwrap_or("?"),
        elapsed_ms
    )
}

/// Render an image as rows of true-colour half blocks
pub fn render_terminal(image: &RgbImage) -> String {
    let (width, height) = image.dimensions();
    let mut out = String::new();

    for y in (0..height).step_by(2) {
        for x in 0..width {
            let top = image.get_pixel(x, y);
            let cell = "▀".truecolor(top[0], top[1], top[2]);
            let cell = if y + 1 < height {
                let bottom = image.get_pixel(x, y + 1);
                cell.on_truecolor(bottom[0], bottom[1], bottom[2])
            } else {
                cell
            };
            out.push_str(&cell.to_string());
        }
        out.push('\n');
    }

    out
}

/// File name of a saved sample, e.g. `00042_cat_dog.png`
pub fn sample_file_name(index: usize, label: usize, predicted: usize) -> String {
    format!(
        "{:05}_{}_{}.png",
        index,
        class_name(label).unwrap_or("unknown"),
        class_name(predicted).unwrap_or("unknown")
    )
}

/// Save an upscaled copy of a sample under `dir`
pub fn save_sample(dir: &Path, index: usize, label: usize, predicted: usize, image: &RgbImage) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(sample_file_name(index, label, predicted));
    upscale(image, SAVE_SCALE).save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use image::Rgb;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_title_line() {
        assert_eq!(title_line(3, 5, 12), "label:cat, predict:dog, elapsed_time:12ms");
    }

    #[test]
    fn test_sample_file_name() {
        assert_eq!(sample_file_name(42, 0, 9), "00042_plane_truck.png");
    }

    #[test]
    fn test_batch_to_images_unnormalizes() {
        let device = Default::default();
        // -1.0 normalized is black, 1.0 is white
        let mut values = vec![-1.0f32; IMAGE_BYTES];
        values.extend(vec![1.0f32; IMAGE_BYTES]);
        let images = Tensor::<TestBackend, 4>::from_data(TensorData::new(values, [2, 3, 32, 32]), &device);

        let out = batch_to_images(images, &Normalizer::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(*out[0].get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out[1].get_pixel(31, 31), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_render_terminal_rows() {
        colored::control::set_override(true);
        let image = RgbImage::from_pixel(4, 5, Rgb([10, 20, 30]));
        let text = render_terminal(&image);

        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.matches('▀').count(), 12);
    }

    #[test]
    fn test_save_sample() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(32, 32, Rgb([1, 2, 3]));
        let path = save_sample(dir.path(), 1, 2, 3, &image).unwrap();

        assert!(path.ends_with("00001_bird_cat.png"));
        let saved = image::open(&path).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (32 * SAVE_SCALE, 32 * SAVE_SCALE));
    }
}
