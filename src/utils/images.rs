//! Conversions between CHW pixel buffers and `image` buffers
//!
//! Shared by the run log (sample grid) and the inference demo (per-sample PNGs).

use image::{imageops, Rgb, RgbImage};

/// Build an RGB image from channel-major bytes (`[R..., G..., B...]`)
pub fn rgb_from_chw(pixels: &[u8], width: u32, height: u32) -> RgbImage {
    let plane = (width * height) as usize;
    debug_assert_eq!(pixels.len(), 3 * plane);

    RgbImage::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize;
        Rgb([pixels[i], pixels[plane + i], pixels[2 * plane + i]])
    })
}

/// Nearest-neighbour upscale, keeps 32x32 samples readable
pub fn upscale(image: &RgbImage, factor: u32) -> RgbImage {
    imageops::resize(
        image,
        image.width() * factor,
        image.height() * factor,
        imageops::FilterType::Nearest,
    )
}

/// Tile images into a grid, `per_row` wide with `padding` pixels between tiles
///
/// All images must share the dimensions of the first one. Padding is black.
pub fn make_grid(images: &[RgbImage], per_row: usize, padding: u32) -> RgbImage {
    let Some(first) = images.first() else {
        return RgbImage::new(0, 0);
    };
    let per_row = per_row.max(1).min(images.len());
    let rows = images.len().div_ceil(per_row);

    let (tile_w, tile_h) = (first.width() + padding, first.height() + padding);
    let mut grid = RgbImage::new(
        tile_w * per_row as u32 + padding,
        tile_h * rows as u32 + padding,
    );

    for (i, img) in images.iter().enumerate() {
        let col = (i % per_row) as i64;
        let row = (i / per_row) as i64;
        imageops::replace(
            &mut grid,
            img,
            col * tile_w as i64 + padding as i64,
            row * tile_h as i64 + padding as i64,
        );
    }

    grid
}
