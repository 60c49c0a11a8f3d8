//! Image decoding and luminance conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGBA
//! raster. Transparent regions are flattened to opaque white so that
//! they read as background during binarization.
//!
//! This is the first step in the pipeline: raw bytes in, `RgbaImage` out.

use image::{GrayImage, Luma, Rgba};

use crate::types::{PipelineError, RgbaImage};

/// Alpha below this value is treated as fully transparent.
const ALPHA_CUTOFF: u8 = 128;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Decode raw image bytes into an RGBA raster.
///
/// Supports whatever formats the `image` crate was built with. Pixels
/// with alpha below 128 become opaque white; all other pixels keep
/// their color with alpha forced to 255.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_to_raster(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut raster = image::load_from_memory(bytes)?.to_rgba8();
    for pixel in raster.pixels_mut() {
        if pixel.0[3] < ALPHA_CUTOFF {
            *pixel = WHITE;
        } else {
            pixel.0[3] = 255;
        }
    }
    Ok(raster)
}

/// Perceptual luminance of a pixel: `0.299*R + 0.587*G + 0.114*B`,
/// rounded to the nearest integer.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luminance(pixel: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    let lum = 0.114f64.mul_add(
        f64::from(b),
        0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
    );
    lum.round().clamp(0.0, 255.0) as u8
}

/// Convert an RGBA raster into a single-channel luminance image.
#[must_use = "returns the luminance image"]
pub fn to_luma(raster: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
        Luma([luminance(raster.get_pixel(x, y))])
    })
}
