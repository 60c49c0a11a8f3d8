//! Binarization: reduce a color raster to pure black and white.
//!
//! Three strategies are available through
//! [`ThresholdAlgorithm`](crate::types::ThresholdAlgorithm):
//!
//! - **Otsu**: one global cut maximizing the between-class variance of
//!   the luminance histogram.
//! - **Median-Otsu**: a 3x3 median filter suppresses speckle, then Otsu.
//! - **Adaptive**: each pixel is compared against a Gaussian-weighted
//!   mean of its 11x11 neighbourhood minus a small offset. Pixels too
//!   close to the border for a full window use the global Otsu cut.
//!
//! A manual value in the config replaces the computed cut. Median-Otsu
//! still smooths first, so the manual cut applies to the filtered image.
//!
//! A pixel becomes white iff its luminance is strictly greater than the
//! cut; everything else becomes black.

use image::{GrayImage, Rgba};
use serde::{Deserialize, Serialize};

use crate::decode::to_luma;
use crate::types::{RgbaImage, ThresholdAlgorithm, ThresholdConfig};

/// Pure black output pixel.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Pure white output pixel.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Otsu's result when no candidate ever improves the variance
/// (for example a single-valued histogram).
pub const OTSU_FALLBACK: u8 = 128;

/// Half-width of the adaptive window (an 11x11 block).
const ADAPTIVE_RADIUS: u32 = 5;

/// Gaussian sigma for an 11-pixel window, `0.3 * ((11 - 1) / 2 - 1) + 0.8`.
const ADAPTIVE_SIGMA: f32 = 2.0;

/// Offset subtracted from the local mean.
const ADAPTIVE_OFFSET: f64 = 2.0;

/// The luminance cut that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdUsed {
    /// A single computed cut (Otsu or Median-Otsu).
    Global(u8),
    /// The caller-supplied cut.
    Manual(f64),
    /// Local cuts, with the global cut used along the image border.
    Adaptive {
        /// Global Otsu cut applied within half a window of the border.
        border: u8,
    },
}

impl ThresholdUsed {
    /// The representative cut value for reporting.
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Self::Global(t) | Self::Adaptive { border: t } => f64::from(t),
            Self::Manual(t) => t,
        }
    }
}

/// A black/white raster and the threshold that produced it.
#[derive(Debug, Clone)]
pub struct Binarized {
    /// Raster containing only [`BLACK`] and [`WHITE`] pixels.
    pub raster: RgbaImage,
    /// The cut that was applied.
    pub threshold: ThresholdUsed,
}

/// Binarize `image` according to `config`.
///
/// `config` is assumed to be validated; see
/// [`ThresholdConfig::validate`].
#[must_use = "returns the binarized raster"]
pub fn binarize(image: &RgbaImage, config: &ThresholdConfig) -> Binarized {
    let mut gray = to_luma(image);
    if config.algorithm == ThresholdAlgorithm::MedianOtsu {
        gray = imageproc::filter::median_filter(&gray, 1, 1);
    }

    if let Some(cut) = config.manual_value {
        return Binarized {
            raster: apply_global_cut(&gray, cut),
            threshold: ThresholdUsed::Manual(cut),
        };
    }

    match config.algorithm {
        ThresholdAlgorithm::Otsu | ThresholdAlgorithm::MedianOtsu => {
            let t = otsu_threshold(&histogram(&gray));
            Binarized {
                raster: apply_global_cut(&gray, f64::from(t)),
                threshold: ThresholdUsed::Global(t),
            }
        }
        ThresholdAlgorithm::Adaptive => {
            let border = otsu_threshold(&histogram(&gray));
            Binarized {
                raster: adaptive(&gray, border),
                threshold: ThresholdUsed::Adaptive { border },
            }
        }
    }
}

/// Build a 256-bin luminance histogram.
#[must_use]
pub fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for pixel in gray.pixels() {
        bins[usize::from(pixel.0[0])] += 1;
    }
    bins
}

/// Otsu's method: the cut maximizing `wB * wF * (mB - mF)^2`.
///
/// Candidates where the background class is still empty are skipped,
/// and the scan stops once the foreground class becomes empty, so no
/// division by zero can occur. Returns [`OTSU_FALLBACK`] if no
/// candidate produces a positive variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn otsu_threshold(bins: &[u64; 256]) -> u8 {
    let total: u64 = bins.iter().sum();
    let weighted_sum: f64 = (0u8..=255)
        .zip(bins)
        .map(|(t, &count)| f64::from(t) * count as f64)
        .sum();

    let mut background_sum = 0.0;
    let mut background_weight = 0u64;
    let mut best_variance = 0.0;
    let mut threshold = OTSU_FALLBACK;

    for (t, &count) in (0u8..=255).zip(bins) {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += f64::from(t) * count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight as f64;
        let diff = background_mean - foreground_mean;
        let variance = background_weight as f64 * foreground_weight as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            threshold = t;
        }
    }

    threshold
}

/// Map every pixel to white iff its luminance exceeds `cut`.
fn apply_global_cut(gray: &GrayImage, cut: f64) -> RgbaImage {
    RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
        classify(gray.get_pixel(x, y).0[0], cut)
    })
}

/// Gaussian-weighted local mean threshold with a global border fallback.
fn adaptive(gray: &GrayImage, border: u8) -> RgbaImage {
    let (w, h) = gray.dimensions();
    let local_mean = imageproc::filter::gaussian_blur_f32(gray, ADAPTIVE_SIGMA);
    let near_border = |x: u32, y: u32| {
        x < ADAPTIVE_RADIUS
            || y < ADAPTIVE_RADIUS
            || x + ADAPTIVE_RADIUS >= w
            || y + ADAPTIVE_RADIUS >= h
    };

    RgbaImage::from_fn(w, h, |x, y| {
        let cut = if near_border(x, y) {
            f64::from(border)
        } else {
            f64::from(local_mean.get_pixel(x, y).0[0]) - ADAPTIVE_OFFSET
        };
        classify(gray.get_pixel(x, y).0[0], cut)
    })
}

fn classify(lum: u8, cut: f64) -> Rgba<u8> {
    if f64::from(lum) > cut { WHITE } else { BLACK }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn is_pure_binary(raster: &RgbaImage) -> bool {
        raster.pixels().all(|p| *p == BLACK || *p == WHITE)
    }

    /// White background with a dark disc of radius `r` at the center.
    fn disc_image(size: u32, r: f64, ink: u8) -> RgbaImage {
        let c = f64::from(size) / 2.0;
        RgbaImage::from_fn(size, size, |x, y| {
            let dx = f64::from(x) + 0.5 - c;
            let dy = f64::from(y) + 0.5 - c;
            if dx.hypot(dy) <= r {
                Rgba([ink, ink, ink, 255])
            } else {
                Rgba([250, 250, 250, 255])
            }
        })
    }

    #[test]
    fn otsu_uniform_histogram_falls_back() {
        let mut bins = [0u64; 256];
        bins[77] = 1000;
        assert_eq!(otsu_threshold(&bins), OTSU_FALLBACK);
    }

    #[test]
    fn otsu_empty_histogram_falls_back() {
        assert_eq!(otsu_threshold(&[0u64; 256]), OTSU_FALLBACK);
    }

    #[test]
    fn otsu_two_clusters_separates_them() {
        let mut bins = [0u64; 256];
        for t in 20..40 {
            bins[t] = 50;
        }
        for t in 200..230 {
            bins[t] = 80;
        }
        let t = otsu_threshold(&bins);
        assert!((39..200).contains(&t), "threshold {t} should split clusters");
    }

    #[test]
    fn otsu_is_deterministic() {
        let img = disc_image(64, 12.0, 30);
        let bins = histogram(&to_luma(&img));
        let first = otsu_threshold(&bins);
        for _ in 0..5 {
            assert_eq!(otsu_threshold(&bins), first);
        }
    }

    #[test]
    fn otsu_preserves_disc() {
        let img = disc_image(64, 12.0, 30);
        let result = binarize(&img, &ThresholdConfig::default());
        assert!(is_pure_binary(&result.raster));
        assert_eq!(*result.raster.get_pixel(32, 32), BLACK);
        assert_eq!(*result.raster.get_pixel(2, 2), WHITE);
        let t = result.threshold.value();
        assert!((30.0..250.0).contains(&t), "threshold {t}");
    }

    #[test]
    fn manual_value_overrides_algorithm() {
        let img = RgbaImage::from_fn(4, 1, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 80) as u8;
            Rgba([v, v, v, 255])
        });
        let config = ThresholdConfig {
            manual_value: Some(100.0),
            algorithm: ThresholdAlgorithm::Adaptive,
            ..ThresholdConfig::default()
        };
        let result = binarize(&img, &config);
        assert_eq!(result.threshold, ThresholdUsed::Manual(100.0));
        // 0, 80 -> black; 160, 240 -> white
        assert_eq!(*result.raster.get_pixel(0, 0), BLACK);
        assert_eq!(*result.raster.get_pixel(1, 0), BLACK);
        assert_eq!(*result.raster.get_pixel(2, 0), WHITE);
        assert_eq!(*result.raster.get_pixel(3, 0), WHITE);
    }

    #[test]
    fn manual_cut_is_strict() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        let config = ThresholdConfig {
            manual_value: Some(128.0),
            ..ThresholdConfig::default()
        };
        assert_eq!(*binarize(&img, &config).raster.get_pixel(0, 0), BLACK);
    }

    #[test]
    fn median_otsu_removes_isolated_speckle() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        for y in 0..20 {
            for x in 0..8 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        img.put_pixel(15, 10, Rgba([0, 0, 0, 255]));

        let plain = binarize(&img, &ThresholdConfig::default());
        assert_eq!(*plain.raster.get_pixel(15, 10), BLACK);

        let config = ThresholdConfig {
            algorithm: ThresholdAlgorithm::MedianOtsu,
            ..ThresholdConfig::default()
        };
        let smoothed = binarize(&img, &config);
        assert!(is_pure_binary(&smoothed.raster));
        assert_eq!(*smoothed.raster.get_pixel(15, 10), WHITE);
        assert_eq!(*smoothed.raster.get_pixel(3, 10), BLACK);

        let manual = ThresholdConfig {
            manual_value: Some(128.0),
            ..config
        };
        let cut = binarize(&img, &manual);
        assert_eq!(cut.threshold, ThresholdUsed::Manual(128.0));
        assert_eq!(*cut.raster.get_pixel(15, 10), WHITE);
        assert_eq!(*cut.raster.get_pixel(3, 10), BLACK);

        let unsmoothed = ThresholdConfig {
            algorithm: ThresholdAlgorithm::Otsu,
            ..manual
        };
        assert_eq!(*binarize(&img, &unsmoothed).raster.get_pixel(15, 10), BLACK);
    }

    #[test]
    fn adaptive_handles_uneven_lighting() {
        // Horizontal lighting gradient with a dark stroke in the bright
        // half and one in the dim half.
        let img = RgbaImage::from_fn(60, 30, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            let base = (100 + x * 2) as u8;
            let v = if x == 15 || x == 45 { base - 60 } else { base };
            Rgba([v, v, v, 255])
        });
        let config = ThresholdConfig {
            algorithm: ThresholdAlgorithm::Adaptive,
            ..ThresholdConfig::default()
        };
        let result = binarize(&img, &config);
        assert!(is_pure_binary(&result.raster));
        assert!(matches!(result.threshold, ThresholdUsed::Adaptive { .. }));
        assert_eq!(*result.raster.get_pixel(15, 15), BLACK);
        assert_eq!(*result.raster.get_pixel(45, 15), BLACK);
        assert_eq!(*result.raster.get_pixel(30, 15), WHITE);
    }

    #[test]
    fn adaptive_border_uses_global_cut() {
        let img = disc_image(40, 8.0, 20);
        let config = ThresholdConfig {
            algorithm: ThresholdAlgorithm::Adaptive,
            ..ThresholdConfig::default()
        };
        let result = binarize(&img, &config);
        // Border pixels of a flat background stay white under the global cut.
        for x in 0..40 {
            assert_eq!(*result.raster.get_pixel(x, 0), WHITE);
            assert_eq!(*result.raster.get_pixel(x, 39), WHITE);
        }
    }

    #[test]
    fn adaptive_on_tiny_image_is_all_border() {
        let img = RgbaImage::from_fn(6, 6, |x, _| {
            if x < 3 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let config = ThresholdConfig {
            algorithm: ThresholdAlgorithm::Adaptive,
            ..ThresholdConfig::default()
        };
        let result = binarize(&img, &config);
        assert_eq!(*result.raster.get_pixel(0, 0), BLACK);
        assert_eq!(*result.raster.get_pixel(5, 5), WHITE);
    }
}
