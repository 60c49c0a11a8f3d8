//! Foreground polarity normalization.
//!
//! The tracer treats dark pixels as the design. Designs are assumed to
//! be sparse relative to their background, so a binary raster that is
//! overwhelmingly black most likely has its polarity reversed (for
//! example a white logo on a black card). Such rasters are inverted.
//!
//! Runs exactly once, between binarization and tracing.

use crate::binarize::BLACK;
use crate::types::RgbaImage;

/// Black and white pixel counts of a binary raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBalance {
    /// Number of pure black pixels.
    pub black: u64,
    /// Number of all other pixels.
    pub white: u64,
}

impl PixelBalance {
    /// Count black vs. white pixels.
    #[must_use]
    pub fn of(raster: &RgbaImage) -> Self {
        let black: u64 = raster.pixels().map(|p| u64::from(*p == BLACK)).sum();
        let total = u64::from(raster.width()) * u64::from(raster.height());
        Self {
            black,
            white: total - black,
        }
    }

    /// `true` when black pixels outnumber white ones more than 2:1.
    #[must_use]
    pub const fn is_inverted(self) -> bool {
        self.black > self.white.saturating_mul(2)
    }
}

/// Invert `raster` when its black pixels exceed twice its white pixels.
///
/// Returns the (possibly inverted) raster and whether it was inverted.
#[must_use = "returns the normalized raster"]
pub fn maybe_invert(mut raster: RgbaImage) -> (RgbaImage, bool) {
    if !PixelBalance::of(&raster).is_inverted() {
        return (raster, false);
    }
    for pixel in raster.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [255 - r, 255 - g, 255 - b, a];
    }
    (raster, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::WHITE;

    fn raster_with_black(total: u32, black: u32) -> RgbaImage {
        RgbaImage::from_fn(total, 1, |x, _| if x < black { BLACK } else { WHITE })
    }

    #[test]
    fn sparse_design_is_untouched() {
        let raster = raster_with_black(10, 2);
        let (out, inverted) = maybe_invert(raster.clone());
        assert!(!inverted);
        assert_eq!(out, raster);
    }

    #[test]
    fn exactly_two_to_one_is_untouched() {
        let (_, inverted) = maybe_invert(raster_with_black(9, 6));
        assert!(!inverted);
    }

    #[test]
    fn dominant_black_is_inverted() {
        let (out, inverted) = maybe_invert(raster_with_black(10, 8));
        assert!(inverted);
        let balance = PixelBalance::of(&out);
        assert_eq!(balance, PixelBalance { black: 2, white: 8 });
        assert_eq!(*out.get_pixel(0, 0), WHITE);
        assert_eq!(*out.get_pixel(9, 0), BLACK);
    }

    #[test]
    fn all_black_becomes_all_white() {
        let (out, inverted) = maybe_invert(raster_with_black(5, 5));
        assert!(inverted);
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn single_application_reaches_fixed_point() {
        for black in 0..=12 {
            let (out, _) = maybe_invert(raster_with_black(12, black));
            let balance = PixelBalance::of(&out);
            assert!(
                balance.black <= balance.white * 2,
                "black={black}: {balance:?} still inverted",
            );
            let (again, inverted) = maybe_invert(out.clone());
            assert!(!inverted);
            assert_eq!(again, out);
        }
    }
}
