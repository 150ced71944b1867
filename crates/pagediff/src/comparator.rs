//! Pixel and structural similarity between two equally sized images.
//!
//! - SSIM (Wang et al., 2004) over BT.601 luma with a sliding square window
//! - MSE over the RGB channels
//! - PSNR derived from MSE
//! - Percentage of pixels whose largest channel difference exceeds the noise threshold
//!
//! Alpha is ignored: captured pages are opaque, and two buffers that agree on
//! every RGB channel are treated as identical.

use crate::capture::PageImage;
use crate::config::ComparatorConfig;
use crate::result::{PageDiffError, PageDiffResult};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Maximum representable channel value for 8-bit images
pub const MAX_PIXEL_VALUE: f64 = 255.0;

/// PSNR reported when MSE is exactly zero
pub const PSNR_IDENTICAL: f64 = f64::INFINITY;

// SSIM stabilizing constants (K1 = 0.01, K2 = 0.03, L = 255)
const SSIM_C1: f64 = (0.01 * MAX_PIXEL_VALUE) * (0.01 * MAX_PIXEL_VALUE);
const SSIM_C2: f64 = (0.03 * MAX_PIXEL_VALUE) * (0.03 * MAX_PIXEL_VALUE);

/// Similarity metrics for one image pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    /// Mean windowed SSIM in [0, 1]; 1.0 only for identical images
    pub ssim: f64,
    /// Mean squared error over RGB channels
    pub mse: f64,
    /// Peak signal-to-noise ratio (dB); [`PSNR_IDENTICAL`] when `mse == 0`
    #[serde(with = "psnr_serde")]
    pub psnr: f64,
    /// Percentage (0-100) of changed pixels
    pub pixel_diff_percent: f64,
}

impl ComparisonMetrics {
    /// Metrics of two identical images
    #[must_use]
    pub const fn identical() -> Self {
        Self {
            ssim: 1.0,
            mse: 0.0,
            psnr: PSNR_IDENTICAL,
            pixel_diff_percent: 0.0,
        }
    }

    /// Whether the images were pixel-identical
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.mse == 0.0
    }

    /// Check ranges and the identity invariants
    pub fn validate(&self) -> PageDiffResult<()> {
        if !(0.0..=1.0).contains(&self.ssim) {
            return Err(PageDiffError::computation(format!(
                "ssim out of range: {}",
                self.ssim
            )));
        }
        if !self.mse.is_finite() || self.mse < 0.0 {
            return Err(PageDiffError::computation(format!(
                "mse must be finite and non-negative: {}",
                self.mse
            )));
        }
        if self.psnr.is_nan() || self.psnr < 0.0 {
            return Err(PageDiffError::computation(format!(
                "psnr must be non-negative: {}",
                self.psnr
            )));
        }
        if !(0.0..=100.0).contains(&self.pixel_diff_percent) {
            return Err(PageDiffError::computation(format!(
                "pixel_diff_percent out of range: {}",
                self.pixel_diff_percent
            )));
        }
        let identical = self.mse == 0.0;
        if identical != (self.ssim == 1.0) || identical != (self.pixel_diff_percent == 0.0) {
            return Err(PageDiffError::computation(
                "metrics disagree about whether the images are identical",
            ));
        }
        Ok(())
    }
}

/// JSON has no infinity; an identical pair's PSNR is written as `f64::MAX`
/// and read back as infinity.
mod psnr_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_f64(f64::MAX)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(if value == f64::MAX {
            f64::INFINITY
        } else {
            value
        })
    }
}

/// Largest absolute per-channel RGB difference between two pixels
#[must_use]
pub fn max_channel_diff(a: Rgba<u8>, b: Rgba<u8>) -> u8 {
    let Rgba([r1, g1, b1, _]) = a;
    let Rgba([r2, g2, b2, _]) = b;
    r1.abs_diff(r2).max(g1.abs_diff(g2)).max(b1.abs_diff(b2))
}

/// BT.601 luma of a pixel
#[must_use]
pub fn luma(pixel: Rgba<u8>) -> f64 {
    let Rgba([r, g, b, _]) = pixel;
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Computes [`ComparisonMetrics`] for image pairs
#[derive(Debug, Clone, Default)]
pub struct ImageComparator {
    config: ComparatorConfig,
}

impl ImageComparator {
    /// Create a comparator with configuration
    #[must_use]
    pub const fn new(config: ComparatorConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare two images.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the sizes differ (this never resamples), and
    /// `Computation` if a metric comes out non-finite.
    pub fn compare(
        &self,
        reference: &PageImage,
        candidate: &PageImage,
    ) -> PageDiffResult<ComparisonMetrics> {
        if reference.dimensions() != candidate.dimensions() {
            return Err(PageDiffError::DimensionMismatch {
                reference: reference.dimensions(),
                candidate: candidate.dimensions(),
            });
        }

        let stats = PixelStats::collect(
            reference.pixels(),
            candidate.pixels(),
            self.config.noise_threshold,
        );
        if stats.touched == 0 {
            return Ok(ComparisonMetrics::identical());
        }

        let total = stats.total as f64;
        let mse = stats.squared_error / (total * 3.0);
        let psnr = 10.0 * (MAX_PIXEL_VALUE * MAX_PIXEL_VALUE / mse).log10();

        // A percentage of zero is reserved for identical buffers, so when every
        // difference stays under the noise threshold the raw differing share is
        // reported instead.
        let counted = if stats.changed > 0 {
            stats.changed
        } else {
            stats.touched
        };
        let pixel_diff_percent = counted as f64 / total * 100.0;

        let ssim = windowed_ssim(
            reference.pixels(),
            candidate.pixels(),
            self.config.ssim_window,
        );
        if !ssim.is_finite() {
            return Err(PageDiffError::computation(format!(
                "SSIM evaluated to {ssim}"
            )));
        }
        // Non-identical images never score a perfect 1.0
        let ssim = ssim.clamp(0.0, 1.0 - f64::EPSILON);

        let metrics = ComparisonMetrics {
            ssim,
            mse,
            psnr: psnr.max(0.0),
            pixel_diff_percent,
        };
        metrics.validate()?;
        Ok(metrics)
    }
}

struct PixelStats {
    total: usize,
    touched: usize,
    changed: usize,
    squared_error: f64,
}

impl PixelStats {
    fn collect(reference: &RgbaImage, candidate: &RgbaImage, noise_threshold: u8) -> Self {
        let mut stats = Self {
            total: 0,
            touched: 0,
            changed: 0,
            squared_error: 0.0,
        };
        let mut squared: u64 = 0;

        for (a, b) in reference.pixels().zip(candidate.pixels()) {
            stats.total += 1;
            let diff = max_channel_diff(*a, *b);
            if diff > 0 {
                stats.touched += 1;
                for (ca, cb) in a.0[..3].iter().zip(&b.0[..3]) {
                    let d = u64::from(ca.abs_diff(*cb));
                    squared += d * d;
                }
            }
            if diff > noise_threshold {
                stats.changed += 1;
            }
        }

        stats.squared_error = squared as f64;
        stats
    }
}

/// Summed-area table with one extra leading row and column of zeros
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    fn window(&self, x: usize, y: usize, size: usize) -> f64 {
        let s = self.stride;
        self.sums[(y + size) * s + x + size] - self.sums[y * s + x + size]
            - self.sums[(y + size) * s + x]
            + self.sums[y * s + x]
    }
}

/// Mean SSIM over every `window`×`window` luma window (stride 1).
///
/// Images smaller than the window use a single window covering the shorter side.
fn windowed_ssim(reference: &RgbaImage, candidate: &RgbaImage, window: u32) -> f64 {
    let (width, height) = (reference.width() as usize, reference.height() as usize);
    let size = (window as usize).min(width).min(height).max(1);

    let luma_a: Vec<f64> = reference.pixels().map(|p| luma(*p)).collect();
    let luma_b: Vec<f64> = candidate.pixels().map(|p| luma(*p)).collect();
    let at = |plane: &[f64], x: usize, y: usize| plane[y * width + x];

    let sum_a = Integral::build(width, height, |x, y| at(&luma_a, x, y));
    let sum_b = Integral::build(width, height, |x, y| at(&luma_b, x, y));
    let sum_aa = Integral::build(width, height, |x, y| at(&luma_a, x, y) * at(&luma_a, x, y));
    let sum_bb = Integral::build(width, height, |x, y| at(&luma_b, x, y) * at(&luma_b, x, y));
    let sum_ab = Integral::build(width, height, |x, y| at(&luma_a, x, y) * at(&luma_b, x, y));

    let n = (size * size) as f64;
    let mut total = 0.0;
    let mut windows = 0usize;

    for y in 0..=(height - size) {
        for x in 0..=(width - size) {
            let mean_a = sum_a.window(x, y, size) / n;
            let mean_b = sum_b.window(x, y, size) / n;
            let var_a = sum_aa.window(x, y, size) / n - mean_a * mean_a;
            let var_b = sum_bb.window(x, y, size) / n - mean_b * mean_b;
            let covar = sum_ab.window(x, y, size) / n - mean_a * mean_b;

            let numerator = (2.0 * mean_a * mean_b + SSIM_C1) * (2.0 * covar + SSIM_C2);
            let denominator =
                (mean_a * mean_a + mean_b * mean_b + SSIM_C1) * (var_a + var_b + SSIM_C2);
            total += numerator / denominator;
            windows += 1;
        }
    }

    total / windows as f64
}
