//! Engine configuration.
//!
//! Every numeric threshold used by the comparator, the detector and the
//! accessibility scorer lives here so it can be tuned and recorded alongside
//! results instead of being buried in the algorithms.

use crate::result::{PageDiffError, PageDiffResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for [`crate::ImageComparator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Side length of the square SSIM window (pixels)
    pub ssim_window: u32,
    /// Per-channel difference (0-255) above which a pixel counts as changed
    pub noise_threshold: u8,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            ssim_window: 7,
            noise_threshold: 10,
        }
    }
}

impl ComparatorConfig {
    /// Set the SSIM window size
    #[must_use]
    pub const fn with_ssim_window(mut self, window: u32) -> Self {
        self.ssim_window = window;
        self
    }

    /// Set the noise threshold
    #[must_use]
    pub const fn with_noise_threshold(mut self, threshold: u8) -> Self {
        self.noise_threshold = threshold;
        self
    }
}

/// Settings for [`crate::DifferenceDetector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Per-channel difference (0-255) above which a pixel enters the change mask
    pub noise_threshold: u8,
    /// Components with fewer changed pixels are discarded as noise
    pub min_region_area: u32,
    /// Boxes closer than this (pixels) are merged into one region
    pub merge_distance: u32,
    /// Changed-pixel fill ratio above which a region is major
    pub major_fill_ratio: f64,
    /// Changed-pixel fill ratio at or above which a region is moderate
    pub moderate_fill_ratio: f64,
    /// Luma gradient magnitude that counts as an edge
    pub edge_threshold: f64,
    /// Aspect ratio (long side / short side) for a box to count as thin
    pub layout_aspect_ratio: f64,
    /// Edge density above which a thin box is a layout change
    pub layout_edge_density: f64,
    /// Edge density above which a box is treated as text
    pub text_edge_density: f64,
    /// Search radius (pixels) used to detect shifted content
    pub shift_search_radius: u32,
    /// Shifted error must fall below this fraction of the unshifted error
    pub shift_match_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 10,
            min_region_area: 16,
            merge_distance: 8,
            major_fill_ratio: 0.60,
            moderate_fill_ratio: 0.25,
            edge_threshold: 48.0,
            layout_aspect_ratio: 4.0,
            layout_edge_density: 0.30,
            text_edge_density: 0.12,
            shift_search_radius: 6,
            shift_match_ratio: 0.25,
        }
    }
}

impl DetectorConfig {
    /// Set the noise threshold
    #[must_use]
    pub const fn with_noise_threshold(mut self, threshold: u8) -> Self {
        self.noise_threshold = threshold;
        self
    }

    /// Set the minimum region area
    #[must_use]
    pub const fn with_min_region_area(mut self, area: u32) -> Self {
        self.min_region_area = area;
        self
    }

    /// Set the merge distance
    #[must_use]
    pub const fn with_merge_distance(mut self, distance: u32) -> Self {
        self.merge_distance = distance;
        self
    }
}

/// Deduction per issue severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    /// Critical issue deduction
    pub critical: f64,
    /// Serious issue deduction
    pub serious: f64,
    /// Moderate issue deduction
    pub moderate: f64,
    /// Minor issue deduction
    pub minor: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 25.0,
            serious: 15.0,
            moderate: 8.0,
            minor: 3.0,
        }
    }
}

/// Weight of each WCAG principle in the overall compliance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    /// Perceivable weight
    pub perceivable: f64,
    /// Operable weight
    pub operable: f64,
    /// Understandable weight
    pub understandable: f64,
    /// Robust weight
    pub robust: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            perceivable: 0.25,
            operable: 0.25,
            understandable: 0.25,
            robust: 0.25,
        }
    }
}

impl CategoryWeights {
    /// Sum of all weights
    #[must_use]
    pub fn total(&self) -> f64 {
        self.perceivable + self.operable + self.understandable + self.robust
    }
}

/// Settings for [`crate::AccessibilityAnalyzer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityConfig {
    /// Deduction per issue severity
    pub severity_weights: SeverityWeights,
    /// Weight of each category in the overall score
    pub category_weights: CategoryWeights,
    /// Minimum contrast ratio for normal text (WCAG 2.1 AA)
    pub min_contrast_normal: f32,
    /// Minimum contrast ratio for large text (WCAG 2.1 AA)
    pub min_contrast_large: f32,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            severity_weights: SeverityWeights::default(),
            category_weights: CategoryWeights::default(),
            min_contrast_normal: 4.5,
            min_contrast_large: 3.0,
        }
    }
}

/// What to do when the two images differ in size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Abort the run with a dimension mismatch error
    #[default]
    Reject,
    /// Resize both images to the smaller common size before comparing
    ResizeToSmaller,
}

/// Settings for [`crate::AnalysisOrchestrator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Policy applied to mismatched image sizes
    pub dimension_policy: DimensionPolicy,
    /// Score delta (points) inside which two pages count as unchanged
    pub assessment_tolerance: f64,
    /// Analyze the two pages on separate threads
    pub parallel_accessibility: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dimension_policy: DimensionPolicy::Reject,
            assessment_tolerance: 2.0,
            parallel_accessibility: true,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Image comparison settings
    pub comparator: ComparatorConfig,
    /// Difference detection settings
    pub detector: DetectorConfig,
    /// Accessibility scoring settings
    pub accessibility: AccessibilityConfig,
    /// Pipeline settings
    pub orchestrator: OrchestratorConfig,
}

impl AnalysisConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dimension policy
    #[must_use]
    pub const fn with_dimension_policy(mut self, policy: DimensionPolicy) -> Self {
        self.orchestrator.dimension_policy = policy;
        self
    }

    /// Set the comparator settings
    #[must_use]
    pub fn with_comparator(mut self, comparator: ComparatorConfig) -> Self {
        self.comparator = comparator;
        self
    }

    /// Set the detector settings
    #[must_use]
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Set the accessibility settings
    #[must_use]
    pub fn with_accessibility(mut self, accessibility: AccessibilityConfig) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Parse YAML configuration
    pub fn from_yaml_str(text: &str) -> PageDiffResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json_str(text: &str) -> PageDiffResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a `.yaml`, `.yml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> PageDiffResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(PageDiffError::config(format!(
                "Unsupported config format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> PageDiffResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> PageDiffResult<()> {
        if self.comparator.ssim_window < 2 {
            return Err(PageDiffError::config("ssim_window must be at least 2"));
        }

        let d = &self.detector;
        for (name, ratio) in [
            ("major_fill_ratio", d.major_fill_ratio),
            ("moderate_fill_ratio", d.moderate_fill_ratio),
            ("layout_edge_density", d.layout_edge_density),
            ("text_edge_density", d.text_edge_density),
            ("shift_match_ratio", d.shift_match_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(PageDiffError::config(format!(
                    "{name} must be within [0, 1], got {ratio}"
                )));
            }
        }
        if d.moderate_fill_ratio > d.major_fill_ratio {
            return Err(PageDiffError::config(
                "moderate_fill_ratio must not exceed major_fill_ratio",
            ));
        }
        if !(d.layout_aspect_ratio >= 1.0) {
            return Err(PageDiffError::config("layout_aspect_ratio must be >= 1"));
        }

        let a = &self.accessibility;
        let w = &a.severity_weights;
        if [w.critical, w.serious, w.moderate, w.minor]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(PageDiffError::config(
                "severity weights must be finite and non-negative",
            ));
        }
        let c = &a.category_weights;
        if [c.perceivable, c.operable, c.understandable, c.robust]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
            || c.total() <= 0.0
        {
            return Err(PageDiffError::config(
                "category weights must be non-negative with a positive sum",
            ));
        }
        if !(a.min_contrast_normal >= 1.0 && a.min_contrast_large >= 1.0) {
            return Err(PageDiffError::config("contrast minimums must be >= 1"));
        }

        let tolerance = self.orchestrator.assessment_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(PageDiffError::config(
                "assessment_tolerance must be finite and non-negative",
            ));
        }
        Ok(())
    }
}
