//! The aggregate produced by one analysis run, and its failure counterpart.

use crate::accessibility::WcagComparison;
use crate::comparator::ComparisonMetrics;
use crate::config::DimensionPolicy;
use crate::detector::DifferenceRegion;
use crate::result::{ErrorKind, PageDiffError, PageDiffResult};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Every sub-analysis succeeded
    Complete,
    /// Metrics are valid but some accessibility analysis degraded
    Partial,
    /// The run aborted; see [`FailureReport`]
    Failed,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Everything one successful run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Similarity metrics
    pub metrics: ComparisonMetrics,
    /// Regions of change, most severe first
    pub regions: Vec<DifferenceRegion>,
    /// Accessibility reports, when markup was supplied
    #[serde(default)]
    pub wcag_analysis: Option<WcagComparison>,
    /// Wall-clock seconds from image comparison to aggregation, one decimal
    pub duration_seconds: f64,
    /// Local time the run finished
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// `complete` or `partial`
    pub status: AnalysisStatus,
    /// Reasons behind a `partial` status
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Policy that was in force for mismatched sizes
    #[serde(default)]
    pub dimension_policy: DimensionPolicy,
    /// Accessibility rule set version
    #[serde(default)]
    pub rule_set: String,
    /// Size of the compared images, `[width, height]`
    pub image_size: [u32; 2],
}

impl AnalysisResult {
    /// Check the result against the data model invariants
    pub fn validate(&self) -> PageDiffResult<()> {
        self.metrics
            .validate()
            .map_err(|e| PageDiffError::input(format!("invalid metrics: {e}")))?;

        if self.status == AnalysisStatus::Failed {
            return Err(PageDiffError::input(
                "a failed run has no analysis result",
            ));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(PageDiffError::input(format!(
                "invalid duration_seconds {}",
                self.duration_seconds
            )));
        }

        let [width, height] = self.image_size;
        if let Some(region) = self
            .regions
            .iter()
            .find(|r| !r.bounding_box.within(width, height))
        {
            return Err(PageDiffError::input(format!(
                "region {:?} lies outside the {width}x{height} image",
                <[u32; 4]>::from(region.bounding_box)
            )));
        }
        if self.metrics.is_identical() && !self.regions.is_empty() {
            return Err(PageDiffError::input(
                "identical images cannot have difference regions",
            ));
        }

        if let Some(wcag) = &self.wcag_analysis {
            wcag.url1.validate()?;
            wcag.url2.validate()?;
        }
        Ok(())
    }

    /// Serialize after validating
    pub fn to_json_pretty(&self) -> PageDiffResult<String> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate
    pub fn from_json(json: &str) -> PageDiffResult<Self> {
        let result: Self = serde_json::from_str(json)?;
        result.validate()?;
        Ok(result)
    }
}

/// What consumers store in place of a result when a run fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Always `failed`
    pub status: AnalysisStatus,
    /// Human-readable reason
    pub reason: String,
    /// Error category
    pub kind: ErrorKind,
    /// Local time of the failure
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl FailureReport {
    /// Describe an error
    #[must_use]
    pub fn from_error(error: &PageDiffError) -> Self {
        Self {
            status: AnalysisStatus::Failed,
            reason: error.to_string(),
            kind: error.kind(),
            timestamp: now(),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> PageDiffResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Current local time, truncated to whole seconds
#[must_use]
pub fn now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// `YYYY-MM-DD HH:MM:SS`
mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, FORMAT).map_err(serde::de::Error::custom)
    }
}
