//! Pagediff: rendered web page comparison engine
//!
//! Takes two captured page images (plus optional markup or DOM snapshots) and
//! produces one [`AnalysisResult`]: similarity metrics, regions of visual
//! change and a WCAG compliance comparison.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌─────────────────┐   ┌────────────────────┐
//! │ PageImage x2  │──►│ ImageComparator │──►│ DifferenceDetector │──┐
//! └───────────────┘   └─────────────────┘   └────────────────────┘  │
//! ┌───────────────┐   ┌───────────────────────┐                     ▼
//! │ PageMarkup x2 │──►│ AccessibilityAnalyzer │──────────► AnalysisResult
//! └───────────────┘   └───────────────────────┘
//!          (all driven by AnalysisOrchestrator)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pagediff::{AnalysisOrchestrator, PageImage, PageMarkup};
//!
//! # fn main() -> pagediff::PageDiffResult<()> {
//! let reference = PageImage::open("before.png")?;
//! let candidate = PageImage::open("after.png")?;
//! let markup = PageMarkup::open("after.html")?;
//!
//! let result = AnalysisOrchestrator::default().run(&reference, &candidate, None, Some(&markup))?;
//! println!("{}", result.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[allow(
    clippy::cast_precision_loss,
    clippy::doc_markdown,
    clippy::must_use_candidate
)]
pub mod accessibility;
mod analysis;
mod capture;
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops
)]
mod comparator;
mod config;
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
mod detector;
pub mod markup;
#[allow(clippy::cast_possible_truncation)]
mod orchestrator;
mod result;

pub use accessibility::{
    AccessibilityAnalyzer, Assessment, CategoryReport, Color, ComparisonSummary, ComplianceLevel,
    IssueSeverity, WcagCategories, WcagCategory, WcagComparison, WcagIssue, WcagReport,
    RULE_SET_VERSION,
};
pub use analysis::{AnalysisResult, AnalysisStatus, FailureReport};
pub use capture::{
    capture_with_timeout, CapturedPage, FileCapture, PageCapture, PageImage, PageMarkup,
};
pub use comparator::{ComparisonMetrics, ImageComparator, MAX_PIXEL_VALUE, PSNR_IDENTICAL};
pub use config::{
    AccessibilityConfig, AnalysisConfig, CategoryWeights, ComparatorConfig, DetectorConfig,
    DimensionPolicy, OrchestratorConfig, SeverityWeights,
};
pub use detector::{
    BoundingBox, DifferenceDetector, DifferenceRegion, ElementBox, LayoutHints, RegionKind,
    RegionSeverity,
};
pub use markup::{Document, MarkupError};
pub use orchestrator::{AnalysisOrchestrator, AnalysisPhase, CancellationToken};
pub use result::{ErrorKind, PageDiffError, PageDiffResult};
