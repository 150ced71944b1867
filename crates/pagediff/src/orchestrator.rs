//! Analysis pipeline.
//!
//! ```text
//! Pending -> CapturingInputs -> ComparingImages -> DetectingDifferences
//!         -> AnalyzingAccessibility (x2) -> Aggregating -> Complete | Partial | Failed
//! ```
//!
//! Image comparison failures abort the run with an error. Accessibility
//! failures are folded into the per-page reports and downgrade the status to
//! `partial`. Cancellation is checked between phases only.

use crate::accessibility::{
    AccessibilityAnalyzer, Rule, WcagComparison, WcagReport, RULE_SET_VERSION,
};
use crate::analysis::{now, AnalysisResult, AnalysisStatus};
use crate::capture::{capture_with_timeout, PageCapture, PageImage, PageMarkup};
use crate::comparator::ImageComparator;
use crate::config::{AnalysisConfig, DimensionPolicy};
use crate::detector::{DifferenceDetector, ElementBox, LayoutHints};
use crate::markup::{Document, MarkupError};
use crate::result::{PageDiffError, PageDiffResult};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisPhase {
    /// Not started
    Pending,
    /// Acquiring screenshots and markup (external collaborator)
    CapturingInputs,
    /// Computing similarity metrics
    ComparingImages,
    /// Finding regions of change
    DetectingDifferences,
    /// Scoring both pages for accessibility
    AnalyzingAccessibility,
    /// Assembling the result
    Aggregating,
    /// Finished with every sub-analysis intact
    Complete,
    /// Finished with degraded accessibility analysis
    Partial,
    /// Aborted
    Failed,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::CapturingInputs => "capturing inputs",
            Self::ComparingImages => "comparing images",
            Self::DetectingDifferences => "detecting differences",
            Self::AnalyzingAccessibility => "analyzing accessibility",
            Self::Aggregating => "aggregating",
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Cooperative cancellation flag shared between a run and its host
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next phase boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type ParsedMarkup = Option<Result<Document, MarkupError>>;

/// Runs the full comparison of two pages
#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    comparator: ImageComparator,
    detector: DifferenceDetector,
    analyzer: AccessibilityAnalyzer,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::build(AnalysisConfig::default())
    }
}

impl AnalysisOrchestrator {
    /// Create an orchestrator, rejecting invalid configuration
    pub fn new(config: AnalysisConfig) -> PageDiffResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AnalysisConfig) -> Self {
        Self {
            comparator: ImageComparator::new(config.comparator.clone()),
            detector: DifferenceDetector::new(config.detector.clone()),
            analyzer: AccessibilityAnalyzer::new(config.accessibility.clone()),
            config,
        }
    }

    /// Replace the accessibility rule set
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.analyzer = self.analyzer.with_rules(rules);
        self
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Compare two pages.
    ///
    /// Images of different sizes are rejected or resized to the smaller
    /// common size according to [`DimensionPolicy`]. Markup is optional per
    /// page; without any markup no accessibility comparison is produced.
    pub fn run(
        &self,
        reference: &PageImage,
        candidate: &PageImage,
        reference_markup: Option<&PageMarkup>,
        candidate_markup: Option<&PageMarkup>,
    ) -> PageDiffResult<AnalysisResult> {
        self.run_with_cancel(
            reference,
            candidate,
            reference_markup,
            candidate_markup,
            &CancellationToken::new(),
        )
    }

    /// [`run`](Self::run) with a cancellation flag checked between phases
    pub fn run_with_cancel(
        &self,
        reference: &PageImage,
        candidate: &PageImage,
        reference_markup: Option<&PageMarkup>,
        candidate_markup: Option<&PageMarkup>,
        cancel: &CancellationToken,
    ) -> PageDiffResult<AnalysisResult> {
        let span = info_span!(
            "analysis",
            reference = reference.source(),
            candidate = candidate.source()
        );
        let _enter = span.enter();

        let result = self.execute(
            reference,
            candidate,
            reference_markup,
            candidate_markup,
            cancel,
        );
        match &result {
            Ok(analysis) => info!(
                status = %analysis.status,
                regions = analysis.regions.len(),
                ssim = analysis.metrics.ssim,
                duration_seconds = analysis.duration_seconds,
                "analysis finished"
            ),
            Err(e) => warn!(phase = %AnalysisPhase::Failed, error = %e, "analysis failed"),
        }
        result
    }

    /// Acquire both pages through `capture`, then [`run`](Self::run).
    ///
    /// Capture failures and timeouts are input validation errors.
    pub fn run_captured<C>(
        &self,
        capture: &Arc<C>,
        reference_url: &str,
        candidate_url: &str,
        timeout: Duration,
    ) -> PageDiffResult<AnalysisResult>
    where
        C: PageCapture + Send + Sync + 'static,
    {
        debug!(phase = %AnalysisPhase::CapturingInputs, reference_url, candidate_url);
        let reference = capture_with_timeout(capture, reference_url, timeout)?;
        let candidate = capture_with_timeout(capture, candidate_url, timeout)?;
        self.run(
            &reference.image,
            &candidate.image,
            reference.markup.as_ref(),
            candidate.markup.as_ref(),
        )
    }

    fn execute(
        &self,
        reference: &PageImage,
        candidate: &PageImage,
        reference_markup: Option<&PageMarkup>,
        candidate_markup: Option<&PageMarkup>,
        cancel: &CancellationToken,
    ) -> PageDiffResult<AnalysisResult> {
        checkpoint(cancel, AnalysisPhase::ComparingImages)?;
        let started = Instant::now();
        let (reference, candidate, resized) = self.align(reference, candidate)?;
        let metrics = self.comparator.compare(&reference, &candidate)?;
        debug!(
            ssim = metrics.ssim,
            mse = metrics.mse,
            pixel_diff_percent = metrics.pixel_diff_percent,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "images compared"
        );

        checkpoint(cancel, AnalysisPhase::DetectingDifferences)?;
        let parsed_reference: ParsedMarkup = reference_markup.map(Document::parse);
        let parsed_candidate: ParsedMarkup = candidate_markup.map(Document::parse);
        // Element boxes are in original page coordinates; useless after resampling
        let (reference_boxes, candidate_boxes) = if resized {
            (Vec::new(), Vec::new())
        } else {
            (boxes_of(&parsed_reference), boxes_of(&parsed_candidate))
        };
        let regions = self.detector.detect_with_hints(
            &reference,
            &candidate,
            &metrics,
            LayoutHints {
                reference: &reference_boxes,
                candidate: &candidate_boxes,
            },
        )?;

        checkpoint(cancel, AnalysisPhase::AnalyzingAccessibility)?;
        let mut warnings = Vec::new();
        let wcag_analysis = self.analyze_pages(&parsed_reference, &parsed_candidate, &mut warnings);

        checkpoint(cancel, AnalysisPhase::Aggregating)?;
        let status = if warnings.is_empty() {
            AnalysisStatus::Complete
        } else {
            AnalysisStatus::Partial
        };
        let duration_seconds = round_to_tenth(started.elapsed().as_secs_f64());
        let finished = if status == AnalysisStatus::Complete {
            AnalysisPhase::Complete
        } else {
            AnalysisPhase::Partial
        };
        debug!(phase = %finished, "aggregated");

        Ok(AnalysisResult {
            metrics,
            regions,
            wcag_analysis,
            duration_seconds,
            timestamp: now(),
            status,
            warnings,
            dimension_policy: self.config.orchestrator.dimension_policy,
            rule_set: RULE_SET_VERSION.to_string(),
            image_size: [reference.width(), reference.height()],
        })
    }

    /// Apply the dimension policy. Returns the images to compare and whether
    /// they were resampled.
    fn align<'a>(
        &self,
        reference: &'a PageImage,
        candidate: &'a PageImage,
    ) -> PageDiffResult<(Cow<'a, PageImage>, Cow<'a, PageImage>, bool)> {
        if reference.dimensions() == candidate.dimensions() {
            return Ok((Cow::Borrowed(reference), Cow::Borrowed(candidate), false));
        }
        match self.config.orchestrator.dimension_policy {
            DimensionPolicy::Reject => Err(PageDiffError::DimensionMismatch {
                reference: reference.dimensions(),
                candidate: candidate.dimensions(),
            }),
            DimensionPolicy::ResizeToSmaller => {
                let width = reference.width().min(candidate.width());
                let height = reference.height().min(candidate.height());
                info!(
                    reference = ?reference.dimensions(),
                    candidate = ?candidate.dimensions(),
                    width,
                    height,
                    "resizing images to common size"
                );
                Ok((
                    Cow::Owned(reference.resized_to(width, height)),
                    Cow::Owned(candidate.resized_to(width, height)),
                    true,
                ))
            }
        }
    }

    fn analyze_pages(
        &self,
        reference: &ParsedMarkup,
        candidate: &ParsedMarkup,
        warnings: &mut Vec<String>,
    ) -> Option<WcagComparison> {
        if reference.is_none() && candidate.is_none() {
            debug!("no markup supplied, skipping accessibility analysis");
            return None;
        }

        let (url1, url2) = if self.config.orchestrator.parallel_accessibility {
            std::thread::scope(|scope| {
                let worker = scope.spawn(|| self.analyze_page(reference));
                let url2 = self.analyze_page(candidate);
                let url1 = report_or_unavailable(worker.join());
                (url1, url2)
            })
        } else {
            (self.analyze_page(reference), self.analyze_page(candidate))
        };

        for (label, report) in [("reference", &url1), ("candidate", &url2)] {
            if let Some(reason) = &report.analysis_error {
                warn!(page = label, %reason, "accessibility analysis degraded");
                warnings.push(format!("{label} page accessibility analysis degraded: {reason}"));
            }
        }

        Some(WcagComparison::new(
            url1,
            url2,
            self.config.orchestrator.assessment_tolerance,
        ))
    }

    fn analyze_page(&self, markup: &ParsedMarkup) -> WcagReport {
        match markup {
            Some(Ok(document)) => self.analyzer.analyze_document(document),
            Some(Err(e)) => WcagReport::parse_failure(&e.to_string()),
            None => WcagReport::unavailable("no markup captured"),
        }
    }
}

fn report_or_unavailable(joined: std::thread::Result<WcagReport>) -> WcagReport {
    joined.unwrap_or_else(|_| {
        warn!("accessibility worker panicked");
        WcagReport::unavailable("accessibility worker panicked")
    })
}

fn round_to_tenth(seconds: f64) -> f64 {
    (seconds * 10.0).round() / 10.0
}

fn boxes_of(markup: &ParsedMarkup) -> Vec<ElementBox> {
    match markup {
        Some(Ok(document)) => document.element_boxes(),
        _ => Vec::new(),
    }
}

fn checkpoint(cancel: &CancellationToken, next: AnalysisPhase) -> PageDiffResult<()> {
    if cancel.is_cancelled() {
        warn!(phase = %next, "analysis cancelled");
        return Err(PageDiffError::Cancelled {
            phase: next.to_string(),
        });
    }
    debug!(phase = %next, "entering phase");
    Ok(())
}
