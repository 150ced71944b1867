//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use pagediff::{
    AnalysisResult, Assessment, ComparisonMetrics, DifferenceRegion, IssueSeverity, RegionKind,
    RegionSeverity, WcagComparison, WcagReport,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty JSON
    Json,
}

/// Status messages and the spinner, all on stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while the engine runs. No-op off a terminal or when quiet.
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn set_message(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Remove the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

fn paint(text: impl std::fmt::Display, style: &Style, use_color: bool) -> String {
    if use_color {
        style.apply_to(text).to_string()
    } else {
        text.to_string()
    }
}

fn heading(title: &str, use_color: bool) -> String {
    if use_color {
        style(title).bold().underlined().to_string()
    } else {
        format!("=== {title} ===")
    }
}

const fn severity_label(severity: RegionSeverity) -> &'static str {
    match severity {
        RegionSeverity::Minor => "minor",
        RegionSeverity::Moderate => "moderate",
        RegionSeverity::Major => "major",
    }
}

const fn kind_label(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Layout => "layout",
        RegionKind::Color => "color",
        RegionKind::Text => "text",
        RegionKind::Unknown => "unknown",
    }
}

const fn issue_label(severity: IssueSeverity) -> &'static str {
    match severity {
        IssueSeverity::Critical => "critical",
        IssueSeverity::Serious => "serious",
        IssueSeverity::Moderate => "moderate",
        IssueSeverity::Minor => "minor",
    }
}

/// Format PSNR, which is infinite for identical images
#[must_use]
pub fn format_psnr(psnr: f64) -> String {
    if psnr.is_infinite() {
        "inf (identical)".to_string()
    } else {
        format!("{psnr:.2} dB")
    }
}

fn render_metrics(out: &mut String, metrics: &ComparisonMetrics, use_color: bool) {
    let _ = writeln!(out, "{}", heading("Similarity", use_color));
    let _ = writeln!(out, "  SSIM              {:.4}", metrics.ssim);
    let _ = writeln!(out, "  MSE               {:.2}", metrics.mse);
    let _ = writeln!(out, "  PSNR              {}", format_psnr(metrics.psnr));
    let _ = writeln!(out, "  Pixels changed    {:.2}%", metrics.pixel_diff_percent);
}

fn render_regions(out: &mut String, regions: &[DifferenceRegion], use_color: bool) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        heading(&format!("Regions ({})", regions.len()), use_color)
    );
    if regions.is_empty() {
        let _ = writeln!(out, "  none");
        return;
    }
    for (index, region) in regions.iter().enumerate() {
        let severity_style = match region.severity {
            RegionSeverity::Major => Style::new().red().bold(),
            RegionSeverity::Moderate => Style::new().yellow(),
            RegionSeverity::Minor => Style::new().dim(),
        };
        let bounds = region.bounding_box;
        let _ = writeln!(
            out,
            "  {:>3}. {:<8} {:<7} at ({}, {}) {}x{}",
            index + 1,
            paint(severity_label(region.severity), &severity_style, use_color),
            kind_label(region.kind),
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height
        );
    }
}

fn report_line(label: &str, report: &WcagReport) -> String {
    let mut line = format!(
        "  {label:<10} {:>5.1}  {:<12} {} issues, {} critical",
        report.compliance_score,
        report.compliance_level.to_string(),
        report.total_issues,
        report.critical_issues
    );
    if let Some(reason) = &report.analysis_error {
        let _ = write!(line, " (unavailable: {reason})");
    }
    line
}

fn render_wcag(out: &mut String, wcag: &WcagComparison, use_color: bool) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", heading("Accessibility", use_color));
    let _ = writeln!(out, "{}", report_line("reference", &wcag.url1));
    let _ = writeln!(out, "{}", report_line("candidate", &wcag.url2));

    let assessment_style = match wcag.comparison.assessment {
        Assessment::Improved => Style::new().green().bold(),
        Assessment::Regressed => Style::new().red().bold(),
        Assessment::Unchanged => Style::new(),
    };
    let _ = writeln!(
        out,
        "  assessment {} ({:+.1})",
        paint(wcag.comparison.assessment, &assessment_style, use_color),
        wcag.comparison.score_delta
    );
}

/// Render a comparison result as text
#[must_use]
pub fn render_analysis(result: &AnalysisResult, use_color: bool) -> String {
    let mut out = String::new();
    render_metrics(&mut out, &result.metrics, use_color);
    render_regions(&mut out, &result.regions, use_color);
    if let Some(wcag) = &result.wcag_analysis {
        render_wcag(&mut out, wcag, use_color);
    }

    let [width, height] = result.image_size;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Status: {} ({width}x{height}, {:.1}s, {})",
        result.status, result.duration_seconds, result.timestamp
    );
    out
}

/// Render a single-page accessibility report as text
#[must_use]
pub fn render_report(source: &str, report: &WcagReport, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", heading(&format!("Accessibility: {source}"), use_color));
    let _ = writeln!(
        out,
        "  Score {:.1} ({})",
        report.compliance_score, report.compliance_level
    );
    if let Some(reason) = &report.analysis_error {
        let _ = writeln!(
            out,
            "  {}",
            paint(format!("analysis unavailable: {reason}"), &Style::new().yellow(), use_color)
        );
    }
    for (category, scores) in report.categories.iter() {
        let _ = writeln!(
            out,
            "  {:<15} {:>5.1}  ({} issues)",
            category.to_string(),
            scores.score,
            scores.issues.len()
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        heading(&format!("Issues ({})", report.total_issues), use_color)
    );
    for issue in report.issues() {
        let severity_style = match issue.severity {
            IssueSeverity::Critical | IssueSeverity::Serious => Style::new().red().bold(),
            IssueSeverity::Moderate => Style::new().yellow(),
            IssueSeverity::Minor => Style::new().dim(),
        };
        let _ = write!(
            out,
            "  [{}] {} {}",
            paint(issue_label(issue.severity), &severity_style, use_color),
            issue.rule_id,
            issue.description
        );
        if let Some(element) = &issue.element_ref {
            let _ = write!(out, " ({element})");
        }
        let _ = writeln!(out);
    }
    out
}
