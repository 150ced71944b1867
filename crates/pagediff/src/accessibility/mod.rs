//! WCAG compliance scoring for a single page, and comparison of two pages.
//!
//! The analyzer never fails: markup that cannot be parsed produces a zero
//! score report carrying one synthetic `markup-parse` issue, and a rule that
//! panics is recorded as a `rule-failure` issue while the remaining rules
//! still run.

mod color;
mod rules;

pub use color::Color;
pub use rules::{Finding, Rule, RuleContext, RULES, RULE_SET_VERSION};

use crate::capture::PageMarkup;
use crate::config::AccessibilityConfig;
use crate::markup::Document;
use crate::result::{PageDiffError, PageDiffResult};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Rule id of the synthetic issue emitted for unparseable markup
pub const MARKUP_PARSE_RULE: &str = "markup-parse";

/// Rule id of the synthetic issue emitted when a rule crashes
pub const RULE_FAILURE_RULE: &str = "rule-failure";

/// Rule id of the synthetic issue emitted when a page could not be analyzed at all
pub const ANALYSIS_UNAVAILABLE_RULE: &str = "analysis-unavailable";

/// WCAG principle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WcagCategory {
    /// Information must be presentable in ways users can perceive
    Perceivable,
    /// Interface components must be operable
    Operable,
    /// Information and operation must be understandable
    Understandable,
    /// Content must work with assistive technologies
    Robust,
}

impl WcagCategory {
    /// All four principles in WCAG order
    pub const ALL: [Self; 4] = [
        Self::Perceivable,
        Self::Operable,
        Self::Understandable,
        Self::Robust,
    ];
}

impl std::fmt::Display for WcagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Perceivable => "Perceivable",
            Self::Operable => "Operable",
            Self::Understandable => "Understandable",
            Self::Robust => "Robust",
        };
        write!(f, "{name}")
    }
}

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Blocks access entirely
    Critical,
    /// Severely impairs access
    Serious,
    /// Causes difficulty
    Moderate,
    /// Annoyance
    Minor,
}

impl IssueSeverity {
    /// Score deduction for this severity
    #[must_use]
    pub fn weight(self, config: &AccessibilityConfig) -> f64 {
        let weights = &config.severity_weights;
        match self {
            Self::Critical => weights.critical,
            Self::Serious => weights.serious,
            Self::Moderate => weights.moderate,
            Self::Minor => weights.minor,
        }
    }
}

/// A single accessibility violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcagIssue {
    /// Rule that produced the issue
    pub rule_id: String,
    /// Principle the rule belongs to
    pub category: WcagCategory,
    /// Issue severity
    pub severity: IssueSeverity,
    /// Human-readable description
    pub description: String,
    /// Offending element, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_ref: Option<String>,
}

impl WcagIssue {
    fn synthetic(rule_id: &str, severity: IssueSeverity, description: String) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            category: WcagCategory::Robust,
            severity,
            description,
            element_ref: None,
        }
    }
}

/// Categorical grade derived from a compliance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum ComplianceLevel {
    /// Below 70
    NonCompliant,
    /// 70 or more
    A,
    /// 85 or more
    AA,
    /// 95 or more
    AAA,
}

impl ComplianceLevel {
    /// Level for a score in 0-100
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            Self::AAA
        } else if score >= 85.0 {
            Self::AA
        } else if score >= 70.0 {
            Self::A
        } else {
            Self::NonCompliant
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NonCompliant => "NonCompliant",
            Self::A => "A",
            Self::AA => "AA",
            Self::AAA => "AAA",
        };
        write!(f, "{name}")
    }
}

/// Score and issues for one principle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// 0-100
    pub score: f64,
    /// Issues in this category
    pub issues: Vec<WcagIssue>,
}

impl Default for CategoryReport {
    fn default() -> Self {
        Self {
            score: 100.0,
            issues: Vec::new(),
        }
    }
}

/// Per-principle reports, serialized as a map keyed by lowercase principle name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WcagCategories {
    /// Perceivable
    pub perceivable: CategoryReport,
    /// Operable
    pub operable: CategoryReport,
    /// Understandable
    pub understandable: CategoryReport,
    /// Robust
    pub robust: CategoryReport,
}

impl WcagCategories {
    /// Report for one principle
    #[must_use]
    pub const fn get(&self, category: WcagCategory) -> &CategoryReport {
        match category {
            WcagCategory::Perceivable => &self.perceivable,
            WcagCategory::Operable => &self.operable,
            WcagCategory::Understandable => &self.understandable,
            WcagCategory::Robust => &self.robust,
        }
    }

    fn get_mut(&mut self, category: WcagCategory) -> &mut CategoryReport {
        match category {
            WcagCategory::Perceivable => &mut self.perceivable,
            WcagCategory::Operable => &mut self.operable,
            WcagCategory::Understandable => &mut self.understandable,
            WcagCategory::Robust => &mut self.robust,
        }
    }

    /// All four reports in WCAG order
    pub fn iter(&self) -> impl Iterator<Item = (WcagCategory, &CategoryReport)> {
        WcagCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Accessibility report for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcagReport {
    /// Weighted mean of the category scores, 0-100
    pub compliance_score: f64,
    /// Grade derived from the score
    pub compliance_level: ComplianceLevel,
    /// Per-principle results
    pub categories: WcagCategories,
    /// Issue count over all categories
    pub total_issues: usize,
    /// Critical issue count over all categories
    pub critical_issues: usize,
    /// Why the analysis was incomplete, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

impl WcagReport {
    /// Build a report from issues, scoring each category by deduction
    #[must_use]
    pub fn from_issues(issues: Vec<WcagIssue>, config: &AccessibilityConfig) -> Self {
        let mut categories = WcagCategories::default();
        for issue in issues {
            categories.get_mut(issue.category).issues.push(issue);
        }
        for category in WcagCategory::ALL {
            let report = categories.get_mut(category);
            let deduction: f64 = report.issues.iter().map(|i| i.severity.weight(config)).sum();
            report.score = 100.0 - deduction.min(100.0);
        }

        let weights = &config.category_weights;
        let weighted = categories.perceivable.score * weights.perceivable
            + categories.operable.score * weights.operable
            + categories.understandable.score * weights.understandable
            + categories.robust.score * weights.robust;
        let compliance_score = (weighted / weights.total()).clamp(0.0, 100.0);

        let mut report = Self {
            compliance_score,
            compliance_level: ComplianceLevel::from_score(compliance_score),
            categories,
            total_issues: 0,
            critical_issues: 0,
            analysis_error: None,
        };
        report.recount();
        report
    }

    /// Report for markup that could not be parsed
    #[must_use]
    pub fn parse_failure(reason: &str) -> Self {
        Self::failed(
            MARKUP_PARSE_RULE,
            format!("Markup could not be parsed: {reason}"),
            reason,
        )
    }

    /// Report for a page whose analysis could not run (no markup, crashed worker)
    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        Self::failed(
            ANALYSIS_UNAVAILABLE_RULE,
            format!("Accessibility analysis unavailable: {reason}"),
            reason,
        )
    }

    /// Zero-score report holding exactly one synthetic critical issue
    fn failed(rule_id: &str, description: String, reason: &str) -> Self {
        let mut categories = WcagCategories::default();
        for category in WcagCategory::ALL {
            categories.get_mut(category).score = 0.0;
        }
        categories.robust.issues.push(WcagIssue::synthetic(
            rule_id,
            IssueSeverity::Critical,
            description,
        ));
        Self {
            compliance_score: 0.0,
            compliance_level: ComplianceLevel::NonCompliant,
            categories,
            total_issues: 1,
            critical_issues: 1,
            analysis_error: Some(reason.to_string()),
        }
    }

    fn recount(&mut self) {
        let issues = || self.categories.iter().flat_map(|(_, c)| c.issues.iter());
        self.total_issues = issues().count();
        self.critical_issues = issues()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
    }

    /// Whether some part of the analysis could not be carried out
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.analysis_error.is_some()
    }

    /// All issues in WCAG category order
    pub fn issues(&self) -> impl Iterator<Item = &WcagIssue> {
        self.categories.iter().flat_map(|(_, c)| c.issues.iter())
    }

    /// Check score ranges, issue counts and level consistency
    pub fn validate(&self) -> PageDiffResult<()> {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.compliance_score) {
            return Err(PageDiffError::input(format!(
                "compliance_score {} outside 0-100",
                self.compliance_score
            )));
        }
        if let Some((category, _)) = self.categories.iter().find(|(_, c)| !in_range(c.score)) {
            return Err(PageDiffError::input(format!(
                "{category} score outside 0-100"
            )));
        }
        if self.compliance_level != ComplianceLevel::from_score(self.compliance_score) {
            return Err(PageDiffError::input(format!(
                "compliance_level {} does not match score {}",
                self.compliance_level, self.compliance_score
            )));
        }
        let total = self.issues().count();
        if total != self.total_issues {
            return Err(PageDiffError::input(format!(
                "total_issues is {} but categories hold {total} issues",
                self.total_issues
            )));
        }
        let critical = self
            .issues()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
        if critical != self.critical_issues {
            return Err(PageDiffError::input(format!(
                "critical_issues is {} but categories hold {critical}",
                self.critical_issues
            )));
        }
        if let Some(misfiled) = self
            .categories
            .iter()
            .find_map(|(category, c)| c.issues.iter().find(|i| i.category != category))
        {
            return Err(PageDiffError::input(format!(
                "issue {} filed under the wrong category",
                misfiled.rule_id
            )));
        }
        Ok(())
    }
}

/// Direction of an accessibility change between two pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assessment {
    /// Candidate scores higher
    Improved,
    /// Candidate scores lower
    Regressed,
    /// Within tolerance
    Unchanged,
}

impl std::fmt::Display for Assessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Improved => "improved",
            Self::Regressed => "regressed",
            Self::Unchanged => "unchanged",
        };
        write!(f, "{name}")
    }
}

/// Summary of how the two reports relate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Categorical judgement
    pub assessment: Assessment,
    /// Candidate score minus reference score
    pub score_delta: f64,
}

/// Reports for both pages plus their comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcagComparison {
    /// Reference page report
    pub url1: WcagReport,
    /// Candidate page report
    pub url2: WcagReport,
    /// How the candidate compares to the reference
    pub comparison: ComparisonSummary,
}

impl WcagComparison {
    /// Compare two reports; deltas within `tolerance` points count as unchanged
    #[must_use]
    pub fn new(url1: WcagReport, url2: WcagReport, tolerance: f64) -> Self {
        let score_delta = url2.compliance_score - url1.compliance_score;
        let assessment = if score_delta > tolerance {
            Assessment::Improved
        } else if score_delta < -tolerance {
            Assessment::Regressed
        } else {
            Assessment::Unchanged
        };
        Self {
            url1,
            url2,
            comparison: ComparisonSummary {
                assessment,
                score_delta,
            },
        }
    }

    /// Whether either page's analysis was incomplete
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.url1.is_degraded() || self.url2.is_degraded()
    }
}

/// Scores one page against the rule set
#[derive(Debug, Clone)]
pub struct AccessibilityAnalyzer {
    config: AccessibilityConfig,
    rules: Vec<Rule>,
}

impl Default for AccessibilityAnalyzer {
    fn default() -> Self {
        Self::new(AccessibilityConfig::default())
    }
}

impl AccessibilityAnalyzer {
    /// Create an analyzer with the built-in rules
    #[must_use]
    pub fn new(config: AccessibilityConfig) -> Self {
        Self {
            config,
            rules: RULES.to_vec(),
        }
    }

    /// Replace the rule set
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &AccessibilityConfig {
        &self.config
    }

    /// Active rules
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Analyze raw markup. Never fails.
    #[must_use]
    pub fn analyze(&self, markup: &PageMarkup) -> WcagReport {
        match Document::parse(markup) {
            Ok(document) => self.analyze_document(&document),
            Err(e) => {
                warn!(error = %e, "markup could not be parsed");
                WcagReport::parse_failure(&e.to_string())
            }
        }
    }

    /// Analyze an already parsed document
    #[must_use]
    pub fn analyze_document(&self, document: &Document) -> WcagReport {
        let ctx = RuleContext {
            document,
            config: &self.config,
        };
        let mut issues = Vec::new();
        let mut failed_rules = Vec::new();

        for rule in &self.rules {
            match catch_unwind(AssertUnwindSafe(|| (rule.check)(&ctx))) {
                Ok(findings) => {
                    issues.extend(findings.into_iter().map(|finding| WcagIssue {
                        rule_id: rule.id.to_string(),
                        category: rule.category,
                        severity: rule.severity,
                        description: finding.description,
                        element_ref: finding.element_ref,
                    }));
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(rule = rule.id, %message, "accessibility rule failed");
                    issues.push(WcagIssue::synthetic(
                        RULE_FAILURE_RULE,
                        IssueSeverity::Minor,
                        format!("Rule {} could not be evaluated: {message}", rule.id),
                    ));
                    failed_rules.push(rule.id);
                }
            }
        }

        let mut report = WcagReport::from_issues(issues, &self.config);
        if !failed_rules.is_empty() {
            report.analysis_error = Some(format!("rules failed: {}", failed_rules.join(", ")));
        }
        debug!(
            elements = document.len(),
            issues = report.total_issues,
            score = report.compliance_score,
            "accessibility analysis finished"
        );
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
