//! Audit command handler

use super::{emit, load_analysis_config};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{render_report, OutputFormat, ProgressReporter};
use crate::AuditArgs;
use pagediff::{AccessibilityAnalyzer, PageDiffResult, PageMarkup, WcagReport};

/// Execute the audit command
pub fn execute_audit(config: &CliConfig, args: &AuditArgs) -> CliResult<()> {
    let reporter = ProgressReporter::new(config.use_color(), config.verbosity.is_quiet());
    let report = audit(args)?;

    let rendered = match OutputFormat::from(args.format) {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => render_report(
            &args.markup.display().to_string(),
            &report,
            config.use_color() && args.output.is_none(),
        ),
    };
    emit(&rendered, args.output.as_deref())?;

    if let Some(reason) = &report.analysis_error {
        reporter.warning(&format!("accessibility analysis degraded: {reason}"));
    }
    Ok(())
}

/// Score one markup file
pub fn audit(args: &AuditArgs) -> PageDiffResult<WcagReport> {
    let config = load_analysis_config(args.config.as_deref())?;
    let markup = PageMarkup::open(&args.markup)?;
    let report = AccessibilityAnalyzer::new(config.accessibility).analyze(&markup);
    report.validate()?;
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::FormatArg;
    use pagediff::ComplianceLevel;
    use tempfile::TempDir;

    fn args(markup: std::path::PathBuf) -> AuditArgs {
        AuditArgs {
            markup,
            config: None,
            output: None,
            format: FormatArg::Json,
        }
    }

    #[test]
    fn test_audit_clean_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(
            &path,
            "<html lang=\"en\"><head><title>Home</title></head>\
             <body><main><h1>Hello</h1></main></body></html>",
        )
        .unwrap();

        let report = audit(&args(path)).unwrap();
        assert_eq!(report.total_issues, 0);
        assert_eq!(report.compliance_level, ComplianceLevel::AAA);
    }

    #[test]
    fn test_audit_counts_missing_alt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gallery.html");
        std::fs::write(
            &path,
            "<html lang=\"en\"><head><title>Gallery</title></head>\
             <body><main><img src=\"a.png\"><img src=\"b.png\"></main></body></html>",
        )
        .unwrap();

        let report = audit(&args(path)).unwrap();
        assert_eq!(report.critical_issues, 2);
        assert!(report
            .categories
            .perceivable
            .issues
            .iter()
            .all(|issue| issue.rule_id == "image-alt"));
    }

    #[test]
    fn test_unparseable_markup_degrades() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.html");
        std::fs::write(&path, "   ").unwrap();

        let report = audit(&args(path)).unwrap();
        assert!(report.is_degraded());
        assert!(report.compliance_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(audit(&args(dir.path().join("absent.html"))).is_err());
    }

    #[test]
    fn test_report_written_as_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html><title>x</title></html>").unwrap();
        let mut audit_args = args(path);
        audit_args.output = Some(dir.path().join("report.json"));

        execute_audit(&CliConfig::new(), &audit_args).unwrap();

        let json = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["compliance_score"].is_number());
        assert!(value["categories"]["understandable"]["issues"]
            .as_array()
            .unwrap()
            .iter()
            .any(|issue| issue["rule_id"] == "html-lang"));
    }
}
