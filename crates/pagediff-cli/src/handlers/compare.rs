//! Compare command handler

use super::{emit, load_analysis_config};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{render_analysis, OutputFormat, ProgressReporter};
use crate::CompareArgs;
use pagediff::{
    AnalysisConfig, AnalysisOrchestrator, AnalysisResult, AnalysisStatus, DimensionPolicy,
    FailureReport, FileCapture, PageDiffResult, PageImage, PageMarkup,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Execute the compare command.
///
/// A failed run still produces a failure report in JSON mode before the
/// error is returned.
pub fn execute_compare(config: &CliConfig, args: &CompareArgs) -> CliResult<()> {
    let format = OutputFormat::from(args.format);
    let use_color = config.use_color() && args.output.is_none();

    let mut reporter = ProgressReporter::new(config.use_color(), config.verbosity.is_quiet());
    reporter.start_spinner("comparing pages");
    let outcome = analyze(args);
    reporter.finish();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if format == OutputFormat::Json {
                let report = FailureReport::from_error(&e);
                emit(&report.to_json_pretty()?, args.output.as_deref())?;
            }
            return Err(e.into());
        }
    };

    let rendered = match format {
        OutputFormat::Json => result.to_json_pretty()?,
        OutputFormat::Text => render_analysis(&result, use_color),
    };
    emit(&rendered, args.output.as_deref())?;

    for warning in &result.warnings {
        reporter.warning(warning);
    }
    if result.status == AnalysisStatus::Partial {
        reporter.warning("analysis completed with degraded accessibility data");
    } else if let Some(path) = &args.output {
        reporter.success(&format!("wrote {}", path.display()));
    }
    Ok(())
}

/// Effective engine configuration for these arguments
pub fn effective_config(args: &CompareArgs) -> PageDiffResult<AnalysisConfig> {
    let config = load_analysis_config(args.config.as_deref())?;
    Ok(if args.resize {
        config.with_dimension_policy(DimensionPolicy::ResizeToSmaller)
    } else {
        config
    })
}

fn analyze(args: &CompareArgs) -> PageDiffResult<AnalysisResult> {
    let orchestrator = AnalysisOrchestrator::new(effective_config(args)?)?;

    if args.sibling_markup {
        return orchestrator.run_captured(
            &Arc::new(FileCapture::new()),
            &args.reference.to_string_lossy(),
            &args.candidate.to_string_lossy(),
            Duration::from_millis(args.timeout_ms),
        );
    }

    let reference = PageImage::open(&args.reference)?;
    let candidate = PageImage::open(&args.candidate)?;
    let reference_markup = args
        .reference_markup
        .as_deref()
        .map(PageMarkup::open)
        .transpose()?;
    let candidate_markup = args
        .candidate_markup
        .as_deref()
        .map(PageMarkup::open)
        .transpose()?;
    debug!(
        reference = %args.reference.display(),
        candidate = %args.candidate.display(),
        "inputs loaded"
    );

    orchestrator.run(
        &reference,
        &candidate,
        reference_markup.as_ref(),
        candidate_markup.as_ref(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::FormatArg;
    use crate::config::ColorChoice;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        image::RgbaImage::from_pixel(width, height, image::Rgba([240, 240, 240, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn args(reference: std::path::PathBuf, candidate: std::path::PathBuf) -> CompareArgs {
        CompareArgs {
            reference,
            candidate,
            reference_markup: None,
            candidate_markup: None,
            sibling_markup: false,
            timeout_ms: 30_000,
            config: None,
            resize: false,
            output: None,
            format: FormatArg::Json,
        }
    }

    fn quiet() -> CliConfig {
        CliConfig::new()
            .with_verbosity(crate::config::Verbosity::Quiet)
            .with_color(ColorChoice::Never)
    }

    #[test]
    fn test_resize_flag_overrides_policy() {
        let mut compare = args("a.png".into(), "b.png".into());
        assert_eq!(
            effective_config(&compare).unwrap().orchestrator.dimension_policy,
            DimensionPolicy::Reject
        );
        compare.resize = true;
        assert_eq!(
            effective_config(&compare).unwrap().orchestrator.dimension_policy,
            DimensionPolicy::ResizeToSmaller
        );
    }

    #[test]
    fn test_identical_images_written_to_file() {
        let dir = TempDir::new().unwrap();
        let image = write_png(&dir, "page.png", 40, 30);
        let mut compare = args(image.clone(), image);
        compare.output = Some(dir.path().join("result.json"));

        execute_compare(&quiet(), &compare).unwrap();

        let json = std::fs::read_to_string(dir.path().join("result.json")).unwrap();
        let result = AnalysisResult::from_json(&json).unwrap();
        assert!(result.metrics.is_identical());
        assert!(result.regions.is_empty());
        assert_eq!(result.status, AnalysisStatus::Complete);
    }

    #[test]
    fn test_mismatch_writes_failure_report() {
        let dir = TempDir::new().unwrap();
        let mut compare = args(
            write_png(&dir, "a.png", 40, 30),
            write_png(&dir, "b.png", 50, 30),
        );
        compare.output = Some(dir.path().join("failure.json"));

        let err = execute_compare(&quiet(), &compare).unwrap_err();
        assert!(err.to_string().contains("dimensions differ"));

        let json = std::fs::read_to_string(dir.path().join("failure.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["kind"], "input_validation");
    }

    #[test]
    fn test_missing_image_fails() {
        let dir = TempDir::new().unwrap();
        let compare = args(dir.path().join("nope.png"), dir.path().join("nope.png"));
        assert!(execute_compare(&quiet(), &compare).is_err());
    }

    #[test]
    fn test_one_sided_markup_is_partial() {
        let dir = TempDir::new().unwrap();
        let image = write_png(&dir, "page.png", 40, 30);
        let markup = dir.path().join("page.html");
        std::fs::write(&markup, "<html lang=\"en\"><title>Home</title></html>").unwrap();

        let mut compare = args(image.clone(), image);
        compare.candidate_markup = Some(markup);
        compare.output = Some(dir.path().join("result.json"));
        execute_compare(&quiet(), &compare).unwrap();

        let json = std::fs::read_to_string(dir.path().join("result.json")).unwrap();
        let result = AnalysisResult::from_json(&json).unwrap();
        assert_eq!(result.status, AnalysisStatus::Partial);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_sibling_markup_is_discovered() {
        let dir = TempDir::new().unwrap();
        let reference = write_png(&dir, "before.png", 40, 30);
        let candidate = write_png(&dir, "after.png", 40, 30);
        let page = "<html lang=\"en\"><head><title>Home</title></head>\
                    <body><main></main></body></html>";
        std::fs::write(dir.path().join("before.html"), page).unwrap();
        std::fs::write(dir.path().join("after.html"), page).unwrap();

        let mut compare = args(reference, candidate);
        compare.sibling_markup = true;
        compare.output = Some(dir.path().join("result.json"));
        execute_compare(&quiet(), &compare).unwrap();

        let json = std::fs::read_to_string(dir.path().join("result.json")).unwrap();
        let result = AnalysisResult::from_json(&json).unwrap();
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert!(result.wcag_analysis.is_some());
    }
}
