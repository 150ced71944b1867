//! Smoke tests for the pagediff CLI
//!
//! These tests run the real binary against images and markup written to a
//! temporary directory.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get a command for the pagediff binary
fn pagediff() -> Command {
    Command::cargo_bin("pagediff").expect("pagediff binary should exist")
}

fn write_page(dir: &TempDir, name: &str, width: u32, height: u32, block: bool) -> PathBuf {
    let mut pixels = image::RgbaImage::from_pixel(width, height, image::Rgba([250, 250, 250, 255]));
    if block {
        for y in 20..50 {
            for x in 30..70 {
                pixels.put_pixel(x, y, image::Rgba([20, 90, 200, 255]));
            }
        }
    }
    let path = dir.path().join(name);
    pixels.save(&path).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    pagediff()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    pagediff()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("audit"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    pagediff().assert().failure();
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_prints_default_yaml() {
    pagediff()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("dimension_policy: reject"))
        .stdout(predicate::str::contains("ssim_window: 7"));
}

#[test]
fn test_config_rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pagediff.toml");
    fs::write(&path, "x = 1").unwrap();
    pagediff()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported config format"));
}

// ============================================================================
// Compare
// ============================================================================

#[test]
fn test_compare_identical_images_json() {
    let dir = TempDir::new().unwrap();
    let image = write_page(&dir, "page.png", 100, 80, false);

    let output = pagediff()
        .args(["compare", "--format", "json"])
        .arg(&image)
        .arg(&image)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["metrics"]["ssim"], 1.0);
    assert_eq!(value["metrics"]["mse"], 0.0);
    assert_eq!(value["metrics"]["psnr"].as_f64().unwrap(), f64::MAX);
    assert_eq!(value["regions"].as_array().unwrap().len(), 0);
    assert_eq!(value["status"], "complete");
    assert!(value["wcag_analysis"].is_null());
}

#[test]
fn test_compare_finds_changed_block() {
    let dir = TempDir::new().unwrap();
    let reference = write_page(&dir, "before.png", 100, 80, false);
    let candidate = write_page(&dir, "after.png", 100, 80, true);

    let output = pagediff()
        .args(["compare", "--format", "json"])
        .arg(&reference)
        .arg(&candidate)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    let regions = value["regions"].as_array().unwrap();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0]["bounding_box"], serde_json::json!([30, 20, 40, 30]));
    assert_eq!(regions[0]["severity"], "major");
    assert!(value["metrics"]["ssim"].as_f64().unwrap() < 1.0);
}

#[test]
fn test_compare_text_output() {
    let dir = TempDir::new().unwrap();
    let image = write_page(&dir, "page.png", 64, 48, false);

    pagediff()
        .args(["compare", "--color", "never"])
        .arg(&image)
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Similarity ==="))
        .stdout(predicate::str::contains("inf (identical)"))
        .stdout(predicate::str::contains("Status: complete"));
}

#[test]
fn test_compare_dimension_mismatch_fails() {
    let dir = TempDir::new().unwrap();
    let reference = write_page(&dir, "a.png", 100, 80, false);
    let candidate = write_page(&dir, "b.png", 120, 80, false);

    let output = pagediff()
        .args(["compare", "--format", "json"])
        .arg(&reference)
        .arg(&candidate)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let value = stdout_json(&output);
    assert_eq!(value["status"], "failed");
    assert_eq!(value["kind"], "input_validation");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Image dimensions differ"));
}

#[test]
fn test_compare_resize_accepts_mismatch() {
    let dir = TempDir::new().unwrap();
    let reference = write_page(&dir, "a.png", 100, 80, false);
    let candidate = write_page(&dir, "b.png", 120, 80, false);

    let output = pagediff()
        .args(["compare", "--resize", "--format", "json"])
        .arg(&reference)
        .arg(&candidate)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["image_size"], serde_json::json!([100, 80]));
}

#[test]
fn test_compare_missing_image_fails() {
    let dir = TempDir::new().unwrap();
    pagediff()
        .arg("compare")
        .arg(dir.path().join("missing.png"))
        .arg(dir.path().join("missing.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read image"));
}

#[test]
fn test_compare_with_markup_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let image = write_page(&dir, "page.png", 100, 80, false);
    let before = dir.path().join("before.html");
    let after = dir.path().join("after.html");
    fs::write(
        &before,
        "<html lang=\"en\"><head><title>Shop</title></head>\
         <body><main><img src=\"a.png\" alt=\"Logo\"></main></body></html>",
    )
    .unwrap();
    fs::write(
        &after,
        "<html lang=\"en\"><head><title>Shop</title></head>\
         <body><main><img src=\"a.png\"><img src=\"b.png\"></main></body></html>",
    )
    .unwrap();
    let result_path = dir.path().join("result.json");

    pagediff()
        .args(["compare", "--format", "json", "--color", "never"])
        .arg(&image)
        .arg(&image)
        .arg("--reference-markup")
        .arg(&before)
        .arg("--candidate-markup")
        .arg(&after)
        .arg("--output")
        .arg(&result_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("wrote"));

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&result_path).unwrap()).unwrap();
    let wcag = &value["wcag_analysis"];
    assert_eq!(wcag["url1"]["critical_issues"], 0);
    assert_eq!(wcag["url2"]["critical_issues"], 2);
    assert_eq!(wcag["comparison"]["assessment"], "regressed");
    assert!(wcag["comparison"]["score_delta"].as_f64().unwrap() < 0.0);
}

#[test]
fn test_compare_one_sided_markup_is_partial() {
    let dir = TempDir::new().unwrap();
    let image = write_page(&dir, "page.png", 100, 80, false);
    let markup = dir.path().join("page.html");
    fs::write(&markup, "<html lang=\"en\"><title>Home</title></html>").unwrap();

    let output = pagediff()
        .args(["compare", "--format", "json", "--color", "never"])
        .arg(&image)
        .arg(&image)
        .arg("--candidate-markup")
        .arg(&markup)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["status"], "partial");
    assert!(String::from_utf8_lossy(&output.stderr).contains("WARN"));
}

// ============================================================================
// Audit
// ============================================================================

#[test]
fn test_audit_reports_issues() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("form.html");
    fs::write(
        &page,
        "<html><head><title>Sign up</title></head>\
         <body><main><input type=\"text\" id=\"name\"></main></body></html>",
    )
    .unwrap();

    pagediff()
        .args(["audit", "--color", "never"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("form-label"))
        .stdout(predicate::str::contains("html-lang"));
}

#[test]
fn test_audit_json() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.html");
    fs::write(&page, "<html lang=\"en\"><title>Home</title><main></main></html>").unwrap();

    let output = pagediff()
        .args(["audit", "--format", "json"])
        .arg(&page)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["total_issues"], 0);
    assert_eq!(value["compliance_level"], "AAA");
}
