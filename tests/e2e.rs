//! End-to-end tests against the real pdfium library and tesseract binary.
//!
//! Gated behind the `E2E_ENABLED` environment variable so they do not run in
//! CI unless explicitly requested. Fixtures are generated on the fly with the
//! crate's own composer, so no PDFs need to be checked in.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture

use ocrpdf::{compose, convert, convert_to_file, inspect, ConversionConfig, ErrorKind};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP - set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

fn config_builder() -> ocrpdf::ConversionConfigBuilder {
    let builder = ConversionConfig::builder().dpi(200);
    match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(dir) => builder.raster_toolchain_path(PathBuf::from(dir)),
        None => builder,
    }
}

/// Write a text PDF whose pages carry `lines`, one paragraph per line.
fn write_fixture(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let composed = compose(&lines.join("\n"), name).expect("fixture should compose");
    let path = dir.join(format!("{name}.pdf"));
    std::fs::write(&path, composed.bytes).expect("fixture should be writable");
    path
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_generated_fixture() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "inspect", &["HELLO"]);

    let meta = inspect(&path, &config_builder().build().unwrap())
        .await
        .expect("inspect() should succeed");

    assert_eq!(meta.page_count, 1);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ocr_reads_generated_text() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "hello",
        &["HELLO WORLD", "", "The quick brown fox jumps over the lazy dog."],
    );

    let output = convert(&path, &config_builder().build().unwrap())
        .await
        .expect("conversion should succeed");

    let upper = output.text.to_uppercase();
    assert!(upper.contains("HELLO"), "OCR text: {:?}", output.text);
    assert!(upper.contains("FOX"), "OCR text: {:?}", output.text);
    assert!(output.text.ends_with("\n\n"));
    println!("--- BEGIN OUTPUT ---\n{}\n--- END OUTPUT ---", output.text);
}

#[tokio::test]
async fn test_convert_to_file_with_page_cap() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    // Enough lines to spill over several pages of the fixture.
    let lines: Vec<String> = (1..=120).map(|i| format!("Line number {i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let path = write_fixture(dir.path(), "multi", &refs);
    let out = dir.path().join("multi_text.pdf");

    let config = config_builder().max_pages(1).build().unwrap();
    let output = convert_to_file(&path, &out, &config)
        .await
        .expect("conversion should succeed");

    assert!(output.stats.document_pages > 1);
    assert_eq!(output.stats.processed_pages, 1);
    assert!(output.text.ends_with("\n\n"));
    let written = lopdf::Document::load(&out).expect("output should be a PDF");
    assert_eq!(written.get_pages().len(), output.stats.output_pages);
}

#[tokio::test]
async fn test_missing_tesseract_is_configuration_error() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "cfg", &["HELLO"]);

    let config = config_builder()
        .ocr_runtime_path(dir.path().join("not-tesseract"))
        .build()
        .unwrap();
    let err = convert(&path, &config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
