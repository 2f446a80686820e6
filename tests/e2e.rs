//! End-to-end integration tests for searchify.
//!
//! The facade tests run everywhere: they inject a mock document converter and
//! never touch pdfium or tesseract. The full-pipeline tests need both a
//! pdfium library and a tesseract install, so they are gated behind the
//! `E2E_ENABLED` environment variable (and skip themselves when either tool
//! is missing).
//!
//! Run the full suite with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use searchify::{
    convert, ConversionConfig, ConverterError, DocumentConverter, EngineConfig, FailedPagePolicy,
    PageStatus, SearchifyError, TesseractEngine,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip a live-engine test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run live-engine e2e tests");
            return;
        }
    };
}

/// A converter that copies the source PDF's bytes to the output path and
/// records every source it was handed.
struct MockConverter {
    sources: Mutex<Vec<PathBuf>>,
}

impl MockConverter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(Vec::new()),
        })
    }

    fn sources(&self) -> Vec<PathBuf> {
        self.sources.lock().unwrap().clone()
    }
}

impl DocumentConverter for MockConverter {
    fn convert_document(&self, source: &Path, output: &Path) -> Result<(), ConverterError> {
        self.sources.lock().unwrap().push(source.to_path_buf());
        let bytes =
            std::fs::read(source).map_err(|e| ConverterError(format!("read source: {e}")))?;
        std::fs::write(output, bytes).map_err(|e| ConverterError(format!("write output: {e}")))?;
        Ok(())
    }
}

/// A converter that always fails.
struct FailingConverter;

impl DocumentConverter for FailingConverter {
    fn convert_document(&self, _source: &Path, _output: &Path) -> Result<(), ConverterError> {
        Err(ConverterError("simulated converter crash".to_string()))
    }
}

/// Engine config pointing at a binary that does not exist.
fn missing_engine() -> EngineConfig {
    EngineConfig {
        binary: PathBuf::from("/nonexistent/tesseract-missing"),
        tessdata_dir: None,
        dpi: 144,
    }
}

/// Write a file that passes the `%PDF` magic check. Enough for facade tests
/// that never open the file with pdfium.
fn stub_pdf(path: &Path) {
    std::fs::write(path, b"%PDF-1.4\n1 0 obj\nendobj\ntrailer\n%%EOF\n").unwrap();
}

/// Files in `dir` matching the job's temporary-PDF naming pattern.
fn ocr_temp_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains("-ocr-"))
                .unwrap_or(false)
        })
        .collect()
}

// ── Facade tests (mock converter, no external tools) ─────────────────────────

#[tokio::test]
async fn ocr_disabled_converts_original_and_leaves_no_temp() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("letter.pdf");
    stub_pdf(&input);
    let out_dir = dir.path().join("out");

    let mock = MockConverter::new();
    let config = ConversionConfig::builder()
        .converter(Arc::clone(&mock) as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let outcome = convert(input.to_str().unwrap(), &out_dir, &config)
        .await
        .expect("conversion should succeed");

    assert_eq!(outcome.output_path, out_dir.join("letter.docx"));
    assert!(outcome.output_path.exists());
    assert!(!outcome.ocr_applied);
    assert!(outcome.fallback_reason.is_none());
    assert!(outcome.pages.is_empty());

    // The converter saw the original file, untouched.
    assert_eq!(mock.sources(), vec![input]);

    // Cleanup invariant: nothing matching the temp pattern survives.
    assert!(ocr_temp_files(&out_dir).is_empty());
}

#[tokio::test]
async fn ocr_disabled_never_probes_the_engine() {
    // An engine config pointing at a missing binary would fail any probe;
    // with OCR disabled the job must succeed without ever noticing.
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    stub_pdf(&input);

    let mock = MockConverter::new();
    let config = ConversionConfig::builder()
        .use_ocr(false)
        .engine(missing_engine())
        .converter(Arc::clone(&mock) as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let outcome = convert(input.to_str().unwrap(), dir.path(), &config)
        .await
        .expect("conversion should succeed");

    assert!(!outcome.ocr_applied);
    assert!(outcome.fallback_reason.is_none());
    assert_eq!(outcome.stats.total_pages, 0);
}

#[tokio::test]
async fn unavailable_engine_falls_back_to_original() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    stub_pdf(&input);
    let out_dir = dir.path().join("out");

    let mock = MockConverter::new();
    let config = ConversionConfig::builder()
        .use_ocr(true)
        .engine(missing_engine())
        .converter(Arc::clone(&mock) as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let outcome = convert(input.to_str().unwrap(), &out_dir, &config)
        .await
        .expect("fallback conversion should succeed");

    assert!(!outcome.ocr_applied);
    let reason = outcome.fallback_reason.expect("fallback reason recorded");
    assert!(reason.contains("OCR engine unavailable"), "got: {reason}");

    // The pipeline never ran; the converter got the original.
    assert_eq!(mock.sources(), vec![input]);
    assert!(ocr_temp_files(&out_dir).is_empty());
}

#[tokio::test]
async fn converting_twice_with_ocr_disabled_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    stub_pdf(&input);
    let out_dir = dir.path().join("out");

    let config = ConversionConfig::builder()
        .converter(MockConverter::new() as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let first = convert(input.to_str().unwrap(), &out_dir, &config)
        .await
        .unwrap();
    let first_bytes = std::fs::read(&first.output_path).unwrap();

    let second = convert(input.to_str().unwrap(), &out_dir, &config)
        .await
        .unwrap();
    let second_bytes = std::fs::read(&second.output_path).unwrap();

    assert_eq!(first.output_path, second.output_path);
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn converter_failure_is_fatal_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    stub_pdf(&input);
    let out_dir = dir.path().join("out");

    let config = ConversionConfig::builder()
        .converter(Arc::new(FailingConverter) as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let err = convert(input.to_str().unwrap(), &out_dir, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, SearchifyError::DocumentConversionFailed { .. }));
    assert!(err.to_string().contains("simulated converter crash"));

    assert!(!out_dir.join("scan.docx").exists());
    assert!(ocr_temp_files(&out_dir).is_empty());
}

#[tokio::test]
async fn missing_input_fails_fast() {
    let config = ConversionConfig::builder()
        .converter(MockConverter::new() as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let err = convert("/nonexistent/scan.pdf", "/tmp", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchifyError::FileNotFound { .. }));
}

#[tokio::test]
async fn non_pdf_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.pdf");
    std::fs::write(&input, b"plain text, no magic").unwrap();

    let config = ConversionConfig::builder()
        .converter(MockConverter::new() as Arc<dyn DocumentConverter>)
        .build()
        .unwrap();

    let err = convert(input.to_str().unwrap(), dir.path(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchifyError::NotAPdf { .. }));
}

// ── Live-engine tests (E2E_ENABLED + pdfium + tesseract) ─────────────────────

/// Author a real text PDF pdfium can rasterise.
fn text_pdf(path: &Path, pages: usize) {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 36 Tf 72 700 Td (Hello page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("write test PDF");
}

/// Skip when tesseract is not installed on this machine.
fn discovered_engine_or_skip() -> Option<TesseractEngine> {
    match TesseractEngine::discover() {
        Some(engine) if engine.is_available() => Some(engine),
        _ => {
            println!("SKIP — no tesseract install found");
            None
        }
    }
}

#[tokio::test]
async fn e2e_three_page_pdf_merges_in_order() {
    e2e_skip_unless_enabled!();
    let Some(engine) = discovered_engine_or_skip() else {
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("three.pdf");
    text_pdf(&input, 3);
    let output = dir.path().join("three-ocr.pdf");

    let config = ConversionConfig::builder()
        .use_ocr(true)
        .engine(engine.config().clone())
        .build()
        .unwrap();

    let report = match searchify::make_searchable(&input, &output, &config).await {
        Ok(report) => report,
        Err(SearchifyError::PdfiumBindingFailed(detail)) => {
            println!("SKIP — pdfium not available: {detail}");
            return;
        }
        Err(err) => panic!("pipeline failed: {err}"),
    };

    assert_eq!(report.total_pages, 3);
    assert_eq!(report.recognized() + report.failed() + report.fallback(), 3);

    // Every merged page appears exactly once, in ascending source order.
    let merged = lopdf::Document::load(&output).expect("merged PDF must load");
    assert_eq!(merged.get_pages().len(), report.recognized() + report.fallback());
    let nums: Vec<usize> = report.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(nums, vec![1, 2, 3]);
    assert!(report.recognized() > 0, "expected at least one recognised page");
}

#[tokio::test]
async fn e2e_bogus_language_with_keep_original_preserves_page_count() {
    e2e_skip_unless_enabled!();
    let Some(engine) = discovered_engine_or_skip() else {
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("two.pdf");
    text_pdf(&input, 2);
    let output = dir.path().join("two-ocr.pdf");

    // A language no install has: every recognition fails, the keep-original
    // policy turns each failure into an image-only page.
    let config = ConversionConfig::builder()
        .use_ocr(true)
        .language("zzz_nonexistent")
        .failed_page_policy(FailedPagePolicy::KeepOriginal)
        .engine(engine.config().clone())
        .build()
        .unwrap();

    let report = match searchify::make_searchable(&input, &output, &config).await {
        Ok(report) => report,
        Err(SearchifyError::PdfiumBindingFailed(detail)) => {
            println!("SKIP — pdfium not available: {detail}");
            return;
        }
        Err(err) => panic!("pipeline failed: {err}"),
    };

    assert_eq!(report.total_pages, 2);
    assert_eq!(report.fallback(), 2);
    assert!(report
        .pages
        .iter()
        .all(|p| p.status == PageStatus::Fallback && p.error.is_some()));

    let merged = lopdf::Document::load(&output).expect("merged PDF must load");
    assert_eq!(merged.get_pages().len(), 2);
}

#[tokio::test]
async fn e2e_bogus_language_with_omit_fails_whole_job() {
    e2e_skip_unless_enabled!();
    let Some(engine) = discovered_engine_or_skip() else {
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("one.pdf");
    text_pdf(&input, 1);
    let output = dir.path().join("one-ocr.pdf");

    let config = ConversionConfig::builder()
        .use_ocr(true)
        .language("zzz_nonexistent")
        .engine(engine.config().clone())
        .build()
        .unwrap();

    match searchify::make_searchable(&input, &output, &config).await {
        Err(SearchifyError::AllPagesFailed { total, .. }) => {
            assert_eq!(total, 1);
            assert!(!output.exists(), "no partial output may be left behind");
        }
        Err(SearchifyError::PdfiumBindingFailed(detail)) => {
            println!("SKIP — pdfium not available: {detail}");
        }
        other => panic!("expected AllPagesFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn e2e_inspect_reports_page_count() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("five.pdf");
    text_pdf(&input, 5);

    match searchify::inspect(input.to_str().unwrap()).await {
        Ok(meta) => assert_eq!(meta.page_count, 5),
        Err(SearchifyError::PdfiumBindingFailed(detail)) => {
            println!("SKIP — pdfium not available: {detail}");
        }
        Err(err) => panic!("inspect failed: {err}"),
    }
}
