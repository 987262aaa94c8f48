//! Integration tests for the report-forge pipeline.
//!
//! These tests validate:
//! - Normalization never fails and honours fallback-chain order
//! - Templates always carry the canonical row counts
//! - Pagination boundary behaviour through the full export
//! - Retry, fallback and abort routing, and surface release

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use report_forge::document::RenderedDocument;
use report_forge::normalize::ChecklistGroupKind;
use report_forge::pagination::paginate;
use report_forge::templates::render_report;
use report_forge::{
    normalize_report, BitmapRasterizer, DocumentContext, ExportConfig, ExportError,
    ExportOutcome, ExportResult, Exporter, FixedRecovery, PaginatedArtifact, PrintFacility,
    PrintableDocument, RasterImage, Rasterizer, Recovery, RecoveryPrompt, ReportRecord,
    SaveFacility,
};

// =====================================================================
// Helpers
// =====================================================================

fn export_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn report(number: &str) -> ReportRecord {
    ReportRecord::new(json!({ "reportNumber": number, "siteName": "Galaxy Cinema" }))
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

#[derive(Default)]
struct MemorySave {
    artifacts: Mutex<Vec<PaginatedArtifact>>,
}

#[async_trait]
impl SaveFacility for MemorySave {
    async fn save(&self, artifact: &PaginatedArtifact) -> ExportResult<()> {
        self.artifacts.lock().unwrap().push(artifact.clone());
        Ok(())
    }
}

struct FailingSave;

#[async_trait]
impl SaveFacility for FailingSave {
    async fn save(&self, _artifact: &PaginatedArtifact) -> ExportResult<()> {
        Err(ExportError::Save("disk full".to_string()))
    }
}

#[derive(Default)]
struct MemoryPrinter {
    printed: Mutex<Vec<PrintableDocument>>,
}

impl PrintFacility for MemoryPrinter {
    fn print(&self, document: &PrintableDocument) -> ExportResult<()> {
        self.printed.lock().unwrap().push(document.clone());
        Ok(())
    }
}

/// Counts how often it was asked and always answers the same.
struct CountingPrompt {
    answer: Recovery,
    asked: AtomicUsize,
}

impl CountingPrompt {
    fn new(answer: Recovery) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }
}

impl RecoveryPrompt for CountingPrompt {
    fn choose(&self, _error: &ExportError, _attempt: u32) -> Recovery {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

struct AlwaysFails;

#[async_trait]
impl Rasterizer for AlwaysFails {
    async fn rasterize(&self, _document: &RenderedDocument) -> ExportResult<RasterImage> {
        Err(ExportError::Rasterization("unsupported content".to_string()))
    }
}

/// Returns a white raster of a fixed size and records every title it saw.
struct FixedRaster {
    width: u32,
    height: u32,
    seen: Mutex<Vec<String>>,
}

impl FixedRaster {
    fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Rasterizer for FixedRaster {
    async fn rasterize(&self, document: &RenderedDocument) -> ExportResult<RasterImage> {
        self.seen.lock().unwrap().push(document.title.clone());
        Ok(RasterImage {
            image: RgbImage::from_pixel(self.width, self.height, Rgb([255, 255, 255])),
            scale: 2.0,
        })
    }
}

fn exporter(
    rasterizer: Arc<dyn Rasterizer>,
    saver: Arc<dyn SaveFacility>,
    printer: Arc<dyn PrintFacility>,
    prompt: Arc<dyn RecoveryPrompt>,
) -> Exporter {
    Exporter::new(ExportConfig::default(), rasterizer, saver, printer, prompt)
}

// =====================================================================
// Normalization
// =====================================================================

#[test]
fn empty_record_normalizes_completely() {
    for value in [json!({}), Value::Null, json!([]), json!("text"), json!(42)] {
        let view = normalize_report(&ReportRecord::new(value));
        assert_eq!(view.report_number, "N/A");
        assert_eq!(view.engineer, "-");
        assert_eq!(view.checklist_group(ChecklistGroupKind::Optics).len(), 5);
        assert_eq!(view.checklist_group(ChecklistGroupKind::Electronics).len(), 6);
        assert_eq!(view.checklist_group(ChecklistGroupKind::Mechanical).len(), 9);
        assert_eq!(view.image_evaluation.len(), 10);
    }
}

#[test]
fn hostile_shapes_never_panic() {
    let record = ReportRecord::new(json!({
        "engineer": null,
        "site": [1, 2, 3],
        "projector": "not an object",
        "optics": { "description": "single legacy object" },
        "electronics": "nonsense",
        "mechanical": [null, 7, [], {}],
        "observations": [null, { "text": 3 }],
        "recommendedParts": 12,
        "voltage": { "pVsN": { "nested": true } },
        "imageEvaluation": null
    }));
    let view = normalize_report(&record);
    assert_eq!(view.checklist_group(ChecklistGroupKind::Optics).len(), 5);
    assert_eq!(
        view.checklist_group(ChecklistGroupKind::Optics)[0].description,
        "single legacy object"
    );
    assert_eq!(view.checklist_group(ChecklistGroupKind::Mechanical).len(), 9);
    assert_eq!(view.voltage.p_vs_n, "-");
}

#[test]
fn current_schema_path_wins_over_legacy() {
    let view = normalize_report(&ReportRecord::new(json!({
        "engineer": { "name": "A" },
        "engineerName": "B"
    })));
    assert_eq!(view.engineer, "A");

    let view = normalize_report(&ReportRecord::new(json!({
        "engineer": { "name": "   " },
        "engineerName": "B"
    })));
    assert_eq!(view.engineer, "B");
}

#[test]
fn zero_is_a_value_but_empty_string_is_not() {
    let zero = normalize_report(&ReportRecord::new(json!({ "projectorHours": 0 })));
    assert_eq!(zero.projector_hours, "0");

    let empty = normalize_report(&ReportRecord::new(json!({ "projectorHours": "" })));
    assert_eq!(empty.projector_hours, "-");
}

// =====================================================================
// Templates
// =====================================================================

#[test]
fn checklist_table_has_canonical_rows_for_any_input() {
    let config = ExportConfig::default();
    let oversized = Value::Array(vec![json!({ "description": "x" }); 12]);
    for value in [json!({}), json!({ "optics": oversized })] {
        let view = normalize_report(&ReportRecord::new(value));
        let doc = render_report(&view, &config);
        let checklist = doc.tables()[0];
        assert_eq!(checklist.rows.len(), 5 + 6 + 1 + 1 + 1 + 5 + 9);
        let labelled = checklist.rows.iter().filter(|r| !r.cells[0].is_empty()).count();
        assert_eq!(labelled, 7);
    }
}

#[test]
fn observations_are_padded_to_configured_rows() {
    let config = ExportConfig {
        observation_rows: 8,
        ..ExportConfig::default()
    };
    let view = normalize_report(&ReportRecord::new(json!({ "observations": ["Lens dusty"] })));
    let doc = render_report(&view, &config);
    let list = doc
        .blocks
        .iter()
        .find_map(|b| match b {
            report_forge::document::Block::NumberedList(items) => Some(items),
            _ => None,
        })
        .unwrap();
    assert_eq!(list.len(), 8);
    assert_eq!(list[0], "Lens dusty");
}

// =====================================================================
// Primary path
// =====================================================================

#[tokio::test]
async fn full_export_produces_named_pdf() {
    let saver = Arc::new(MemorySave::default());
    let rasterizer = BitmapRasterizer::new(&ExportConfig::default(), DocumentContext::new());
    let exporter = exporter(
        Arc::new(rasterizer),
        saver.clone(),
        Arc::new(MemoryPrinter::default()),
        Arc::new(FixedRecovery(Recovery::Abort)),
    );

    let outcome = exporter
        .export_report_on(&report("ASCOMP-12345"), export_date())
        .await
        .unwrap();
    let (file_name, page_count) = match outcome {
        ExportOutcome::Saved {
            file_name,
            page_count,
        } => (file_name, page_count),
        other => panic!("expected a saved artifact, got {other:?}"),
    };
    assert_eq!(file_name, "ASCOMP_Report_ASCOMP-12345_2024-03-01.pdf");

    let artifacts = saver.artifacts.lock().unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].page_count, page_count);
    assert_valid_pdf(&artifacts[0].bytes);
}

#[tokio::test]
async fn exact_page_multiple_adds_blank_page() {
    // 210 px wide maps 1 px to 1 mm, so 594 px is exactly two A4 pages.
    let saver = Arc::new(MemorySave::default());
    let exporter = exporter(
        FixedRaster::new(210, 594),
        saver.clone(),
        Arc::new(MemoryPrinter::default()),
        Arc::new(FixedRecovery(Recovery::Abort)),
    );
    let outcome = exporter
        .export_report_on(&report("R-1"), export_date())
        .await
        .unwrap();
    assert!(matches!(outcome, ExportOutcome::Saved { page_count: 3, .. }));
}

#[tokio::test]
async fn batch_exports_stay_independent() {
    let rasterizer = FixedRaster::new(210, 100);
    let saver = Arc::new(MemorySave::default());
    let exporter = exporter(
        rasterizer.clone(),
        saver.clone(),
        Arc::new(MemoryPrinter::default()),
        Arc::new(FixedRecovery(Recovery::Abort)),
    );

    let records = [report("R-1"), report("R-2"), report("R-3")];
    let outcomes = exporter.export_reports(&records).await;
    assert!(outcomes.iter().all(Result::is_ok));

    let seen = rasterizer.seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    for (title, number) in seen.iter().zip(["R-1", "R-2", "R-3"]) {
        assert!(title.ends_with(number), "{title} should belong to {number}");
    }
    let names: Vec<String> = saver
        .artifacts
        .lock()
        .unwrap()
        .iter()
        .map(|a| a.file_name.clone())
        .collect();
    assert!(names[0].contains("_R-1_"));
    assert!(names[1].contains("_R-2_"));
    assert!(names[2].contains("_R-3_"));
}

#[tokio::test]
async fn sequential_real_exports_share_one_context() {
    let context = DocumentContext::new();
    let rasterizer = BitmapRasterizer::new(&ExportConfig::default(), Arc::clone(&context));
    let saver = Arc::new(MemorySave::default());
    let exporter = exporter(
        Arc::new(rasterizer),
        saver.clone(),
        Arc::new(MemoryPrinter::default()),
        Arc::new(FixedRecovery(Recovery::Abort)),
    );
    let outcomes = exporter.export_reports(&[report("A-1"), report("A-2")]).await;
    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(context.attached_surface(), None);
}

#[tokio::test]
async fn rasterization_is_reproducible() {
    let config = ExportConfig::default();
    let view = normalize_report(&report("ASCOMP-1"));
    let doc = render_report(&view, &config);
    let rasterizer = BitmapRasterizer::new(&config, DocumentContext::new());

    let first = rasterizer.rasterize(&doc).await.unwrap();
    let second = rasterizer.rasterize(&doc).await.unwrap();
    assert_eq!(
        Sha256::digest(first.image.as_raw()),
        Sha256::digest(second.image.as_raw())
    );
}

// =====================================================================
// Failure routing
// =====================================================================

#[tokio::test]
async fn failing_rasterizer_routes_to_fallback() {
    let printer = Arc::new(MemoryPrinter::default());
    let prompt = CountingPrompt::new(Recovery::Fallback);
    let exporter = exporter(
        Arc::new(AlwaysFails),
        Arc::new(MemorySave::default()),
        printer.clone(),
        prompt.clone(),
    );

    let outcome = exporter
        .export_report_on(&report("ASCOMP-98765"), export_date())
        .await
        .unwrap();
    assert!(matches!(outcome, ExportOutcome::Printed { .. }));
    assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);

    let printed = printer.printed.lock().unwrap();
    assert_eq!(printed.len(), 1);
    assert!(printed[0].html.contains("ASCOMP-98765"));
    assert!(printed[0].html.contains("Galaxy Cinema"));
}

#[tokio::test]
async fn abort_reraises_the_cause() {
    let printer = Arc::new(MemoryPrinter::default());
    let exporter = exporter(
        Arc::new(AlwaysFails),
        Arc::new(MemorySave::default()),
        printer.clone(),
        Arc::new(FixedRecovery(Recovery::Abort)),
    );
    let err = exporter
        .export_report_on(&report("R-1"), export_date())
        .await
        .unwrap_err();
    match err {
        ExportError::Aborted { cause } => {
            assert!(matches!(*cause, ExportError::Rasterization(_)))
        }
        other => panic!("expected Aborted, got {other:?}"),
    }
    assert!(printer.printed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn save_errors_propagate_without_prompting() {
    let prompt = CountingPrompt::new(Recovery::Fallback);
    let exporter = exporter(
        FixedRaster::new(210, 100),
        Arc::new(FailingSave),
        Arc::new(MemoryPrinter::default()),
        prompt.clone(),
    );
    let err = exporter
        .export_report_on(&report("R-1"), export_date())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Save(_)));
    assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn busy_surface_fails_then_recovers() {
    let context = DocumentContext::new();
    let rasterizer = BitmapRasterizer::new(&ExportConfig::default(), Arc::clone(&context));
    let doc = render_report(
        &normalize_report(&report("R-1")),
        &ExportConfig::default(),
    );

    let held = context.attach(1, 1).unwrap();
    let err = rasterizer.rasterize(&doc).await.unwrap_err();
    assert!(err.is_recoverable());
    drop(held);

    assert!(rasterizer.rasterize(&doc).await.is_ok());
    assert_eq!(context.attached_surface(), None);
}

#[tokio::test]
async fn oversized_raster_is_released_and_falls_back() {
    let context = DocumentContext::new();
    let config = ExportConfig {
        max_raster_pixels: 10_000,
        ..ExportConfig::default()
    };
    let rasterizer = BitmapRasterizer::new(&config, Arc::clone(&context));
    let printer = Arc::new(MemoryPrinter::default());
    let exporter = Exporter::new(
        config,
        Arc::new(rasterizer),
        Arc::new(MemorySave::default()),
        printer.clone(),
        Arc::new(FixedRecovery(Recovery::Fallback)),
    );

    let outcome = exporter
        .export_report_on(&report("BIG-1"), export_date())
        .await
        .unwrap();
    assert!(matches!(outcome, ExportOutcome::Printed { .. }));
    assert_eq!(context.attached_surface(), None);
    assert_eq!(printer.printed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn oversampling_is_clamped_and_pages_cover_the_raster() {
    let config = ExportConfig {
        oversampling: 0.5,
        ..ExportConfig::default()
    };
    let view = normalize_report(&report("ASCOMP-7"));
    let doc = render_report(&view, &config);
    let rasterizer = BitmapRasterizer::new(&config, DocumentContext::new());

    let raster = rasterizer.rasterize(&doc).await.unwrap();
    assert_eq!(raster.scale, 2.0);

    let (_, height) = raster.image.dimensions();
    let pages = paginate(&raster, config.page_width_mm, config.page_height_mm).unwrap();
    let covered: u32 = pages.iter().map(|p| p.content_rows).sum();
    assert_eq!(covered, height);
}
