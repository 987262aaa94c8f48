//! # report-forge – service-report document pipeline
//!
//! Turns one loosely-typed maintenance report record into a paginated,
//! print-quality PDF. The pipeline stages are:
//!
//! 1. **Normalize** – resolve every field through its fallback chain ([`normalize`])
//! 2. **Render** – build the visual document tree ([`templates`], [`document`])
//! 3. **Rasterize** – lay out with Taffy and paint one tall bitmap ([`layout`], [`raster`])
//! 4. **Paginate** – slice into page bands and embed them in a PDF ([`pagination`], [`assemble`])
//!
//! When rasterization or assembly fails and the user agrees, the same
//! content is printed as standalone HTML instead ([`fallback`]). The
//! [`export`] module owns that decision.

pub mod assemble;
pub mod canonical;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod fallback;
pub mod fonts;
pub mod layout;
pub mod normalize;
pub mod pagination;
pub mod raster;
pub mod record;
pub mod resolve;
pub mod style;
pub mod templates;

// Re-exports for convenience
pub use assemble::{artifact_file_name, PaginatedArtifact};
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use export::{
    DirectorySave, ExportOutcome, Exporter, FixedRecovery, LogNotifier, Notice, NoticeLevel,
    Notifier, Recovery, RecoveryPrompt, SaveFacility,
};
pub use fallback::{PrintFacility, PrintableDocument};
pub use normalize::{normalize_report, normalize_site, ReportView, SiteView};
pub use raster::{BitmapRasterizer, DocumentContext, RasterImage, Rasterizer};
pub use record::{ReportRecord, SiteRecord};
