//! Export configuration – page geometry, raster limits, naming and
//! letterhead text. Serialisable so hosts can keep it next to their own
//! settings.

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};

/// Lowest oversampling factor that keeps printed text legible.
pub const MIN_OVERSAMPLING: f32 = 2.0;

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Configuration shared by every stage of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Target paper width in millimetres (default: A4 = 210).
    pub page_width_mm: f32,
    /// Target paper height in millimetres (default: A4 = 297).
    pub page_height_mm: f32,
    /// Margin around the laid-out document, in points.
    pub page_margin_pt: f32,
    /// Raster pixels per layout point. Clamped to [`MIN_OVERSAMPLING`].
    pub oversampling: f32,
    /// Rasters larger than this are refused as resource exhaustion.
    pub max_raster_pixels: u64,
    /// Number of numbered observation rows printed on a report.
    pub observation_rows: usize,
    /// File-name prefix for per-report artifacts.
    pub report_prefix: String,
    /// File-name prefix for per-site artifacts.
    pub site_prefix: String,
    /// File-name extension of the paginated artifact.
    pub extension: String,
    /// How many times the primary path may be retried on request.
    pub max_retries: u32,
    pub letterhead: Letterhead,
}

/// Company block printed at the top of every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Letterhead {
    pub company: String,
    pub tagline: String,
    pub contact: String,
}

impl Default for Letterhead {
    fn default() -> Self {
        Self {
            company: "ASCOMP INC.".to_string(),
            tagline: "Cinema Projection Service & Maintenance".to_string(),
            contact: "service@ascomp.example".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            page_margin_pt: 28.0,
            oversampling: MIN_OVERSAMPLING,
            max_raster_pixels: 80_000_000,
            observation_rows: 6,
            report_prefix: "ASCOMP_Report".to_string(),
            site_prefix: "ASCOMP_Site".to_string(),
            extension: "pdf".to_string(),
            max_retries: 2,
            letterhead: Letterhead::default(),
        }
    }
}

impl ExportConfig {
    /// Page width in points, the fixed logical width documents are laid out at.
    pub fn page_width_pt(&self) -> f32 {
        self.page_width_mm * PT_PER_MM
    }

    /// Oversampling factor actually used by the rasterizer.
    pub fn effective_oversampling(&self) -> f32 {
        if self.oversampling.is_finite() {
            self.oversampling.max(MIN_OVERSAMPLING)
        } else {
            MIN_OVERSAMPLING
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> ExportResult<Self> {
        serde_json::from_str(json).map_err(|e| ExportError::InvalidInput(e.to_string()))
    }
}
