//! Normalizer – resolves a loosely-typed record into a complete view.
//!
//! Pure and infallible: every unresolved field falls back to a literal
//! default and every absent collection to its canonical rows.

use serde_json::Value;

use crate::canonical::{self, CanonicalItem};
use crate::record::{ReportRecord, SiteRecord};
use crate::resolve::{first_collection, item_text, lookup, scalar_text, Field};

// ---------------------------------------------------------------------------
// Field tables
// ---------------------------------------------------------------------------

const REPORT_NUMBER: Field = Field::new(
    &["reportNumber", "report_number", "reportNo", "number", "id"],
    "N/A",
);
const REPORT_TYPE: Field = Field::new(&["reportType", "type", "serviceType"], "Service Report");
const REPORT_DATE: Field = Field::new(&["date", "reportDate", "serviceDate", "createdAt"], "-");
const STATUS: Field = Field::new(&["status", "reportStatus", "state"], "Draft");

const SITE_NAME: Field = Field::new(&["site.name", "siteName", "siteInfo.name", "cinemaName"], "-");
const SITE_ADDRESS: Field = Field::new(
    &[
        "site.address",
        "siteAddress",
        "siteInfo.address",
        "address",
    ],
    "-",
);
const SITE_INCHARGE: Field = Field::new(
    &["siteIncharge.name", "siteInchargeName", "site.contactPerson", "contactPerson"],
    "-",
);
const CONTACT_NUMBER: Field = Field::new(
    &["siteIncharge.contact", "siteInchargeContact", "site.phone", "contactNumber"],
    "-",
);
const ENGINEER: Field = Field::new(
    &[
        "engineer.name",
        "engineerName",
        "technician.name",
        "technicianName",
        "fse.name",
        "fseName",
    ],
    "-",
);

const PROJECTOR_MODEL: Field = Field::new(&["projector.model", "projectorModel", "model"], "-");
const PROJECTOR_SERIAL: Field = Field::new(
    &["projector.serialNumber", "projectorSerial", "serialNumber", "serial"],
    "-",
);
const BRAND: Field = Field::new(&["projector.brand", "brand", "projectorBrand"], "-");
const SOFTWARE_VERSION: Field = Field::new(&["projector.softwareVersion", "softwareVersion"], "-");
const PROJECTOR_HOURS: Field = Field::new(
    &["projector.runningHours", "projectorRunningHours", "projectorHours"],
    "-",
);
const LAMP_MODEL: Field = Field::new(&["lamp.model", "lampModel", "lampMake"], "-");
const LAMP_TOTAL_HOURS: Field = Field::new(
    &[
        "lamp.totalHours",
        "lampRunningHours",
        "lampHours",
    ],
    "-",
);
const LAMP_CURRENT_HOURS: Field = Field::new(
    &[
        "lamp.currentHours",
        "currentLampHours",
        "currentLampRunningHours",
    ],
    "-",
);

const VOLTAGE_PN: Field = Field::new(&["voltageParameters.pVsN", "voltage.pVsN", "pVsN"], "-");
const VOLTAGE_PE: Field = Field::new(&["voltageParameters.pVsE", "voltage.pVsE", "pVsE"], "-");
const VOLTAGE_NE: Field = Field::new(&["voltageParameters.nVsE", "voltage.nVsE", "nVsE"], "-");

const SCREEN_MAKE: Field = Field::new(&["screenInfo.make", "screen.make", "screenMake"], "-");
const SCOPE_HEIGHT: Field = Field::new(
    &[
        "screenInfo.scope.height",
        "screen.scopeHeight",
        "scopeHeight",
    ],
    "-",
);
const SCOPE_WIDTH: Field = Field::new(
    &[
        "screenInfo.scope.width",
        "screen.scopeWidth",
        "scopeWidth",
    ],
    "-",
);
const SCOPE_GAIN: Field = Field::new(
    &[
        "screenInfo.scope.gain",
        "screen.scopeGain",
        "scopeGain",
    ],
    "-",
);
const FLAT_HEIGHT: Field = Field::new(
    &[
        "screenInfo.flat.height",
        "screen.flatHeight",
        "flatHeight",
    ],
    "-",
);
const FLAT_WIDTH: Field = Field::new(
    &[
        "screenInfo.flat.width",
        "screen.flatWidth",
        "flatWidth",
    ],
    "-",
);
const FLAT_GAIN: Field = Field::new(&["screenInfo.flat.gain", "screen.flatGain", "flatGain"], "-");
const THROW_DISTANCE: Field = Field::new(
    &[
        "screenInfo.throwDistance",
        "throwDistance",
        "screen.throwDistance",
    ],
    "-",
);

const HCHO: Field = Field::new(&["airPollutionLevel.hcho", "airQuality.hcho", "hcho"], "-");
const TVOC: Field = Field::new(&["airPollutionLevel.tvoc", "airQuality.tvoc", "tvoc"], "-");
const PM1: Field = Field::new(&["airPollutionLevel.pm1", "airQuality.pm1", "pm1"], "-");
const PM2_5: Field = Field::new(&["airPollutionLevel.pm2_5", "airQuality.pm25", "pm2_5"], "-");
const PM10: Field = Field::new(&["airPollutionLevel.pm10", "airQuality.pm10", "pm10"], "-");
const TEMPERATURE: Field = Field::new(
    &["airPollutionLevel.temperature", "environment.temperature", "temperature"],
    "-",
);
const HUMIDITY: Field = Field::new(
    &["airPollutionLevel.humidity", "environment.humidity", "humidity"],
    "-",
);

const REMARKS: Field = Field::new(&["remarks", "engineerRemarks", "comments"], "-");

/// Candidate paths per image-evaluation question, in printed order.
const IMAGE_EVALUATION: [&[&str]; 10] = [
    &["imageEvaluation.focusBoresight", "imageEval.focus", "focusBoresight"],
    &[
        "imageEvaluation.integrationRodPosition",
        "imageEval.integrationRod",
        "integrationRodPosition",
    ],
    &["imageEvaluation.spotOnWall", "imageEval.spotOnWall", "spotOnWall"],
    &["imageEvaluation.screenCropping", "imageEval.cropping", "screenCropping"],
    &["imageEvaluation.convergenceChecked", "imageEval.convergence", "convergenceChecked"],
    &["imageEvaluation.channelsChecked", "imageEval.channels", "channelsChecked"],
    &["imageEvaluation.pixelDefects", "imageEval.pixelDefects", "pixelDefects"],
    &["imageEvaluation.imageVibration", "imageEval.vibration", "imageVibration"],
    &["imageEvaluation.liteLoc", "imageEval.liteLoc", "liteLoc"],
    &["imageEvaluation.imageQuality", "imageEval.quality", "imageQuality"],
];

const OBSERVATION_LISTS: &[&str] = &["observations", "remarksList", "findings"];
const OBSERVATION_KEYS: &[&str] = &["description", "text", "observation"];
const PART_LISTS: &[&str] = &["recommendedParts", "parts", "spareParts"];
const MCGD_LISTS: &[&str] = &["colorMeasurements.mcgd", "mcgdData", "colorCoordinates"];
const CIE_LISTS: &[&str] = &[
    "colorMeasurements.cieXyz",
    "cieXyzData",
    "measuredColorCoordinates",
];

const SITE_CODE: Field = Field::new(&["siteCode", "code", "site.code", "siteId"], "SITE");
const REGION: Field = Field::new(&["region", "site.region", "zone"], "-");
const TOTAL_REPORTS: Field = Field::new(
    &[
        "counts.totalReports",
        "totalReports",
        "reportCount",
    ],
    "-",
);
const COMPLETED_REPORTS: Field = Field::new(
    &[
        "counts.completed",
        "completedReports",
        "closedReports",
    ],
    "-",
);
const PENDING_REPORTS: Field = Field::new(
    &[
        "counts.pending",
        "pendingReports",
        "openReports",
    ],
    "-",
);
const PROJECTOR_COUNT: Field = Field::new(
    &[
        "counts.projectors",
        "projectorCount",
        "site.projectorCount",
    ],
    "-",
);
const LAST_VISIT: Field = Field::new(&["lastVisit", "lastServiceDate", "counts.lastVisit"], "-");

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// The checklist groups, in the order the form prints them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecklistGroupKind {
    Optics,
    Electronics,
    SerialVerification,
    Consumables,
    Coolant,
    LightEngine,
    Mechanical,
}

/// Fixed print order of the checklist table.
pub const CHECKLIST_ORDER: [ChecklistGroupKind; 7] = [
    ChecklistGroupKind::Optics,
    ChecklistGroupKind::Electronics,
    ChecklistGroupKind::SerialVerification,
    ChecklistGroupKind::Consumables,
    ChecklistGroupKind::Coolant,
    ChecklistGroupKind::LightEngine,
    ChecklistGroupKind::Mechanical,
];

impl ChecklistGroupKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Optics => "OPTICALS",
            Self::Electronics => "ELECTRONICS",
            Self::SerialVerification => "SERIAL NUMBER VERIFIED",
            Self::Consumables => "DISPOSABLE CONSUMABLES",
            Self::Coolant => "COOLANT",
            Self::LightEngine => "LIGHT ENGINE TEST PATTERN",
            Self::Mechanical => "MECHANICAL",
        }
    }

    pub fn canonical(self) -> &'static [CanonicalItem] {
        match self {
            Self::Optics => &canonical::OPTICS,
            Self::Electronics => &canonical::ELECTRONICS,
            Self::SerialVerification => &canonical::SERIAL_VERIFICATION,
            Self::Consumables => &canonical::CONSUMABLES,
            Self::Coolant => &canonical::COOLANT,
            Self::LightEngine => &canonical::LIGHT_ENGINE,
            Self::Mechanical => &canonical::MECHANICAL,
        }
    }

    fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Optics => &["sections.opticals", "opticals", "checklist.optics", "optics"],
            Self::Electronics => &["sections.electronics", "electronics", "checklist.electronics"],
            Self::SerialVerification => &[
                "sections.serialNumberVerified",
                "serialNumberVerified",
                "checklist.serialVerification",
            ],
            Self::Consumables => &[
                "sections.disposableConsumables",
                "disposableConsumables",
                "checklist.consumables",
            ],
            Self::Coolant => &["sections.coolant", "coolant", "checklist.coolant"],
            Self::LightEngine => &[
                "sections.lightEngineTestPatterns",
                "lightEngineTestPatterns",
                "checklist.lightEngine",
            ],
            Self::Mechanical => &["sections.mechanical", "mechanical", "checklist.mechanical"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub description: String,
    pub status: String,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistGroup {
    pub kind: ChecklistGroupKind,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRow {
    pub name: String,
    pub number: String,
    pub quantity: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorReading {
    pub pattern: String,
    pub x: String,
    pub y: String,
    pub fl: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCheck {
    pub label: &'static str,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoltageReadings {
    pub p_vs_n: String,
    pub p_vs_e: String,
    pub n_vs_e: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub make: String,
    pub scope_height: String,
    pub scope_width: String,
    pub scope_gain: String,
    pub flat_height: String,
    pub flat_width: String,
    pub flat_gain: String,
    pub throw_distance: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirQuality {
    pub hcho: String,
    pub tvoc: String,
    pub pm1: String,
    pub pm2_5: String,
    pub pm10: String,
    pub temperature: String,
    pub humidity: String,
}

/// A report record with every field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    pub report_number: String,
    pub report_type: String,
    pub date: String,
    pub status: String,
    pub site_name: String,
    pub site_address: String,
    pub site_incharge: String,
    pub contact_number: String,
    pub engineer: String,
    pub projector_model: String,
    pub projector_serial: String,
    pub brand: String,
    pub software_version: String,
    pub projector_hours: String,
    pub lamp_model: String,
    pub lamp_total_hours: String,
    pub lamp_current_hours: String,
    pub checklist: Vec<ChecklistGroup>,
    pub observations: Vec<String>,
    pub recommended_parts: Vec<PartRow>,
    pub image_evaluation: Vec<ImageCheck>,
    pub voltage: VoltageReadings,
    pub mcgd: Vec<ColorReading>,
    pub cie_xyz: Vec<ColorReading>,
    pub screen: ScreenGeometry,
    pub air_quality: AirQuality,
    pub remarks: String,
}

impl ReportView {
    /// The resolved rows of one checklist group.
    pub fn checklist_group(&self, kind: ChecklistGroupKind) -> &[ChecklistItem] {
        self.checklist
            .iter()
            .find(|g| g.kind == kind)
            .map(|g| g.items.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsRow {
    pub label: String,
    pub value: String,
}

/// A site record with every field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteView {
    pub site_name: String,
    pub site_code: String,
    pub address: String,
    pub region: String,
    pub contact_person: String,
    pub contact_number: String,
    pub total_reports: String,
    pub completed_reports: String,
    pub pending_reports: String,
    pub projector_count: String,
    pub last_visit: String,
    pub analytics: Vec<AnalyticsRow>,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Resolve a report record into a complete view. Never fails.
pub fn normalize_report(record: &ReportRecord) -> ReportView {
    let root = record.value();

    let view = ReportView {
        report_number: REPORT_NUMBER.resolve(root),
        report_type: REPORT_TYPE.resolve(root),
        date: REPORT_DATE.resolve(root),
        status: STATUS.resolve(root),
        site_name: SITE_NAME.resolve(root),
        site_address: SITE_ADDRESS.resolve(root),
        site_incharge: SITE_INCHARGE.resolve(root),
        contact_number: CONTACT_NUMBER.resolve(root),
        engineer: ENGINEER.resolve(root),
        projector_model: PROJECTOR_MODEL.resolve(root),
        projector_serial: PROJECTOR_SERIAL.resolve(root),
        brand: BRAND.resolve(root),
        software_version: SOFTWARE_VERSION.resolve(root),
        projector_hours: PROJECTOR_HOURS.resolve(root),
        lamp_model: LAMP_MODEL.resolve(root),
        lamp_total_hours: LAMP_TOTAL_HOURS.resolve(root),
        lamp_current_hours: LAMP_CURRENT_HOURS.resolve(root),
        checklist: CHECKLIST_ORDER
            .iter()
            .map(|&kind| ChecklistGroup {
                kind,
                items: checklist_items(root, kind),
            })
            .collect(),
        observations: observations(root),
        recommended_parts: recommended_parts(root),
        image_evaluation: IMAGE_EVALUATION
            .iter()
            .zip(canonical::IMAGE_EVALUATION_LABELS)
            .map(|(candidates, label)| ImageCheck {
                label,
                answer: Field::new(*candidates, "-").resolve(root),
            })
            .collect(),
        voltage: VoltageReadings {
            p_vs_n: VOLTAGE_PN.resolve(root),
            p_vs_e: VOLTAGE_PE.resolve(root),
            n_vs_e: VOLTAGE_NE.resolve(root),
        },
        mcgd: color_readings(root, MCGD_LISTS),
        cie_xyz: color_readings(root, CIE_LISTS),
        screen: ScreenGeometry {
            make: SCREEN_MAKE.resolve(root),
            scope_height: SCOPE_HEIGHT.resolve(root),
            scope_width: SCOPE_WIDTH.resolve(root),
            scope_gain: SCOPE_GAIN.resolve(root),
            flat_height: FLAT_HEIGHT.resolve(root),
            flat_width: FLAT_WIDTH.resolve(root),
            flat_gain: FLAT_GAIN.resolve(root),
            throw_distance: THROW_DISTANCE.resolve(root),
        },
        air_quality: AirQuality {
            hcho: HCHO.resolve(root),
            tvoc: TVOC.resolve(root),
            pm1: PM1.resolve(root),
            pm2_5: PM2_5.resolve(root),
            pm10: PM10.resolve(root),
            temperature: TEMPERATURE.resolve(root),
            humidity: HUMIDITY.resolve(root),
        },
        remarks: REMARKS.resolve(root),
    };

    log::debug!(
        "normalized report {} ({} observations, {} parts)",
        view.report_number,
        view.observations.len(),
        view.recommended_parts.len()
    );
    view
}

/// Resolve a site record into a complete view. Never fails.
pub fn normalize_site(record: &SiteRecord) -> SiteView {
    let root = record.value();

    let analytics = analytics_rows(root).unwrap_or_else(|| {
        canonical::SITE_ANALYTICS
            .iter()
            .map(|label| AnalyticsRow {
                label: label.to_string(),
                value: "-".to_string(),
            })
            .collect()
    });

    let recommendations = text_list(
        root,
        &["recommendations", "siteRecommendations"],
        OBSERVATION_KEYS,
    )
    .unwrap_or_else(|| owned(&canonical::SITE_RECOMMENDATIONS));

    SiteView {
        site_name: SITE_NAME.resolve(root),
        site_code: SITE_CODE.resolve(root),
        address: SITE_ADDRESS.resolve(root),
        region: REGION.resolve(root),
        contact_person: SITE_INCHARGE.resolve(root),
        contact_number: CONTACT_NUMBER.resolve(root),
        total_reports: TOTAL_REPORTS.resolve(root),
        completed_reports: COMPLETED_REPORTS.resolve(root),
        pending_reports: PENDING_REPORTS.resolve(root),
        projector_count: PROJECTOR_COUNT.resolve(root),
        last_visit: LAST_VISIT.resolve(root),
        analytics,
        recommendations,
    }
}

/// Merge input rows onto the canonical rows, keeping the canonical count.
fn checklist_items(root: &Value, kind: ChecklistGroupKind) -> Vec<ChecklistItem> {
    let input = first_collection(root, kind.candidates()).unwrap_or_default();
    kind.canonical()
        .iter()
        .enumerate()
        .map(|(i, &(description, status, result))| {
            let item = input.get(i).copied();
            // A bare string is the legacy shape for a status-only row.
            let bare = item.and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty());
            let cell = |keys: &[&str], fallback: &str| {
                item.and_then(|v| item_text(v, keys))
                    .unwrap_or_else(|| fallback.to_string())
            };
            ChecklistItem {
                description: cell(&["description", "name", "item"], description),
                status: match bare {
                    Some(s) => s.trim().to_string(),
                    None => cell(&["status", "value"], status),
                },
                result: cell(&["result", "yesNoOk", "ok"], result),
            }
        })
        .collect()
}

fn observations(root: &Value) -> Vec<String> {
    text_list(root, OBSERVATION_LISTS, OBSERVATION_KEYS)
        .unwrap_or_else(|| owned(&canonical::OBSERVATIONS))
}

/// A list of strings or of objects carrying the text under one of `keys`.
fn text_list(root: &Value, lists: &[&str], keys: &[&str]) -> Option<Vec<String>> {
    let items: Vec<String> = first_collection(root, lists)?
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => item_text(item, keys),
        })
        .collect();
    (!items.is_empty()).then_some(items)
}

fn recommended_parts(root: &Value) -> Vec<PartRow> {
    let cell =
        |item: &Value, keys: &[&str]| item_text(item, keys).unwrap_or_else(|| "-".to_string());
    first_collection(root, PART_LISTS)
        .map(|items| {
            items
                .into_iter()
                .map(|item| PartRow {
                    name: cell(item, &["partName", "name", "description"]),
                    number: cell(item, &["partNumber", "number", "code"]),
                    quantity: cell(item, &["quantity", "qty"]),
                    notes: cell(item, &["notes", "remarks"]),
                })
                .collect()
        })
        .unwrap_or_else(|| {
            canonical::RECOMMENDED_PARTS
                .iter()
                .map(|&(name, number, quantity, notes)| PartRow {
                    name: name.to_string(),
                    number: number.to_string(),
                    quantity: quantity.to_string(),
                    notes: notes.to_string(),
                })
                .collect()
        })
}

fn color_readings(root: &Value, lists: &[&str]) -> Vec<ColorReading> {
    match first_collection(root, lists) {
        Some(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let fallback_pattern = canonical::COLOR_PATTERNS.get(i).copied().unwrap_or("-");
                ColorReading {
                    pattern: item_text(item, &["color", "pattern", "name", "testPattern"])
                        .unwrap_or_else(|| fallback_pattern.to_string()),
                    x: item_text(item, &["x"]).unwrap_or_else(|| "-".to_string()),
                    y: item_text(item, &["y"]).unwrap_or_else(|| "-".to_string()),
                    fl: item_text(item, &["fl", "fL", "luminance"])
                        .unwrap_or_else(|| "-".to_string()),
                }
            })
            .collect(),
        None => canonical::COLOR_PATTERNS
            .iter()
            .map(|pattern| ColorReading {
                pattern: pattern.to_string(),
                x: "-".to_string(),
                y: "-".to_string(),
                fl: "-".to_string(),
            })
            .collect(),
    }
}

/// Analytics come either as `[{label, value}]` or as a legacy label → value map.
fn analytics_rows(root: &Value) -> Option<Vec<AnalyticsRow>> {
    let value = lookup(root, "analytics").or_else(|| lookup(root, "analyticsSummary"))?;
    let rows: Vec<AnalyticsRow> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                Some(AnalyticsRow {
                    label: item_text(item, &["label", "name", "metric"])?,
                    value: item_text(item, &["value", "count"]).unwrap_or_else(|| "-".to_string()),
                })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(label, v)| AnalyticsRow {
                label: label.clone(),
                value: scalar_text(v).unwrap_or_else(|| "-".to_string()),
            })
            .collect(),
        _ => Vec::new(),
    };
    (!rows.is_empty()).then_some(rows)
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
