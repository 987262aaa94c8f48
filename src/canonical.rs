//! Canonical rows printed on the paper service form.
//!
//! These stand in for absent collections so every table keeps the row
//! count of the printed form no matter how malformed the input is.

/// Canonical checklist row: description plus the form's pre-printed status
/// and result columns.
pub type CanonicalItem = (&'static str, &'static str, &'static str);

pub const OPTICS: [CanonicalItem; 5] = [
    ("Reflector", "-", "OK"),
    ("UV filter", "-", "OK"),
    ("Integrator Rod", "-", "OK"),
    ("Cold Mirror", "-", "OK"),
    ("Fold Mirror", "-", "OK"),
];

pub const ELECTRONICS: [CanonicalItem; 6] = [
    ("Touch Panel", "-", "OK"),
    ("EVB Board", "-", "OK"),
    ("IMCB Board/s", "-", "OK"),
    ("PIB Board", "-", "OK"),
    ("ICP Board", "-", "OK"),
    ("IMB/S Board", "-", "OK"),
];

pub const SERIAL_VERIFICATION: [CanonicalItem; 1] =
    [("Chassis label vs Touch Panel", "-", "OK")];

pub const CONSUMABLES: [CanonicalItem; 1] = [("Air Intake, LAD and RAD", "-", "OK")];

pub const COOLANT: [CanonicalItem; 1] = [("Level and Color", "-", "OK")];

pub const LIGHT_ENGINE: [CanonicalItem; 5] = [
    ("White", "-", "OK"),
    ("Red", "-", "OK"),
    ("Green", "-", "OK"),
    ("Blue", "-", "OK"),
    ("Black", "-", "OK"),
];

pub const MECHANICAL: [CanonicalItem; 9] = [
    ("AC blower and Vane Switch", "-", "OK"),
    ("Extractor Vane Switch", "-", "OK"),
    ("Exhaust CFM", "-", "OK"),
    ("Light Engine 4 fans with LAD fan", "-", "OK"),
    ("Card Cage Top and Bottom fans", "-", "OK"),
    ("Radiator fan and Pump", "-", "OK"),
    ("Connector and hose for the Pump", "-", "OK"),
    ("Security and lamp house lock switch", "-", "OK"),
    ("Lamp LOC Mechanism X, Y and Z movement", "-", "OK"),
];

pub const OBSERVATIONS: [&str; 3] = [
    "Projector inspected and cleaned as per preventive maintenance schedule.",
    "Air filters checked; no abnormal dust accumulation.",
    "Image quality verified on test patterns.",
];

/// Part name, part number, quantity, notes.
pub const RECOMMENDED_PARTS: [(&str, &str, &str, &str); 1] = [("-", "-", "-", "-")];

pub const COLOR_PATTERNS: [&str; 4] = ["White", "Red", "Green", "Blue"];

/// Labels of the ten image-evaluation questions, in printed order.
pub const IMAGE_EVALUATION_LABELS: [&str; 10] = [
    "Focus / boresight",
    "Integration rod position",
    "Spot on the wall",
    "Screen cropping (FLAT & SCOPE)",
    "Convergence checked",
    "Channels checked (Scope, Flat, Alternative)",
    "Pixel defects",
    "Excessive image vibration",
    "LiteLOC",
    "Overall image quality",
];

pub const SITE_ANALYTICS: [&str; 4] = [
    "Average lamp hours",
    "Reports this quarter",
    "Open issues",
    "Parts recommended",
];

pub const SITE_RECOMMENDATIONS: [&str; 1] =
    ["Continue the quarterly preventive maintenance schedule."];
