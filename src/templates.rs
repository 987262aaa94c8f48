//! Document templates – the service-report form and the per-site summary.
//!
//! The two builders share nothing but the letterhead: their sections do
//! not overlap. Layout order is owned here; views only supply cell values.

use crate::config::{ExportConfig, Letterhead};
use crate::document::{Block, DocumentKind, RenderedDocument, Table};
use crate::normalize::{ColorReading, ReportView, SiteView, CHECKLIST_ORDER};
use crate::style::Role;

fn letterhead(doc: &mut RenderedDocument, letterhead: &Letterhead, title: &str) {
    doc.push(Block::text(Role::Company, &letterhead.company));
    doc.push(Block::text(
        Role::Tagline,
        format!("{} | {}", letterhead.tagline, letterhead.contact),
    ));
    doc.push(Block::text(Role::Title, title.to_uppercase()));
}

fn pairs<V: AsRef<str>>(items: &[(&str, V)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(label, value)| (label.to_string(), value.as_ref().to_string()))
        .collect()
}

/// Build the detailed per-report document.
pub fn render_report(view: &ReportView, config: &ExportConfig) -> RenderedDocument {
    let mut doc = RenderedDocument::new(
        DocumentKind::ServiceReport,
        format!("{} {}", view.report_type, view.report_number),
    );

    letterhead(&mut doc, &config.letterhead, &view.report_type);
    doc.push(Block::Fields {
        pairs_per_row: 2,
        pairs: pairs(&[
            ("Report No.", &view.report_number),
            ("Date", &view.date),
        ]),
    });

    // Site and personnel
    doc.push(Block::text(Role::SectionHeading, "Site & Equipment"));
    doc.push(Block::Fields {
        pairs_per_row: 2,
        pairs: pairs(&[
            ("Site", &view.site_name),
            ("Address", &view.site_address),
            ("Site In-charge", &view.site_incharge),
            ("Contact", &view.contact_number),
            ("Engineer", &view.engineer),
            ("Brand", &view.brand),
            ("Projector Model", &view.projector_model),
            ("Serial No.", &view.projector_serial),
            ("Software Version", &view.software_version),
            ("Projector Hours", &view.projector_hours),
            ("Lamp Model", &view.lamp_model),
            ("Lamp Total Hours", &view.lamp_total_hours),
            ("Current Lamp Hours", &view.lamp_current_hours),
            ("Voltage P vs N", &view.voltage.p_vs_n),
            ("Voltage P vs E", &view.voltage.p_vs_e),
            ("Voltage N vs E", &view.voltage.n_vs_e),
        ]),
    });

    // One table, seven groups, label on the first row of each group only.
    doc.push(Block::text(Role::SectionHeading, "Inspection Checklist"));
    let mut checklist = Table::new(
        None,
        &["Section", "Description", "Status", "Result"],
        &[1.3, 2.2, 1.5, 0.8],
    );
    for kind in CHECKLIST_ORDER {
        for (i, item) in view.checklist_group(kind).iter().enumerate() {
            let label = if i == 0 { kind.label() } else { "" };
            checklist.push_row(
                [label, item.description.as_str(), item.status.as_str(), item.result.as_str()],
                true,
            );
        }
    }
    doc.push(Block::Table(checklist));

    doc.push(Block::text(Role::SectionHeading, "Observations & Remarks"));
    let observations = (0..config.observation_rows)
        .map(|i| view.observations.get(i).cloned().unwrap_or_default())
        .collect();
    doc.push(Block::NumberedList(observations));

    doc.push(Block::text(Role::SectionHeading, "Recommended Parts"));
    let mut parts = Table::new(
        None,
        &["#", "Part Name", "Part Number", "Qty", "Notes"],
        &[0.4, 2.0, 1.4, 0.6, 1.6],
    );
    for (i, part) in view.recommended_parts.iter().enumerate() {
        parts.push_row(
            [
                (i + 1).to_string(),
                part.name.clone(),
                part.number.clone(),
                part.quantity.clone(),
                part.notes.clone(),
            ],
            false,
        );
    }
    doc.push(Block::Table(parts));

    doc.push(Block::text(Role::SectionHeading, "Image Evaluation"));
    let mut evaluation = Table::new(None, &["Parameter", "Yes / No"], &[3.0, 1.0]);
    for check in &view.image_evaluation {
        evaluation.push_row([check.label, check.answer.as_str()], false);
    }
    doc.push(Block::Table(evaluation));

    doc.push(Block::text(Role::SectionHeading, "Color Measurements"));
    let color_table = |caption: &str, first: &str, readings: &[ColorReading]| {
        let mut table = Table::new(Some(caption), &[first, "x", "y", "fL"], &[1.4, 1.0, 1.0, 1.0]);
        for r in readings {
            table.push_row([&r.pattern, &r.x, &r.y, &r.fl], false);
        }
        Block::Table(table)
    };
    doc.push(Block::Columns(vec![
        color_table("Color Coordinates (MCGD)", "Color", &view.mcgd),
        color_table("CIE XYZ Color Accuracy", "Test Pattern", &view.cie_xyz),
    ]));

    doc.push(Block::text(Role::SectionHeading, "Screen Information"));
    let screen = &view.screen;
    doc.push(Block::Table(
        Table::new(
            Some(format!("Screen make: {}", screen.make).as_str()),
            &["Format", "Height (m)", "Width (m)", "Gain"],
            &[1.4, 1.0, 1.0, 1.0],
        )
        .row([
            "Scope",
            screen.scope_height.as_str(),
            screen.scope_width.as_str(),
            screen.scope_gain.as_str(),
        ])
        .row([
            "Flat",
            screen.flat_height.as_str(),
            screen.flat_width.as_str(),
            screen.flat_gain.as_str(),
        ])
        .row(["Throw distance (m)", screen.throw_distance.as_str(), "", ""]),
    ));

    doc.push(Block::text(Role::SectionHeading, "Air Quality"));
    let air = &view.air_quality;
    doc.push(Block::Table(
        Table::new(
            None,
            &["HCHO", "TVOC", "PM 1.0", "PM 2.5", "PM 10", "Temp (°C)", "Humidity (%)"],
            &[],
        )
        .row([
            &air.hcho,
            &air.tvoc,
            &air.pm1,
            &air.pm2_5,
            &air.pm10,
            &air.temperature,
            &air.humidity,
        ]),
    ));

    doc.push(Block::text(Role::SectionHeading, "Status"));
    doc.push(Block::Fields {
        pairs_per_row: 2,
        pairs: pairs(&[
            ("Report Status", &view.status),
            ("Remarks", &view.remarks),
            ("Engineer", &view.engineer),
            ("Site In-charge", &view.site_incharge),
        ]),
    });
    doc.push(Block::Spacer(18.0));
    doc.push(Block::Fields {
        pairs_per_row: 2,
        pairs: pairs(&[("Engineer Signature", ""), ("Customer Signature", "")]),
    });
    doc.push(Block::text(
        Role::Muted,
        format!(
            "{} - report {} generated from the service record of {}.",
            config.letterhead.company, view.report_number, view.date
        ),
    ));

    log::debug!("rendered report template with {} blocks", doc.blocks.len());
    doc
}

/// Build the aggregate per-site document.
pub fn render_site(view: &SiteView, config: &ExportConfig) -> RenderedDocument {
    let mut doc = RenderedDocument::new(
        DocumentKind::SiteSummary,
        format!("Site Summary {}", view.site_code),
    );

    letterhead(&mut doc, &config.letterhead, "Site Summary");

    doc.push(Block::text(Role::SectionHeading, "Site Details"));
    doc.push(Block::Fields {
        pairs_per_row: 2,
        pairs: pairs(&[
            ("Site", &view.site_name),
            ("Site Code", &view.site_code),
            ("Address", &view.address),
            ("Region", &view.region),
            ("Contact Person", &view.contact_person),
            ("Contact", &view.contact_number),
        ]),
    });

    doc.push(Block::text(Role::SectionHeading, "Service Counts"));
    doc.push(Block::Table(
        Table::new(
            None,
            &["Total Reports", "Completed", "Pending", "Projectors", "Last Visit"],
            &[],
        )
        .row([
            &view.total_reports,
            &view.completed_reports,
            &view.pending_reports,
            &view.projector_count,
            &view.last_visit,
        ]),
    ));

    doc.push(Block::text(Role::SectionHeading, "Analytics Summary"));
    let mut analytics = Table::new(None, &["Metric", "Value"], &[3.0, 1.0]);
    for row in &view.analytics {
        analytics.push_row([&row.label, &row.value], false);
    }
    doc.push(Block::Table(analytics));

    doc.push(Block::text(Role::SectionHeading, "Recommendations"));
    doc.push(Block::NumberedList(view.recommendations.clone()));

    doc.push(Block::text(
        Role::Muted,
        format!("{} - site summary for {}.", config.letterhead.company, view.site_name),
    ));

    log::debug!("rendered site template with {} blocks", doc.blocks.len());
    doc
}
