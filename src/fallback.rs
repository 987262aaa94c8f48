//! Fallback path – the same content as a standalone, self-styled HTML page
//! for the host's print facility. No rasterization is involved.

use std::fmt::Write as _;

use crate::config::ExportConfig;
use crate::document::{Block, RenderedDocument, Table};
use crate::error::ExportResult;
use crate::normalize::{ReportView, SiteView};
use crate::style::{self, Role};
use crate::templates::{render_report, render_site};

/// A print-ready document handed to a [`PrintFacility`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintableDocument {
    pub title: String,
    pub html: String,
}

/// The host's native print facility.
pub trait PrintFacility: Send + Sync {
    fn print(&self, document: &PrintableDocument) -> ExportResult<()>;
}

pub fn render_printable_report(view: &ReportView, config: &ExportConfig) -> PrintableDocument {
    to_printable(&render_report(view, config), config)
}

pub fn render_printable_site(view: &SiteView, config: &ExportConfig) -> PrintableDocument {
    to_printable(&render_site(view, config), config)
}

/// Serialize a rendered document to a standalone HTML page.
pub fn to_printable(document: &RenderedDocument, config: &ExportConfig) -> PrintableDocument {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(&document.title));
    html.push_str("<style>\n");
    let _ = writeln!(
        html,
        "@page {{ size: {}mm {}mm; margin: {}pt; }}",
        config.page_width_mm, config.page_height_mm, config.page_margin_pt
    );
    html.push_str(BASE_CSS);
    html.push_str(&style::stylesheet());
    html.push_str("</style>\n</head>\n<body>\n");
    for block in &document.blocks {
        write_block(&mut html, block);
    }
    html.push_str("</body>\n</html>\n");

    PrintableDocument {
        title: document.title.clone(),
        html,
    }
}

const BASE_CSS: &str = "\
body { font-family: Helvetica, Arial, sans-serif; margin: 0; }
table { width: 100%; border-collapse: collapse; margin-bottom: 8pt; }
td, th { vertical-align: top; }
.columns { display: flex; gap: 8pt; }
.column { flex: 1; }
ol.item { margin: 0 0 8pt 0; }
";

/// Escape text for use in element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_block(html: &mut String, block: &Block) {
    match block {
        Block::Text { role, text } => {
            let _ = writeln!(
                html,
                "<div class=\"{}\">{}</div>",
                role.css_class(),
                escape_html(text)
            );
        }
        Block::Fields {
            pairs_per_row,
            pairs,
        } => {
            html.push_str("<table class=\"fields\">\n");
            for chunk in pairs.chunks((*pairs_per_row).max(1)) {
                html.push_str("<tr>");
                for (label, value) in chunk {
                    let _ = write!(
                        html,
                        "<td class=\"{}\">{}</td><td class=\"{}\">{}</td>",
                        Role::FieldLabel.css_class(),
                        escape_html(label),
                        Role::FieldValue.css_class(),
                        escape_html(value)
                    );
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</table>\n");
        }
        Block::Table(table) => write_table(html, table),
        Block::Columns(columns) => {
            html.push_str("<div class=\"columns\">\n");
            for column in columns {
                html.push_str("<div class=\"column\">\n");
                write_block(html, column);
                html.push_str("</div>\n");
            }
            html.push_str("</div>\n");
        }
        Block::NumberedList(items) => {
            let _ = writeln!(html, "<ol class=\"{}\">", Role::ListItem.css_class());
            for item in items {
                let _ = writeln!(html, "<li>{}</li>", escape_html(item));
            }
            html.push_str("</ol>\n");
        }
        Block::Spacer(height) => {
            let _ = writeln!(html, "<div style=\"height: {}pt\"></div>", height.max(0.0));
        }
    }
}

fn write_table(html: &mut String, table: &Table) {
    html.push_str("<table class=\"grid\">\n");
    if let Some(caption) = &table.caption {
        let _ = writeln!(
            html,
            "<caption class=\"{}\">{}</caption>",
            Role::Caption.css_class(),
            escape_html(caption)
        );
    }
    html.push_str("<colgroup>");
    for fraction in table.fractions() {
        let _ = write!(html, "<col style=\"width: {:.1}%\">", fraction * 100.0);
    }
    html.push_str("</colgroup>\n<thead><tr>");
    for header in &table.headers {
        let _ = write!(
            html,
            "<th class=\"{}\">{}</th>",
            Role::TableHeader.css_class(),
            escape_html(header)
        );
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        html.push_str("<tr>");
        for (i, cell) in row.cells.iter().enumerate() {
            let role = if i == 0 && row.grouped {
                Role::GroupLabel
            } else {
                Role::TableCell
            };
            let _ = write!(
                html,
                "<td class=\"{}\">{}</td>",
                role.css_class(),
                escape_html(cell)
            );
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_report, normalize_site};
    use crate::record::{ReportRecord, SiteRecord};
    use serde_json::json;

    #[test]
    fn printable_report_carries_report_number() {
        let view = normalize_report(&ReportRecord::new(json!({
            "reportNumber": "ASCOMP-777"
        })));
        let doc = render_printable_report(&view, &ExportConfig::default());
        assert!(doc.title.contains("ASCOMP-777"));
        assert!(doc.html.contains("ASCOMP-777"));
        assert!(doc.html.contains("@page { size: 210mm 297mm;"));
    }

    #[test]
    fn text_is_escaped() {
        let view = normalize_report(&ReportRecord::new(json!({
            "siteName": "<script>alert('x')</script> & Co"
        })));
        let doc = render_printable_report(&view, &ExportConfig::default());
        assert!(!doc.html.contains("<script>"));
        assert!(doc.html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; Co"));
    }

    #[test]
    fn printable_page_is_self_contained() {
        let view = normalize_site(&SiteRecord::new(json!({ "siteCode": "BLR-01" })));
        let doc = render_printable_site(&view, &ExportConfig::default());
        assert!(doc.html.contains("BLR-01"));
        assert!(!doc.html.contains("<link"));
        assert!(!doc.html.contains("src="));
        assert!(doc.html.contains(".th {"));
    }

    #[test]
    fn grouped_rows_mark_the_label_cell() {
        let mut table = Table::new(None, &["Group", "Item"], &[1.0, 2.0]);
        table.push_row(["OPTICS", "Lens"], true);
        let mut html = String::new();
        write_table(&mut html, &table);
        assert!(html.contains("<td class=\"group\">OPTICS</td><td class=\"td\">Lens</td>"));
    }
}
