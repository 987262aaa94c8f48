//! Assembler – embeds page bands as full-page images in a PDF using
//! `printpdf` (v0.8 ops-based API).

use std::io::Cursor;

use chrono::NaiveDate;
use ::image::ImageFormat;
use printpdf::*;

use crate::config::PT_PER_MM;
use crate::error::{ExportError, ExportResult};
use crate::pagination::PageImage;

/// The finished primary-path output, ready for a save facility.
#[derive(Debug, Clone)]
pub struct PaginatedArtifact {
    pub file_name: String,
    pub title: String,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

/// `<prefix>_<id>_<YYYY-MM-DD>.<ext>`. Path separators in `id` become `-`.
pub fn artifact_file_name(prefix: &str, id: &str, date: NaiveDate, extension: &str) -> String {
    let id: String = id
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!(
        "{prefix}_{id}_{}.{}",
        date.format("%Y-%m-%d"),
        extension.trim_start_matches('.')
    )
}

/// Build a PDF with one page per band, each band stretched to the full page.
pub fn assemble(
    pages: &[PageImage],
    title: &str,
    file_name: &str,
    page_width_mm: f32,
    page_height_mm: f32,
) -> ExportResult<PaginatedArtifact> {
    if pages.is_empty() {
        return Err(ExportError::Assembly("no pages to assemble".to_string()));
    }

    let page_w_pt = page_width_mm * PT_PER_MM;
    let page_h_pt = page_height_mm * PT_PER_MM;
    let mut doc = PdfDocument::new(title);
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let mut pdf_pages = Vec::with_capacity(pages.len());

    for page in pages {
        let (px_width, px_height) = page.image.dimensions();
        if px_width == 0 || px_height == 0 {
            return Err(ExportError::Assembly(format!(
                "page {} has no pixels",
                page.index + 1
            )));
        }

        let mut png = Cursor::new(Vec::new());
        page.image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| ExportError::Assembly(format!("page {}: {e}", page.index + 1)))?;
        let raw = RawImage::decode_from_bytes(png.get_ref(), &mut warnings)
            .map_err(|e| ExportError::Assembly(format!("page {}: {e}", page.index + 1)))?;
        let xobj_id = doc.add_image(&raw);

        // At dpi=72 printpdf renders 1 px = 1 pt.
        let ops = vec![Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                dpi: Some(72.0),
                scale_x: Some(page_w_pt / px_width as f32),
                scale_y: Some(page_h_pt / px_height as f32),
                rotate: None,
            },
        }];
        pdf_pages.push(PdfPage::new(Mm(page_width_mm), Mm(page_height_mm), ops));
    }

    let page_count = pdf_pages.len();
    doc.with_pages(pdf_pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    for warning in &warnings {
        log::debug!("pdf: {warning:?}");
    }
    log::debug!("assembled '{file_name}': {page_count} page(s), {} bytes", bytes.len());

    Ok(PaginatedArtifact {
        file_name: file_name.to_string(),
        title: title.to_string(),
        page_count,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgb, RgbImage};

    fn band(index: usize) -> PageImage {
        PageImage {
            index,
            image: RgbImage::from_pixel(21, 30, Rgb([200, 10, 10])),
            content_rows: 30,
        }
    }

    #[test]
    fn report_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            artifact_file_name("ASCOMP_Report", "ASCOMP-12345", date, "pdf"),
            "ASCOMP_Report_ASCOMP-12345_2024-03-01.pdf"
        );
    }

    #[test]
    fn separators_are_replaced() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            artifact_file_name("ASCOMP_Site", "BLR/01\\A", date, ".pdf"),
            "ASCOMP_Site_BLR-01-A_2024-12-31.pdf"
        );
    }

    #[test]
    fn one_pdf_page_per_band() {
        let artifact = assemble(&[band(0), band(1)], "Report", "r.pdf", 210.0, 297.0).unwrap();
        assert_eq!(artifact.page_count, 2);
        assert_eq!(artifact.file_name, "r.pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn no_pages_is_an_assembly_error() {
        let err = assemble(&[], "Report", "r.pdf", 210.0, 297.0).unwrap_err();
        assert!(matches!(err, ExportError::Assembly(_)));
    }
}
