//! Pagination – slices a single tall raster into page-sized bands.
//!
//! The raster is scaled to the page width, so one page covers
//! `page_height_mm` of scaled height. The first page is always emitted;
//! further pages follow while the remaining height is still `>= 0`. An
//! exact multiple `k·H` of the page height therefore yields `k + 1` pages,
//! the last one blank.

use image::{imageops, Rgb, RgbImage};

use crate::error::{ExportError, ExportResult};
use crate::raster::RasterImage;

/// One page-sized slice of the raster.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub index: usize,
    /// Always exactly one page tall; rows past the raster are white.
    pub image: RgbImage,
    /// How many rows came from the raster.
    pub content_rows: u32,
}

/// Number of pages for a content height of `scaled_mm` on `page_height_mm`
/// pages.
pub fn page_count(scaled_mm: f64, page_height_mm: f64) -> usize {
    let mut pages = 1;
    let mut left = scaled_mm - page_height_mm;
    while left >= 0.0 {
        pages += 1;
        left -= page_height_mm;
    }
    pages
}

/// Split `raster` into bands of one page each.
pub fn paginate(
    raster: &RasterImage,
    page_width_mm: f32,
    page_height_mm: f32,
) -> ExportResult<Vec<PageImage>> {
    let (width, height) = raster.image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Assembly(format!(
            "cannot paginate an empty {width}x{height} raster"
        )));
    }
    if !(page_width_mm > 0.0 && page_height_mm > 0.0) {
        return Err(ExportError::Assembly(format!(
            "invalid page size {page_width_mm}x{page_height_mm} mm"
        )));
    }

    let mm_per_px = page_width_mm as f64 / width as f64;
    let scaled = height as f64 * mm_per_px;
    let count = page_count(scaled, page_height_mm as f64);
    // Rounded up so `count` bands always cover every raster row.
    let band_px = (page_height_mm as f64 / mm_per_px - 1e-9).ceil().max(1.0) as u32;

    log::debug!(
        "paginating {width}x{height} px ({scaled:.1} mm) into {count} page(s) of {band_px} px"
    );

    let pages = (0..count)
        .map(|index| {
            let offset = (index as u64 * band_px as u64).min(height as u64) as u32;
            let content_rows = band_px.min(height - offset);
            let mut image = RgbImage::from_pixel(width, band_px, Rgb([255, 255, 255]));
            if content_rows > 0 {
                let band =
                    imageops::crop_imm(&raster.image, 0, offset, width, content_rows).to_image();
                imageops::replace(&mut image, &band, 0, 0);
            }
            PageImage {
                index,
                image,
                content_rows,
            }
        })
        .collect();
    Ok(pages)
}
