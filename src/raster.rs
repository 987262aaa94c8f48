//! Rasterizer – captures a rendered document as one oversampled bitmap at
//! the fixed logical page width.
//!
//! Painting happens on an [`OffscreenSurface`] borrowed from the shared
//! [`DocumentContext`]. Only one surface may be attached at a time, and a
//! surface detaches itself when dropped, whatever path the capture took.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use crate::config::ExportConfig;
use crate::document::RenderedDocument;
use crate::error::{ExportError, ExportResult};
use crate::fonts::FontManager;
use crate::layout::{compute_layout, BoxContent, PositionedBox};
use crate::style::{BoxStyle, Color, TextAlign};

/// Vertical sub-scanlines per pixel when filling glyph outlines.
const SUBSAMPLES: usize = 4;

/// A captured document, one page wide and as tall as its content.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub image: RgbImage,
    /// Raster pixels per layout point.
    pub scale: f32,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Turns a rendered document into a bitmap. Implementations must not retry
/// or switch strategy on failure; the caller decides what happens next.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, document: &RenderedDocument) -> ExportResult<RasterImage>;
}

// ---------------------------------------------------------------------------
// Shared document context and scoped surfaces
// ---------------------------------------------------------------------------

/// The single rendering context surfaces are attached to.
#[derive(Debug, Default)]
pub struct DocumentContext {
    attached: Mutex<Option<u64>>,
    next_id: AtomicU64,
}

impl DocumentContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a blank surface of `width`×`height` pixels.
    pub fn attach(self: &Arc<Self>, width: u32, height: u32) -> ExportResult<OffscreenSurface> {
        let mut attached = self.attached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(id) = *attached {
            return Err(ExportError::Rasterization(format!(
                "off-screen surface {id} is still attached; exports must run one at a time"
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        *attached = Some(id);
        log::debug!("attached surface {id} ({width}x{height})");
        Ok(OffscreenSurface {
            id,
            canvas: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
            context: Arc::clone(self),
        })
    }

    /// Id of the currently attached surface, if any.
    pub fn attached_surface(&self) -> Option<u64> {
        *self.attached.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn detach(&self, id: u64) {
        let mut attached = self.attached.lock().unwrap_or_else(|e| e.into_inner());
        if *attached == Some(id) {
            *attached = None;
            log::debug!("detached surface {id}");
        }
    }
}

/// A transient canvas; detaches from its context on drop.
pub struct OffscreenSurface {
    id: u64,
    canvas: RgbImage,
    context: Arc<DocumentContext>,
}

impl OffscreenSurface {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn canvas_mut(&mut self) -> &mut RgbImage {
        &mut self.canvas
    }

    /// Take the painted canvas; the surface still detaches when dropped.
    pub fn into_image(mut self) -> RgbImage {
        std::mem::take(&mut self.canvas)
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        self.context.detach(self.id);
    }
}

// ---------------------------------------------------------------------------
// Bitmap rasterizer
// ---------------------------------------------------------------------------

/// Default rasterizer: Taffy layout, then software painting.
pub struct BitmapRasterizer {
    context: Arc<DocumentContext>,
    fonts: Arc<FontManager>,
    page_width_pt: f32,
    margin_pt: f32,
    scale: f32,
    max_pixels: u64,
}

impl BitmapRasterizer {
    pub fn new(config: &ExportConfig, context: Arc<DocumentContext>) -> Self {
        Self {
            context,
            fonts: Arc::new(FontManager::default()),
            page_width_pt: config.page_width_pt(),
            margin_pt: config.page_margin_pt,
            scale: config.effective_oversampling(),
            max_pixels: config.max_raster_pixels,
        }
    }

    /// Use real faces for measurement and glyph outlines.
    pub fn with_fonts(mut self, fonts: FontManager) -> Self {
        self.fonts = Arc::new(fonts);
        self
    }
}

#[async_trait]
impl Rasterizer for BitmapRasterizer {
    async fn rasterize(&self, document: &RenderedDocument) -> ExportResult<RasterImage> {
        let layout = compute_layout(document, self.page_width_pt, self.margin_pt, &self.fonts)?;
        if layout.boxes.is_empty() {
            return Err(ExportError::Rasterization(format!(
                "document '{}' has no content",
                document.title
            )));
        }

        let width = (layout.width * self.scale).round() as u32;
        let height = (layout.height * self.scale).ceil() as u32;
        let pixels = width as u64 * height as u64;
        if width == 0 || height == 0 || pixels > self.max_pixels {
            return Err(ExportError::Rasterization(format!(
                "{width}x{height} raster exceeds the {} pixel budget",
                self.max_pixels
            )));
        }

        tokio::task::yield_now().await;

        let mut surface = self.context.attach(width, height)?;
        let mut painter = Painter {
            canvas: surface.canvas_mut(),
            scale: self.scale,
            fonts: &self.fonts,
        };
        for b in &layout.boxes {
            painter.paint_box(b);
        }

        log::debug!(
            "rasterized '{}' at {}x: {width}x{height} px",
            document.title,
            self.scale
        );
        Ok(RasterImage {
            image: surface.into_image(),
            scale: self.scale,
        })
    }
}

// ---------------------------------------------------------------------------
// Painter
// ---------------------------------------------------------------------------

struct Painter<'a> {
    canvas: &'a mut RgbImage,
    scale: f32,
    fonts: &'a FontManager,
}

impl Painter<'_> {
    fn paint_box(&mut self, b: &PositionedBox) {
        if let Some(bg) = b.style.background {
            self.fill_rect(b.x, b.y, b.width, b.height, bg);
        }
        if let BoxContent::Text { lines } = &b.content {
            self.draw_text(b, lines);
        }
        for child in &b.children {
            self.paint_box(child);
        }
        // Borders last so cell fills never cover them.
        if let Some((width, color)) = b.style.border {
            self.stroke_rect(b.x, b.y, b.width, b.height, width, color);
        }
    }

    /// Fill a rectangle given in points.
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let (cw, ch) = (self.canvas.width() as f32, self.canvas.height() as f32);
        let x0 = (x * self.scale).round().clamp(0.0, cw) as u32;
        let y0 = (y * self.scale).round().clamp(0.0, ch) as u32;
        let x1 = ((x + w) * self.scale).round().clamp(0.0, cw) as u32;
        let y1 = ((y + h) * self.scale).round().clamp(0.0, ch) as u32;
        let px = Rgb([color.r, color.g, color.b]);
        for yy in y0..y1 {
            for xx in x0..x1 {
                self.canvas.put_pixel(xx, yy, px);
            }
        }
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width_pt: f32, color: Color) {
        // At least one device pixel so hairlines survive printing.
        let t = (width_pt * self.scale).round().max(1.0) / self.scale;
        self.fill_rect(x, y, w, t, color);
        self.fill_rect(x, y + h - t, w, t, color);
        self.fill_rect(x, y, t, h, color);
        self.fill_rect(x + w - t, y, t, h, color);
    }

    fn draw_text(&mut self, b: &PositionedBox, lines: &[String]) {
        let style = &b.style;
        let line_height = self.fonts.line_height_px(style.font_size, style.line_height);
        let ascender = self.fonts.ascender_px(style.font_size, style.bold);
        let inner_width = b.width - 2.0 * style.padding;

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_width = self
                .fonts
                .measure_text_width(line, style.font_size, style.bold);
            let offset = match style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => ((inner_width - line_width) / 2.0).max(0.0),
                TextAlign::Right => (inner_width - line_width).max(0.0),
            };
            let top = b.y + style.padding + i as f32 * line_height;
            let baseline = top + (line_height - style.font_size) / 2.0 + ascender;
            self.draw_line(line, b.x + style.padding + offset, baseline, style);
        }
    }

    fn draw_line(&mut self, text: &str, x: f32, baseline: f32, style: &BoxStyle) {
        match self.fonts.face(style.bold) {
            Some(face) => {
                let units = face.units_per_em() as f32;
                let font_scale = style.font_size / units;
                let mut pen = x;
                for ch in text.chars() {
                    let Some(gid) = face.glyph_index(ch) else {
                        pen += style.font_size * 0.5;
                        continue;
                    };
                    let mut outline = Outline::new(pen, baseline, font_scale, self.scale);
                    if face.outline_glyph(gid, &mut outline).is_some() {
                        fill_outline(self.canvas, &outline.edges, style.color);
                    }
                    pen += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * font_scale;
                }
            }
            None => self.draw_greeked(text, x, baseline, style),
        }
    }

    /// Without a loaded face every glyph is a solid block sized by the
    /// synthetic metrics the layout used.
    fn draw_greeked(&mut self, text: &str, x: f32, baseline: f32, style: &BoxStyle) {
        let advance = style.font_size * if style.bold { 0.55 } else { 0.5 };
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let height = if ch.is_lowercase() { 0.52 } else { 0.72 } * style.font_size;
            let left = x + i as f32 * advance + advance * 0.1;
            self.fill_rect(left, baseline - height, advance * 0.8, height, style.color);
        }
    }
}

// ---------------------------------------------------------------------------
// Glyph outlines
// ---------------------------------------------------------------------------

/// A straight outline segment in device pixels.
#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

/// Collects a glyph outline as flattened edges in device pixels.
struct Outline {
    origin_x: f32,
    baseline: f32,
    font_scale: f32,
    device_scale: f32,
    start: (f32, f32),
    current: (f32, f32),
    edges: Vec<Edge>,
}

impl Outline {
    fn new(origin_x: f32, baseline: f32, font_scale: f32, device_scale: f32) -> Self {
        Self {
            origin_x,
            baseline,
            font_scale,
            device_scale,
            start: (0.0, 0.0),
            current: (0.0, 0.0),
            edges: Vec::new(),
        }
    }

    /// Font units (y up) → device pixels (y down).
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (self.origin_x + x * self.font_scale) * self.device_scale,
            (self.baseline - y * self.font_scale) * self.device_scale,
        )
    }

    fn push_to(&mut self, p: (f32, f32)) {
        if p != self.current {
            self.edges.push(Edge {
                x0: self.current.0,
                y0: self.current.1,
                x1: p.0,
                y1: p.1,
            });
        }
        self.current = p;
    }
}

impl ttf_parser::OutlineBuilder for Outline {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.start = p;
        self.current = p;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.push_to(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.current;
        let c = self.map(x1, y1);
        let p = self.map(x, y);
        const STEPS: usize = 6;
        for i in 1..=STEPS {
            let t = i as f32 / STEPS as f32;
            let mt = 1.0 - t;
            self.push_to((
                mt * mt * p0.0 + 2.0 * mt * t * c.0 + t * t * p.0,
                mt * mt * p0.1 + 2.0 * mt * t * c.1 + t * t * p.1,
            ));
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.current;
        let c1 = self.map(x1, y1);
        let c2 = self.map(x2, y2);
        let p = self.map(x, y);
        const STEPS: usize = 8;
        for i in 1..=STEPS {
            let t = i as f32 / STEPS as f32;
            let mt = 1.0 - t;
            let (a, b, c, d) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
            self.push_to((
                a * p0.0 + b * c1.0 + c * c2.0 + d * p.0,
                a * p0.1 + b * c1.1 + c * c2.1 + d * p.1,
            ));
        }
    }

    fn close(&mut self) {
        let start = self.start;
        self.push_to(start);
    }
}

/// Non-zero winding scanline fill with vertical supersampling and exact
/// horizontal span coverage.
fn fill_outline(canvas: &mut RgbImage, edges: &[Edge], color: Color) {
    if edges.is_empty() {
        return;
    }
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let min_x = edges.iter().map(|e| e.x0.min(e.x1)).fold(f32::MAX, f32::min).floor() as i64;
    let max_x = edges.iter().map(|e| e.x0.max(e.x1)).fold(f32::MIN, f32::max).ceil() as i64;
    let min_y = edges.iter().map(|e| e.y0.min(e.y1)).fold(f32::MAX, f32::min).floor() as i64;
    let max_y = edges.iter().map(|e| e.y0.max(e.y1)).fold(f32::MIN, f32::max).ceil() as i64;
    let (x_lo, x_hi) = (min_x.max(0), max_x.min(cw));
    let (y_lo, y_hi) = (min_y.max(0), max_y.min(ch));
    if x_lo >= x_hi || y_lo >= y_hi {
        return;
    }

    let span_w = (x_hi - x_lo) as usize;
    let mut coverage = vec![0.0f32; span_w];
    let mut crossings: Vec<(f32, i32)> = Vec::new();
    let weight = 1.0 / SUBSAMPLES as f32;

    for row in y_lo..y_hi {
        coverage.iter_mut().for_each(|c| *c = 0.0);
        for s in 0..SUBSAMPLES {
            let sy = row as f32 + (s as f32 + 0.5) * weight;
            crossings.clear();
            for e in edges {
                let (top, bottom, dir) = if e.y0 < e.y1 {
                    ((e.x0, e.y0), (e.x1, e.y1), 1)
                } else {
                    ((e.x1, e.y1), (e.x0, e.y0), -1)
                };
                if sy < top.1 || sy >= bottom.1 {
                    continue;
                }
                let t = (sy - top.1) / (bottom.1 - top.1);
                crossings.push((top.0 + t * (bottom.0 - top.0), dir));
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding == 0 {
                    continue;
                }
                let a = (pair[0].0 - x_lo as f32).max(0.0);
                let b = (pair[1].0 - x_lo as f32).min(span_w as f32);
                let mut px = a.floor();
                while px < b {
                    let overlap = (b.min(px + 1.0) - a.max(px)).max(0.0);
                    if let Some(c) = coverage.get_mut(px as usize) {
                        *c += overlap * weight;
                    }
                    px += 1.0;
                }
            }
        }

        for (i, c) in coverage.iter().enumerate() {
            if *c <= 0.0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(x_lo as u32 + i as u32, row as u32);
            pixel.0 = color.blend_over(pixel.0, *c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, DocumentKind};
    use crate::style::Role;

    fn doc(blocks: Vec<Block>) -> RenderedDocument {
        RenderedDocument {
            kind: DocumentKind::ServiceReport,
            title: "raster test".to_string(),
            blocks,
        }
    }

    #[tokio::test]
    async fn raster_width_is_fixed_page_width() {
        let config = ExportConfig::default();
        let rasterizer = BitmapRasterizer::new(&config, DocumentContext::new());
        let raster = rasterizer
            .rasterize(&doc(vec![Block::text(Role::Body, "Hello")]))
            .await
            .unwrap();
        let expected = (config.page_width_pt() * MIN_SCALE).round() as u32;
        assert_eq!(raster.width(), expected);
        assert!(raster.height() > 0);
        assert_eq!(raster.scale, MIN_SCALE);
    }

    const MIN_SCALE: f32 = crate::config::MIN_OVERSAMPLING;

    #[tokio::test]
    async fn text_leaves_ink() {
        let config = ExportConfig::default();
        let rasterizer = BitmapRasterizer::new(&config, DocumentContext::new());
        let raster = rasterizer
            .rasterize(&doc(vec![Block::text(Role::Body, "INK")]))
            .await
            .unwrap();
        assert!(raster.image.pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[tokio::test]
    async fn empty_document_is_a_rasterization_error() {
        let context = DocumentContext::new();
        let rasterizer = BitmapRasterizer::new(&ExportConfig::default(), Arc::clone(&context));
        let err = rasterizer.rasterize(&doc(vec![])).await.unwrap_err();
        assert!(matches!(err, ExportError::Rasterization(_)));
        assert_eq!(context.attached_surface(), None);
    }

    #[tokio::test]
    async fn pixel_budget_is_enforced() {
        let config = ExportConfig {
            max_raster_pixels: 1_000,
            ..ExportConfig::default()
        };
        let rasterizer = BitmapRasterizer::new(&config, DocumentContext::new());
        let err = rasterizer
            .rasterize(&doc(vec![Block::text(Role::Body, "x")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pixel budget"));
    }

    #[tokio::test]
    async fn rasterization_is_deterministic() {
        use sha2::{Digest, Sha256};

        let document = doc(vec![
            Block::text(Role::Title, "Determinism"),
            Block::text(Role::Body, "Same input, same pixels."),
        ]);
        let rasterizer = BitmapRasterizer::new(&ExportConfig::default(), DocumentContext::new());
        let mut hashes = Vec::new();
        for _ in 0..2 {
            let raster = rasterizer.rasterize(&document).await.unwrap();
            hashes.push(Sha256::digest(raster.image.as_raw()).to_vec());
        }
        assert_eq!(hashes[0], hashes[1]);
    }

    #[test]
    fn surface_detaches_on_drop() {
        let context = DocumentContext::new();
        let surface = context.attach(4, 4).unwrap();
        assert_eq!(context.attached_surface(), Some(surface.id()));
        assert!(context.attach(4, 4).is_err());
        drop(surface);
        assert_eq!(context.attached_surface(), None);
        let again = context.attach(2, 2).unwrap();
        assert_eq!(again.into_image().dimensions(), (2, 2));
        assert_eq!(context.attached_surface(), None);
    }

    #[test]
    fn outline_fill_covers_square() {
        let mut canvas = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let square = [
            Edge { x0: 2.0, y0: 2.0, x1: 8.0, y1: 2.0 },
            Edge { x0: 8.0, y0: 2.0, x1: 8.0, y1: 8.0 },
            Edge { x0: 8.0, y0: 8.0, x1: 2.0, y1: 8.0 },
            Edge { x0: 2.0, y0: 8.0, x1: 2.0, y1: 2.0 },
        ];
        fill_outline(&mut canvas, &square, Color::BLACK);
        assert_eq!(canvas.get_pixel(5, 5).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(canvas.get_pixel(9, 5).0, [255, 255, 255]);
    }
}
