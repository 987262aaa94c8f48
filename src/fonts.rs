//! Font loading and text measurement using `ttf-parser`.
//!
//! Without a loaded face the manager falls back to Helvetica-like synthetic
//! metrics, so layout stays deterministic on hosts that ship no fonts.

use std::collections::HashMap;

use crate::error::{ExportError, ExportResult};

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API). Empty for
    /// synthetic metrics.
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl FontData {
    fn synthetic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
            line_gap: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub bold: bool,
}

/// Manages the regular and bold faces used by every document.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    fallback: FontData,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            fallback: FontData::synthetic(),
        }
    }

    /// Load a TTF/OTF face from bytes for the regular or bold weight.
    pub fn load_font(&mut self, bold: bool, bytes: Vec<u8>) -> ExportResult<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| ExportError::InvalidInput(format!("Failed to parse font: {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };
        log::debug!(
            "loaded {} face ({} units/em)",
            if bold { "bold" } else { "regular" },
            data.units_per_em
        );
        self.fonts.insert(FontKey { bold }, data);
        Ok(())
    }

    /// Font data for a weight, falling back to regular, then to synthetic metrics.
    pub fn get(&self, bold: bool) -> &FontData {
        self.fonts
            .get(&FontKey { bold })
            .or_else(|| self.fonts.get(&FontKey { bold: false }))
            .unwrap_or(&self.fallback)
    }

    /// Parsed face for a weight, if real font bytes are loaded.
    pub fn face(&self, bold: bool) -> Option<ttf_parser::Face<'_>> {
        let data = self.get(bold);
        if data.bytes.is_empty() {
            return None;
        }
        ttf_parser::Face::parse(&data.bytes, 0).ok()
    }

    /// Measure the width of a string at a given font size (in pt).
    /// With real font bytes we sum glyph advances. Otherwise we use an
    /// average character width heuristic (0.5 × font_size per char).
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let Some(face) = self.face(bold) else {
            // Bold is ~10 % wider.
            let avg = if bold { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * font_size * avg;
        };

        let scale = font_size / face.units_per_em() as f32;
        text.chars()
            .map(|ch| match face.glyph_index(ch) {
                Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                None => font_size * 0.5,
            })
            .sum()
    }

    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    pub fn ascender_px(&self, font_size: f32, bold: bool) -> f32 {
        let data = self.get(bold);
        data.ascender * font_size / data.units_per_em
    }

    /// Check if real font bytes are loaded for the regular weight.
    pub fn has_real_fonts(&self) -> bool {
        !self.get(false).bytes.is_empty()
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Word-wrap text to fit within `max_width` points. Words wider than a
/// whole line are split between characters. Returns at least one line.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let fits = |s: &str| fonts.measure_text_width(s, font_size, bold) <= max_width;
    let mut lines: Vec<String> = Vec::new();

    // Split on existing newlines first
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            if fits(&candidate) {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if fits(word) {
                current_line = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current_line.push(ch);
                if !fits(&current_line) && current_line.chars().count() > 1 {
                    current_line.pop();
                    lines.push(std::mem::take(&mut current_line));
                    current_line.push(ch);
                }
            }
        }
        lines.push(current_line);
    }

    lines
}
