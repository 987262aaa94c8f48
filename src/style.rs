//! Visual styles – one palette shared by the raster path and the printable
//! fallback so both outputs look like the same paper form.

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Blend `self` over `base` with coverage `alpha` (0.0 – 1.0).
    pub fn blend_over(self, base: [u8; 3], alpha: f32) -> [u8; 3] {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (fg as f32 * a + bg as f32 * (1.0 - a)).round() as u8;
        [mix(self.r, base[0]), mix(self.g, base[1]), mix(self.b, base[2])]
    }
}

// Palette
pub const BRAND: Color = Color::rgb(0x1a, 0x36, 0x5d);
pub const TEXT: Color = Color::rgb(0x1f, 0x29, 0x37);
pub const MUTED: Color = Color::rgb(0x6b, 0x72, 0x80);
pub const RULE: Color = Color::rgb(0x9c, 0xa3, 0xaf);
pub const HEADER_FILL: Color = Color::rgb(0xe5, 0xe7, 0xeb);
pub const LABEL_FILL: Color = Color::rgb(0xf3, 0xf4, 0xf6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Resolved style of one laid-out box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStyle {
    pub font_size: f32,
    pub line_height: f32,
    pub bold: bool,
    pub color: Color,
    pub align: TextAlign,
    pub background: Option<Color>,
    pub border: Option<(f32, Color)>,
    pub padding: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            font_size: 8.0,
            line_height: 1.3,
            bold: false,
            color: TEXT,
            align: TextAlign::Left,
            background: None,
            border: None,
            padding: 0.0,
            margin_top: 0.0,
            margin_bottom: 0.0,
        }
    }
}

/// What a piece of text is on the form. Each role maps to one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Company,
    Tagline,
    Title,
    SectionHeading,
    Body,
    Muted,
    FieldLabel,
    FieldValue,
    Caption,
    TableHeader,
    TableCell,
    GroupLabel,
    ListItem,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::Company,
        Role::Tagline,
        Role::Title,
        Role::SectionHeading,
        Role::Body,
        Role::Muted,
        Role::FieldLabel,
        Role::FieldValue,
        Role::Caption,
        Role::TableHeader,
        Role::TableCell,
        Role::GroupLabel,
        Role::ListItem,
    ];

    pub fn style(self) -> BoxStyle {
        let base = BoxStyle::default();
        let cell_border = Some((0.5, RULE));
        match self {
            Role::Company => BoxStyle {
                font_size: 16.0,
                bold: true,
                color: Color::WHITE,
                background: Some(BRAND),
                padding: 6.0,
                ..base
            },
            Role::Tagline => BoxStyle {
                font_size: 8.0,
                color: MUTED,
                margin_bottom: 2.0,
                ..base
            },
            Role::Title => BoxStyle {
                font_size: 13.0,
                bold: true,
                color: BRAND,
                align: TextAlign::Center,
                margin_top: 4.0,
                margin_bottom: 6.0,
                ..base
            },
            Role::SectionHeading => BoxStyle {
                font_size: 9.5,
                bold: true,
                color: BRAND,
                margin_top: 8.0,
                margin_bottom: 3.0,
                ..base
            },
            Role::Body | Role::ListItem => BoxStyle {
                margin_bottom: 1.0,
                ..base
            },
            Role::Muted => BoxStyle {
                font_size: 7.0,
                color: MUTED,
                margin_top: 8.0,
                ..base
            },
            Role::FieldLabel => BoxStyle {
                bold: true,
                background: Some(LABEL_FILL),
                border: cell_border,
                padding: 2.5,
                ..base
            },
            Role::FieldValue | Role::TableCell => BoxStyle {
                border: cell_border,
                padding: 2.5,
                ..base
            },
            Role::Caption => BoxStyle {
                bold: true,
                margin_bottom: 2.0,
                ..base
            },
            Role::TableHeader => BoxStyle {
                bold: true,
                background: Some(HEADER_FILL),
                border: cell_border,
                padding: 2.5,
                ..base
            },
            Role::GroupLabel => BoxStyle {
                font_size: 7.0,
                bold: true,
                background: Some(LABEL_FILL),
                border: cell_border,
                padding: 2.5,
                ..base
            },
        }
    }

    /// Class name used by the printable stylesheet.
    pub fn css_class(self) -> &'static str {
        match self {
            Role::Company => "company",
            Role::Tagline => "tagline",
            Role::Title => "title",
            Role::SectionHeading => "section",
            Role::Body => "body",
            Role::Muted => "muted",
            Role::FieldLabel => "label",
            Role::FieldValue => "value",
            Role::Caption => "caption",
            Role::TableHeader => "th",
            Role::TableCell => "td",
            Role::GroupLabel => "group",
            Role::ListItem => "item",
        }
    }
}

/// CSS rules for every role, for documents printed by the host.
pub fn stylesheet() -> String {
    let mut css = String::new();
    for role in Role::ALL {
        let s = role.style();
        css.push_str(&format!(
            ".{} {{ font-size: {}pt; line-height: {}; font-weight: {}; color: {}; \
             text-align: {}; padding: {}pt; margin: {}pt 0 {}pt 0;",
            role.css_class(),
            s.font_size,
            s.line_height,
            if s.bold { "bold" } else { "normal" },
            s.color.to_hex(),
            match s.align {
                TextAlign::Left => "left",
                TextAlign::Center => "center",
                TextAlign::Right => "right",
            },
            s.padding,
            s.margin_top,
            s.margin_bottom,
        ));
        if let Some(bg) = s.background {
            css.push_str(&format!(" background: {};", bg.to_hex()));
        }
        if let Some((width, color)) = s.border {
            css.push_str(&format!(" border: {}pt solid {};", width, color.to_hex()));
        }
        css.push_str(" }\n");
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(BRAND.to_hex(), "#1a365d");
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");
    }

    #[test]
    fn blend_extremes() {
        assert_eq!(Color::BLACK.blend_over([255, 255, 255], 1.0), [0, 0, 0]);
        assert_eq!(Color::BLACK.blend_over([255, 255, 255], 0.0), [255, 255, 255]);
    }

    #[test]
    fn stylesheet_covers_every_role() {
        let css = stylesheet();
        for role in Role::ALL {
            assert!(css.contains(&format!(".{} {{", role.css_class())));
        }
        assert!(css.contains("background: #1a365d"));
    }
}
