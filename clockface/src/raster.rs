//! Host font rasterization.
//!
//! The atlas builder only talks to [`GlyphRasterizer`]. The production
//! implementation, [`SystemFontRasterizer`], finds an installed face by family
//! name with fontdb and rasterizes it with fontdue.

use std::ops::BitOr;

use cosmic_text::fontdb;
use fontdue::{Font, FontSettings};

use crate::error::AtlasError;

/// Weight requested for every face. Bold is not applied.
const FONT_WEIGHT: u16 = 500;

/// Font style flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FontFlags(u8);

impl FontFlags {
    pub const BOLD: Self = Self(1);
    pub const ITALIC: Self = Self(2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FontFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Vertical font metrics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMetrics {
    pub height: i32,
    pub ascent: i32,
    pub descent: i32,
}

/// Ink box and placement of a single glyph in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphMetrics {
    /// Ink bounding box width.
    pub width: u32,
    /// Ink bounding box height.
    pub height: u32,
    /// Horizontal distance from the pen position to the left edge of the ink.
    pub origin_x: i32,
    /// Height of the top edge of the ink above the baseline.
    pub origin_y: i32,
    /// Horizontal pen advance.
    pub advance: i32,
}

/// A rasterized glyph coverage bitmap.
///
/// Rows are `stride` bytes apart; each pixel holds a coverage value in
/// `0..=levels`.
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub metrics: GlyphMetrics,
    pub stride: usize,
    pub levels: u8,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    /// Coverage of row `y`, cropped to the ink width.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        let start = y * self.stride;
        self.coverage.get(start..start + self.metrics.width as usize)
    }

    /// Coverage converted to 8-bit alpha.
    #[inline]
    pub fn alpha(&self, value: u8) -> u8 {
        if self.levels == 0 {
            return 0;
        }
        (255 * u32::from(value.min(self.levels)) / u32::from(self.levels)) as u8
    }
}

/// Rasterizes characters of one font at one size.
pub trait GlyphRasterizer {
    /// Vertical metrics shared by every glyph.
    fn line_metrics(&self) -> LineMetrics;

    /// Ink box and advance without producing a bitmap.
    fn glyph_metrics(&mut self, ch: char) -> Result<GlyphMetrics, AtlasError>;

    /// Ink box, advance and coverage bitmap.
    fn rasterize(&mut self, ch: char) -> Result<GlyphBitmap, AtlasError>;
}

/// Convert a point size to pixels at the given dots per inch.
pub fn points_to_pixels(points: f32, dpi: f32) -> f32 {
    points * dpi / 72.0
}

/// System font looked up by family name and rasterized with fontdue.
pub struct SystemFontRasterizer {
    font: Font,
    px: f32,
    line_metrics: LineMetrics,
}

impl SystemFontRasterizer {
    /// Load `family` from the installed system fonts at `points` size.
    pub fn new(family: &str, points: f32, flags: FontFlags, dpi: f32) -> Result<Self, AtlasError> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!("Loaded {} system font faces", db.len());

        if flags.contains(FontFlags::BOLD) {
            tracing::warn!("Bold requested for {} but not applied", family);
        }

        let style = if flags.contains(FontFlags::ITALIC) {
            fontdb::Style::Italic
        } else {
            fontdb::Style::Normal
        };
        let query = fontdb::Query {
            families: &[fontdb::Family::Name(family)],
            weight: fontdb::Weight(FONT_WEIGHT),
            stretch: fontdb::Stretch::Normal,
            style,
        };
        let id = db
            .query(&query)
            .ok_or_else(|| AtlasError::FontNotFound(family.to_string()))?;

        let font = db
            .with_face_data(id, |data, index| {
                Font::from_bytes(
                    data.to_vec(),
                    FontSettings {
                        collection_index: index,
                        ..FontSettings::default()
                    },
                )
            })
            .ok_or_else(|| AtlasError::FontLoad {
                name: family.to_string(),
                reason: "face data unavailable".to_string(),
            })?
            .map_err(|reason| AtlasError::FontLoad {
                name: family.to_string(),
                reason: reason.to_string(),
            })?;

        Self::from_font(font, family, points_to_pixels(points, dpi))
    }

    /// Wrap an already parsed font at `px` pixels per em.
    pub fn from_font(font: Font, name: &str, px: f32) -> Result<Self, AtlasError> {
        let lm = font
            .horizontal_line_metrics(px)
            .ok_or_else(|| AtlasError::MissingLineMetrics(name.to_string()))?;

        let ascent = lm.ascent.round() as i32;
        let descent = (-lm.descent).round() as i32;
        tracing::info!(
            "Font {} at {:.1}px: ascent {}, descent {}",
            name,
            px,
            ascent,
            descent
        );

        Ok(Self {
            font,
            px,
            line_metrics: LineMetrics {
                height: ascent + descent,
                ascent,
                descent,
            },
        })
    }

    fn convert(m: &fontdue::Metrics) -> GlyphMetrics {
        GlyphMetrics {
            width: m.width as u32,
            height: m.height as u32,
            origin_x: m.xmin,
            origin_y: m.ymin + m.height as i32,
            advance: m.advance_width.round() as i32,
        }
    }
}

impl GlyphRasterizer for SystemFontRasterizer {
    fn line_metrics(&self) -> LineMetrics {
        self.line_metrics
    }

    fn glyph_metrics(&mut self, ch: char) -> Result<GlyphMetrics, AtlasError> {
        Ok(Self::convert(&self.font.metrics(ch, self.px)))
    }

    fn rasterize(&mut self, ch: char) -> Result<GlyphBitmap, AtlasError> {
        let (metrics, coverage) = self.font.rasterize(ch, self.px);
        if coverage.len() != metrics.width * metrics.height {
            return Err(AtlasError::Rasterization {
                ch,
                reason: format!(
                    "expected {} coverage bytes, got {}",
                    metrics.width * metrics.height,
                    coverage.len()
                ),
            });
        }

        Ok(GlyphBitmap {
            metrics: Self::convert(&metrics),
            stride: metrics.width,
            levels: u8::MAX,
            coverage,
        })
    }
}
