//! Deterministic rasterizer for unit tests.

use std::collections::HashMap;

use crate::error::AtlasError;
use crate::raster::{GlyphBitmap, GlyphMetrics, GlyphRasterizer, LineMetrics};

/// Rasterizer with fixed metrics and fully covered ink boxes.
///
/// Coverage uses 6-bit depth and rows padded past the ink width, like a
/// GDI gray bitmap.
pub(crate) struct FixedRasterizer {
    line: LineMetrics,
    default: GlyphMetrics,
    overrides: HashMap<char, GlyphMetrics>,
    grown: Option<char>,
    truncated: Option<char>,
}

impl FixedRasterizer {
    /// Every glyph: 8x12 ink, advance 10, ink top on the ascent line.
    pub(crate) fn monospace() -> Self {
        Self {
            line: LineMetrics {
                height: 14,
                ascent: 11,
                descent: 3,
            },
            default: GlyphMetrics {
                width: 8,
                height: 12,
                origin_x: 0,
                origin_y: 11,
                advance: 10,
            },
            overrides: HashMap::new(),
            grown: None,
            truncated: None,
        }
    }

    pub(crate) fn set_glyph(&mut self, ch: char, metrics: GlyphMetrics) {
        self.overrides.insert(ch, metrics);
    }

    pub(crate) fn set_origin_y(&mut self, ch: char, origin_y: i32) {
        let metrics = GlyphMetrics {
            origin_y,
            ..self.metrics(ch)
        };
        self.set_glyph(ch, metrics);
    }

    /// Make `rasterize` report a larger ink box than `glyph_metrics` did.
    pub(crate) fn grow_bitmap_of(&mut self, ch: char) {
        self.grown = Some(ch);
    }

    /// Make `rasterize` return fewer coverage bytes than the box needs.
    pub(crate) fn truncate_coverage_of(&mut self, ch: char) {
        self.truncated = Some(ch);
    }

    fn metrics(&self, ch: char) -> GlyphMetrics {
        self.overrides.get(&ch).copied().unwrap_or(self.default)
    }
}

impl GlyphRasterizer for FixedRasterizer {
    fn line_metrics(&self) -> LineMetrics {
        self.line
    }

    fn glyph_metrics(&mut self, ch: char) -> Result<GlyphMetrics, AtlasError> {
        Ok(self.metrics(ch))
    }

    fn rasterize(&mut self, ch: char) -> Result<GlyphBitmap, AtlasError> {
        let mut metrics = self.metrics(ch);
        if self.grown == Some(ch) {
            metrics.width += 1;
        }

        let width = metrics.width as usize;
        let stride = (width + 3) / 4 * 4 + 4;
        let mut coverage = vec![0u8; stride * metrics.height as usize];
        for row in coverage.chunks_mut(stride) {
            row[..width].fill(64);
        }
        if self.truncated == Some(ch) {
            coverage.truncate(coverage.len() / 2);
        }

        Ok(GlyphBitmap {
            metrics,
            stride,
            levels: 64,
            coverage,
        })
    }
}
