//! Right-aligned glyph quad generation.
//!
//! Text is laid out with the atlas metrics and emitted as two triangles per
//! character into a CPU-side vertex list. [`crate::gpu::RenderResources`]
//! uploads the list and draws it in one call.

use crate::atlas::FontAtlas;

/// Vertices emitted per glyph (two triangles).
pub const VERTICES_PER_GLYPH: usize = 6;

/// Interleaved position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct TextVertex {
    /// Position in pixels, origin at the bottom-left of the target.
    pub position: [f32; 2],
    /// Atlas texture coordinate.
    pub uv: [f32; 2],
}

impl TextVertex {
    #[inline]
    fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }
}

/// Width and height of `text` in unscaled pixels.
///
/// The width sums the advances of all but the last character and adds the
/// ink width of the last one, so trailing advance is not counted. The height
/// is the font height above the baseline.
pub fn text_extent(text: &str, atlas: &FontAtlas) -> (i32, i32) {
    let height = atlas.font_height_above_baseline();

    let mut chars = text.chars();
    let Some(last) = chars.next_back() else {
        return (0, height);
    };

    let width: i32 = chars.map(|c| i32::from(atlas.get_glyph(c).advance)).sum();
    (width + i32::from(atlas.get_glyph(last).char_width), height)
}

/// Accumulates glyph quads for one frame.
#[derive(Debug, Default, Clone)]
pub struct TextRenderer {
    vertices: Vec<TextVertex>,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all queued quads.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[TextVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn glyph_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_GLYPH
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Queue `text` so its right edge sits at `anchor_x`.
    ///
    /// Each glyph's quad bottom is placed at `anchor_y - yoff * scale`. Quads
    /// use the atlas cell size rather than the glyph's own ink box, so every
    /// UV rectangle has the same extent.
    pub fn draw_text(&mut self, text: &str, anchor_x: f32, anchor_y: f32, atlas: &FontAtlas, scale: f32) {
        let w = atlas.glyph_width() as f32 * scale;
        let h = atlas.glyph_height() as f32 * scale;
        let uw = atlas.uw();
        let vh = atlas.vh();

        let (extent_x, _) = text_extent(text, atlas);

        self.vertices.reserve(text.len() * VERTICES_PER_GLYPH);

        let mut pen = 0i32;
        for ch in text.chars() {
            let glyph = atlas.get_glyph(ch);
            let (u, v) = (glyph.u, glyph.v);
            let x = anchor_x + (pen - extent_x + i32::from(glyph.xoff)) as f32 * scale;
            let y = anchor_y - f32::from(glyph.yoff) * scale;
            pen += i32::from(glyph.advance);

            self.vertices.extend_from_slice(&[
                TextVertex::new(x, y, u, v + vh),
                TextVertex::new(x + w, y, u + uw, v + vh),
                TextVertex::new(x, y + h, u, v),
                TextVertex::new(x + w, y, u + uw, v + vh),
                TextVertex::new(x + w, y + h, u + uw, v),
                TextVertex::new(x, y + h, u, v),
            ]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GlyphMetrics;
    use crate::test_support::FixedRasterizer;

    fn monospace_atlas() -> FontAtlas {
        FontAtlas::build(&mut FixedRasterizer::monospace()).unwrap().0
    }

    #[test]
    fn test_extent_empty_string() {
        let atlas = monospace_atlas();
        assert_eq!(text_extent("", &atlas), (0, atlas.font_height_above_baseline()));
    }

    #[test]
    fn test_extent_single_char_uses_ink_width() {
        let atlas = monospace_atlas();
        assert_eq!(text_extent("A", &atlas).0, 8);
    }

    #[test]
    fn test_extent_monospace_pair() {
        let atlas = monospace_atlas();
        assert_eq!(text_extent("AB", &atlas), (18, 11));
    }

    #[test]
    fn test_extent_mixed_widths() {
        let mut rasterizer = FixedRasterizer::monospace();
        rasterizer.set_glyph(
            '1',
            GlyphMetrics {
                width: 4,
                height: 12,
                origin_x: 1,
                origin_y: 11,
                advance: 6,
            },
        );
        let (atlas, _) = FontAtlas::build(&mut rasterizer).unwrap();
        // 10 + 6 + ink of '1'
        assert_eq!(text_extent("A1", &atlas).0, 10 + 4);
        assert_eq!(text_extent("1A1", &atlas).0, 6 + 10 + 4);
    }

    #[test]
    fn test_empty_text_emits_nothing() {
        let atlas = monospace_atlas();
        let mut renderer = TextRenderer::new();
        renderer.draw_text("", 100.0, 20.0, &atlas, 1.0);
        assert!(renderer.is_empty());
    }

    #[test]
    fn test_six_vertices_per_glyph() {
        let atlas = monospace_atlas();
        let mut renderer = TextRenderer::new();
        renderer.draw_text("12:34", 110.0, 25.0, &atlas, 1.0);
        assert_eq!(renderer.vertex_count(), 30);
        assert_eq!(renderer.glyph_count(), 5);
    }

    #[test]
    fn test_right_aligned_to_anchor() {
        let atlas = monospace_atlas();
        let mut renderer = TextRenderer::new();
        renderer.draw_text("AB", 100.0, 20.0, &atlas, 1.0);

        let v = renderer.vertices();
        // First glyph starts one extent left of the anchor.
        assert_eq!(v[0].position, [100.0 - 18.0, 20.0]);
        // Second glyph starts one advance later.
        assert_eq!(v[6].position, [100.0 - 8.0, 20.0]);
        // Its quad ends on the anchor because ink width equals cell width.
        assert_eq!(v[7].position, [100.0, 20.0]);
        assert_eq!(v[10].position, [100.0, 20.0 + 12.0]);
    }

    #[test]
    fn test_scale_applies_to_offsets_and_size() {
        let mut rasterizer = FixedRasterizer::monospace();
        rasterizer.set_origin_y('|', 13);
        let (atlas, _) = FontAtlas::build(&mut rasterizer).unwrap();

        let mut renderer = TextRenderer::new();
        renderer.draw_text("A", 50.0, 30.0, &atlas, 2.0);
        let v = renderer.vertices();
        // yoff of 'A' is 2 after normalization.
        assert_eq!(v[0].position, [50.0 - 16.0, 30.0 - 4.0]);
        assert_eq!(v[4].position, [50.0, 30.0 - 4.0 + 24.0]);
    }

    #[test]
    fn test_uv_rect_spans_uniform_cell() {
        let atlas = monospace_atlas();
        let glyph = *atlas.get_glyph('Z');
        let mut renderer = TextRenderer::new();
        renderer.draw_text("Z", 0.0, 0.0, &atlas, 1.0);

        let v = renderer.vertices();
        assert_eq!(v[0].uv, [glyph.u, glyph.v + atlas.vh()]);
        assert_eq!(v[4].uv, [glyph.u + atlas.uw(), glyph.v]);
        assert_eq!(v[2].uv, [glyph.u, glyph.v]);
    }

    #[test]
    fn test_unknown_chars_render_as_question_mark() {
        let atlas = monospace_atlas();
        let mut a = TextRenderer::new();
        let mut b = TextRenderer::new();
        a.draw_text("x\u{e9}", 10.0, 10.0, &atlas, 1.0);
        b.draw_text("x?", 10.0, 10.0, &atlas, 1.0);
        assert_eq!(a.vertices(), b.vertices());
    }

    #[test]
    fn test_long_strings_are_not_truncated() {
        let atlas = monospace_atlas();
        let text = "8".repeat(101);
        let mut renderer = TextRenderer::new();
        renderer.draw_text(&text, 2000.0, 10.0, &atlas, 1.0);
        assert_eq!(renderer.glyph_count(), 101);
        assert_eq!(renderer.vertices()[100 * 6].position[0], 2000.0 - 8.0);
    }

    #[test]
    fn test_clear_resets_batch() {
        let atlas = monospace_atlas();
        let mut renderer = TextRenderer::new();
        renderer.draw_text("12:00", 100.0, 25.0, &atlas, 1.0);
        renderer.draw_text("01.01.2026", 100.0, 10.0, &atlas, 1.0);
        assert_eq!(renderer.glyph_count(), 15);
        renderer.clear();
        assert!(renderer.is_empty());
    }
}
