//! Font atlas for GPU text rendering.
//!
//! Rasterizes the printable ASCII range once into a single square,
//! single-channel texture. Every glyph occupies a uniform cell sized to the
//! largest ink box in the range, laid out on a grid chosen to keep the texture
//! close to square.

use crate::error::AtlasError;
use crate::raster::{FontFlags, GlyphRasterizer, SystemFontRasterizer};

/// First character stored in the atlas.
pub const LOCHAR: char = ' ';
/// Last character stored in the atlas.
pub const HICHAR: char = '~';
/// Number of glyphs in the atlas.
pub const NUM_CHARS: usize = HICHAR as usize - LOCHAR as usize + 1;

/// Substitute for characters outside `LOCHAR..=HICHAR`.
const FALLBACK_CHAR: char = '?';

/// Dots per inch used to convert point sizes when none is given.
pub const DEFAULT_DPI: f32 = 96.0;

/// Padding added to each cell while packing so neighbours never bleed.
const CELL_PADDING: u32 = 1;

/// Render metadata for one character.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Glyph {
    /// Normalized top-left corner of the glyph cell.
    pub u: f32,
    pub v: f32,
    /// Ink bounding box.
    pub char_width: u16,
    pub char_height: u16,
    /// Pen advance after this glyph.
    pub advance: i16,
    /// Offset from the pen origin to the ink origin.
    pub xoff: i16,
    /// Distance from the normalized baseline down to the top of the ink.
    pub yoff: i16,
}

/// Cell grid used to pack glyphs into the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub cell_width: u32,
    pub cell_height: u32,
    pub num_cols: u32,
    pub num_rows: u32,
    /// Side of the square texture (power of two).
    pub texture_width: u32,
}

impl GridLayout {
    /// Lay out `NUM_CHARS` cells of the given (padded) size.
    ///
    /// Rows and columns are balanced against the cell aspect ratio so the
    /// packed area stays close to square.
    pub fn for_cell(cell_width: u32, cell_height: u32) -> Self {
        let cell_width = cell_width.max(1);
        let cell_height = cell_height.max(1);

        let average_texture_width = (NUM_CHARS as f32).sqrt();
        let ratio = (cell_height as f32 / cell_width as f32).sqrt();
        let num_cols = (average_texture_width * ratio).ceil() as u32;
        let num_rows = (average_texture_width / ratio).ceil() as u32;

        let needed = (num_cols * cell_width).max(num_rows * cell_height);

        Self {
            cell_width,
            cell_height,
            num_cols,
            num_rows,
            texture_width: needed.next_power_of_two(),
        }
    }

    /// Pixel position of the top-left corner of cell `index`.
    #[inline]
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        (
            (index % self.num_cols) * self.cell_width,
            (index / self.num_cols) * self.cell_height,
        )
    }
}

/// Single-channel atlas pixels waiting for GPU upload.
#[derive(Debug, Clone)]
pub struct AtlasImage {
    side: u32,
    pixels: Vec<u8>,
}

impl AtlasImage {
    fn new(side: u32) -> Self {
        Self {
            side,
            pixels: vec![0u8; (side * side) as usize],
        }
    }

    /// Width and height of the square image.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Row-major 8-bit alpha values.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Alpha at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.side + x) as usize]
    }
}

/// Immutable glyph table and font metrics for one font at one size.
#[derive(Debug, Clone)]
pub struct FontAtlas {
    glyphs: [Glyph; NUM_CHARS],
    layout: GridLayout,
    glyph_width: u32,
    glyph_height: u32,
    font_height: i32,
    font_ascent: i32,
    font_descent: i32,
}

impl FontAtlas {
    /// Build an atlas for an installed font at 96 dpi.
    pub fn create(
        font_name: &str,
        font_size: u32,
        flags: FontFlags,
    ) -> Result<(Self, AtlasImage), AtlasError> {
        Self::create_with_dpi(font_name, font_size, flags, DEFAULT_DPI)
    }

    /// Build an atlas for an installed font at the given dpi.
    pub fn create_with_dpi(
        font_name: &str,
        font_size: u32,
        flags: FontFlags,
        dpi: f32,
    ) -> Result<(Self, AtlasImage), AtlasError> {
        let mut rasterizer = SystemFontRasterizer::new(font_name, font_size as f32, flags, dpi)?;
        Self::build(&mut rasterizer)
    }

    /// Rasterize `LOCHAR..=HICHAR` with `rasterizer` and pack the result.
    pub fn build<R: GlyphRasterizer + ?Sized>(
        rasterizer: &mut R,
    ) -> Result<(Self, AtlasImage), AtlasError> {
        let line = rasterizer.line_metrics();

        // Largest ink box decides the cell size.
        let mut max_width = 0;
        let mut max_height = 0;
        for ch in atlas_chars() {
            let m = rasterizer.glyph_metrics(ch)?;
            max_width = max_width.max(m.width);
            max_height = max_height.max(m.height);
        }

        let layout = GridLayout::for_cell(max_width + CELL_PADDING, max_height + CELL_PADDING);
        let side = layout.texture_width;
        let mut image = AtlasImage::new(side);

        let mut glyphs = [Glyph::default(); NUM_CHARS];
        let mut yoffs = [0i32; NUM_CHARS];

        for (i, ch) in atlas_chars().enumerate() {
            let bitmap = rasterizer.rasterize(ch)?;
            let m = bitmap.metrics;
            if m.width > max_width || m.height > max_height {
                return Err(AtlasError::Rasterization {
                    ch,
                    reason: format!(
                        "ink box {}x{} exceeds measured cell {}x{}",
                        m.width, m.height, max_width, max_height
                    ),
                });
            }

            let (glyph_x, glyph_y) = layout.cell_origin(i);
            for y in 0..m.height {
                let row = bitmap.row(y as usize).ok_or_else(|| AtlasError::Rasterization {
                    ch,
                    reason: format!("coverage buffer ends before row {}", y),
                })?;
                let dst = ((glyph_y + y) * side + glyph_x) as usize;
                for (x, &value) in row.iter().enumerate() {
                    image.pixels[dst + x] = bitmap.alpha(value);
                }
            }

            yoffs[i] = line.ascent - m.origin_y;
            glyphs[i] = Glyph {
                u: glyph_x as f32 / side as f32,
                v: glyph_y as f32 / side as f32,
                char_width: narrow(ch, "char_width", m.width.into())?,
                char_height: narrow(ch, "char_height", m.height.into())?,
                advance: narrow(ch, "advance", m.advance.into())?,
                xoff: narrow(ch, "xoff", m.origin_x.into())?,
                yoff: 0,
            };
        }

        // Shift offsets so the tallest glyph sits at zero.
        let min_yoff = yoffs.iter().copied().min().unwrap_or(0);
        for (glyph, (yoff, ch)) in glyphs.iter_mut().zip(yoffs.iter().zip(atlas_chars())) {
            glyph.yoff = narrow(ch, "yoff", (yoff - min_yoff).into())?;
        }

        let atlas = Self {
            glyphs,
            layout,
            glyph_width: layout.cell_width - CELL_PADDING,
            glyph_height: layout.cell_height - CELL_PADDING,
            font_height: line.height - min_yoff,
            font_ascent: line.ascent - min_yoff,
            font_descent: line.descent,
        };

        tracing::info!(
            "Built font atlas: {}x{} texture, {}x{} cells in {} cols x {} rows",
            side,
            side,
            atlas.glyph_width,
            atlas.glyph_height,
            layout.num_cols,
            layout.num_rows
        );

        Ok((atlas, image))
    }

    /// Glyph for `c`, substituting `'?'` outside the stored range.
    #[inline]
    pub fn get_glyph(&self, c: char) -> &Glyph {
        let c = if (LOCHAR..=HICHAR).contains(&c) { c } else { FALLBACK_CHAR };
        &self.glyphs[c as usize - LOCHAR as usize]
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn glyph_width(&self) -> u32 {
        self.glyph_width
    }

    pub fn glyph_height(&self) -> u32 {
        self.glyph_height
    }

    pub fn texture_width(&self) -> u32 {
        self.layout.texture_width
    }

    pub fn font_height(&self) -> i32 {
        self.font_height
    }

    pub fn font_ascent(&self) -> i32 {
        self.font_ascent
    }

    pub fn font_descent(&self) -> i32 {
        self.font_descent
    }

    pub fn font_height_above_baseline(&self) -> i32 {
        self.font_height - self.font_descent
    }

    /// Normalized cell width.
    pub fn uw(&self) -> f32 {
        self.glyph_width as f32 / self.texture_width() as f32
    }

    /// Normalized cell height.
    pub fn vh(&self) -> f32 {
        self.glyph_height as f32 / self.texture_width() as f32
    }
}

fn atlas_chars() -> impl Iterator<Item = char> {
    LOCHAR..=HICHAR
}

fn narrow<T: TryFrom<i64>>(ch: char, field: &'static str, value: i64) -> Result<T, AtlasError> {
    T::try_from(value).map_err(|_| AtlasError::MetricOutOfRange { ch, field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedRasterizer;

    #[test]
    fn test_num_chars_covers_printable_ascii() {
        assert_eq!(NUM_CHARS, 95);
        assert_eq!(atlas_chars().count(), NUM_CHARS);
    }

    #[test]
    fn test_grid_layout_square_cells() {
        let layout = GridLayout::for_cell(9, 9);
        // sqrt(95) = 9.75 -> 10 x 10 cells of 9px = 90px -> 128
        assert_eq!(layout.num_cols, 10);
        assert_eq!(layout.num_rows, 10);
        assert_eq!(layout.texture_width, 128);
    }

    #[test]
    fn test_grid_layout_tall_cells_get_more_columns() {
        let layout = GridLayout::for_cell(8, 18);
        assert!(layout.num_cols > layout.num_rows);
        assert!(layout.num_cols as usize * layout.num_rows as usize >= NUM_CHARS);
        assert!(layout.texture_width.is_power_of_two());
        assert!(layout.texture_width >= layout.num_cols * layout.cell_width);
        assert!(layout.texture_width >= layout.num_rows * layout.cell_height);
    }

    #[test]
    fn test_cell_origin_wraps_rows() {
        let layout = GridLayout::for_cell(9, 9);
        assert_eq!(layout.cell_origin(0), (0, 0));
        assert_eq!(layout.cell_origin(3), (27, 0));
        assert_eq!(layout.cell_origin(10), (0, 9));
        assert_eq!(layout.cell_origin(94), (36, 81));
    }

    #[test]
    fn test_out_of_range_uses_question_mark() {
        let (atlas, _) = FontAtlas::build(&mut FixedRasterizer::monospace()).unwrap();
        let question = atlas.get_glyph('?');
        assert_eq!(atlas.get_glyph('\n'), question);
        assert_eq!(atlas.get_glyph('\u{7f}'), question);
        assert_eq!(atlas.get_glyph('é'), question);
        assert_ne!(atlas.get_glyph('A'), question);
    }

    #[test]
    fn test_padding_removed_from_reported_cell() {
        let (atlas, _) = FontAtlas::build(&mut FixedRasterizer::monospace()).unwrap();
        assert_eq!(atlas.glyph_width(), 8);
        assert_eq!(atlas.glyph_height(), 12);
        assert_eq!(atlas.layout().cell_width, 9);
        assert_eq!(atlas.layout().cell_height, 13);
        assert_eq!(atlas.uw(), 8.0 / atlas.texture_width() as f32);
        assert_eq!(atlas.vh(), 12.0 / atlas.texture_width() as f32);
    }

    #[test]
    fn test_uv_is_cell_top_left() {
        let (atlas, _) = FontAtlas::build(&mut FixedRasterizer::monospace()).unwrap();
        let layout = atlas.layout();
        let side = atlas.texture_width() as f32;
        for (i, glyph) in atlas.glyphs().iter().enumerate() {
            let (x, y) = layout.cell_origin(i);
            assert_eq!(glyph.u, x as f32 / side);
            assert_eq!(glyph.v, y as f32 / side);
        }
    }

    #[test]
    fn test_baseline_normalization() {
        let mut rasterizer = FixedRasterizer::monospace();
        // '|' rises two pixels above everything else.
        rasterizer.set_origin_y('|', 13);
        let (atlas, _) = FontAtlas::build(&mut rasterizer).unwrap();

        let min = atlas.glyphs().iter().map(|g| g.yoff).min().unwrap();
        assert_eq!(min, 0);
        assert_eq!(atlas.get_glyph('|').yoff, 0);
        // ascent 11 - origin 11 = 0, shifted by +2
        assert_eq!(atlas.get_glyph('A').yoff, 2);
        assert_eq!(atlas.font_height(), 14 + 2);
        assert_eq!(atlas.font_ascent(), 11 + 2);
        assert_eq!(atlas.font_descent(), 3);
    }

    #[test]
    fn test_coverage_blitted_into_cell() {
        let (atlas, image) = FontAtlas::build(&mut FixedRasterizer::monospace()).unwrap();
        assert_eq!(image.side(), atlas.texture_width());

        let index = 'A' as usize - LOCHAR as usize;
        let (x, y) = atlas.layout().cell_origin(index);
        // Full 6-bit coverage becomes full alpha.
        assert_eq!(image.pixel(x, y), 255);
        assert_eq!(image.pixel(x + 7, y + 11), 255);
        // Padding column and row stay empty.
        assert_eq!(image.pixel(x + 8, y), 0);
        assert_eq!(image.pixel(x, y + 12), 0);
    }

    #[test]
    fn test_oversized_bitmap_is_rejected() {
        let mut rasterizer = FixedRasterizer::monospace();
        rasterizer.grow_bitmap_of('W');
        let err = FontAtlas::build(&mut rasterizer).unwrap_err();
        assert!(matches!(err, AtlasError::Rasterization { ch: 'W', .. }));
    }

    #[test]
    fn test_short_coverage_is_rejected() {
        let mut rasterizer = FixedRasterizer::monospace();
        rasterizer.truncate_coverage_of('g');
        let err = FontAtlas::build(&mut rasterizer).unwrap_err();
        assert!(matches!(err, AtlasError::Rasterization { ch: 'g', .. }));
    }
}
