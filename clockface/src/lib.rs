//! Clockface: font atlas and glyph-quad text rendering.
//!
//! Builds a single-texture atlas for the printable ASCII range and renders
//! right-aligned strings from it with a minimal wgpu pipeline.
//!
//! # Architecture
//!
//! - [`FontAtlas`] is built once from a [`GlyphRasterizer`] and never mutated.
//!   Building also yields an [`AtlasImage`], consumed by the GPU upload.
//! - [`TextRenderer`] turns strings into textured quads on the CPU.
//! - [`gpu::RenderResources`] owns the pipeline, the atlas texture and the
//!   vertex buffer, shared by every render target.
//!
//! # Usage
//!
//! ```ignore
//! use clockface::{FontAtlas, FontFlags, TextRenderer};
//!
//! let (atlas, image) = FontAtlas::create("Segoe UI Variable", 9, FontFlags::empty())?;
//! let mut text = TextRenderer::new();
//! text.draw_text("12:34", 110.0, 25.0, &atlas, 1.0);
//! ```

pub mod atlas;
pub mod error;
pub mod gpu;
pub mod raster;
pub mod text;

#[cfg(test)]
mod test_support;

pub use atlas::{AtlasImage, FontAtlas, Glyph, GridLayout, HICHAR, LOCHAR, NUM_CHARS};
pub use error::{AtlasError, GpuError};
pub use raster::{FontFlags, GlyphBitmap, GlyphMetrics, GlyphRasterizer, LineMetrics, SystemFontRasterizer};
pub use text::{TextRenderer, TextVertex, text_extent};
