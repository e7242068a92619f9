//! GPU rendering for clockface.
//!
//! One [`GpuContext`] and one [`RenderResources`] are created at startup and
//! shared by every clock window; each window only owns its surface.

mod context;
mod pipeline;

pub use context::GpuContext;
pub use pipeline::{AtlasTexture, GlyphCapacity, RenderResources, create_orthographic_matrix};

// Re-exported for surface handling in the app crate.
pub use wgpu;
