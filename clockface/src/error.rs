//! Error types for atlas construction and GPU setup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("failed to load font {name}: {reason}")]
    FontLoad { name: String, reason: String },

    #[error("font {0} has no horizontal line metrics")]
    MissingLineMetrics(String),

    #[error("failed to rasterize {ch:?}: {reason}")]
    Rasterization { ch: char, reason: String },

    #[error("glyph {ch:?} metrics out of range: {field} = {value}")]
    MetricOutOfRange {
        ch: char,
        field: &'static str,
        value: i64,
    },
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("surface reports no supported texture formats")]
    IncompatibleSurface,

    #[error("surface does not support texture format {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),
}
