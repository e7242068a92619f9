//! Adapter, device and surface setup.

use crate::error::GpuError;

/// GPU device shared by every clock window.
pub struct GpuContext {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Create the instance used for every surface.
    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    /// Pick an adapter able to present to `compatible_surface` and open a
    /// device on it.
    ///
    /// Adapters whose surfaces composite with alpha win over opaque ones.
    pub fn new(instance: &wgpu::Instance, compatible_surface: &wgpu::Surface<'_>) -> Result<Self, GpuError> {
        let adapter = select_adapter(instance, compatible_surface)?;

        let info = adapter.get_info();
        tracing::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Clockface Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        ))?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Surface format for every window, preferring a non-sRGB one so glyph
    /// coverage blends the same way it was rasterized.
    pub fn preferred_format(&self, surface: &wgpu::Surface<'_>) -> Result<wgpu::TextureFormat, GpuError> {
        pick_format(&surface.get_capabilities(&self.adapter).formats).ok_or(GpuError::IncompatibleSurface)
    }

    /// Configure `surface` for presenting `format` at the given pixel size.
    pub fn configure_surface(
        &self,
        surface: &wgpu::Surface<'_>,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<wgpu::SurfaceConfiguration, GpuError> {
        let caps = surface.get_capabilities(&self.adapter);
        if !caps.formats.contains(&format) {
            return Err(GpuError::UnsupportedFormat(format));
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 1,
            alpha_mode: pick_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
        };
        surface.configure(&self.device, &config);
        Ok(config)
    }
}

/// What adapter selection needs to know about one adapter.
#[derive(Debug, Clone)]
pub(crate) struct AdapterCandidate {
    pub supports_surface: bool,
    pub alpha_modes: Vec<wgpu::CompositeAlphaMode>,
    pub device_type: wgpu::DeviceType,
}

fn select_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<wgpu::Adapter, GpuError> {
    let mut adapters = instance.enumerate_adapters(wgpu::Backends::all());
    let candidates: Vec<AdapterCandidate> = adapters
        .iter()
        .map(|adapter| AdapterCandidate {
            supports_surface: adapter.is_surface_supported(surface),
            alpha_modes: surface.get_capabilities(adapter).alpha_modes,
            device_type: adapter.get_info().device_type,
        })
        .collect();

    if let Some(index) = pick_adapter(&candidates) {
        return Ok(adapters.swap_remove(index));
    }

    tracing::warn!(
        "No GPU adapter supports a transparent surface ({} checked); clocks will be drawn on an opaque background",
        candidates.len()
    );
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        force_fallback_adapter: false,
        compatible_surface: Some(surface),
    }))
    .ok_or(GpuError::NoAdapter)
}

/// Index of the best adapter that can present with alpha, low-power first.
pub(crate) fn pick_adapter(candidates: &[AdapterCandidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.supports_surface && supports_transparency(&c.alpha_modes))
        .min_by_key(|(_, c)| power_rank(c.device_type))
        .map(|(index, _)| index)
}

fn power_rank(device_type: wgpu::DeviceType) -> u8 {
    match device_type {
        wgpu::DeviceType::IntegratedGpu => 0,
        wgpu::DeviceType::DiscreteGpu => 1,
        wgpu::DeviceType::VirtualGpu => 2,
        wgpu::DeviceType::Other => 3,
        wgpu::DeviceType::Cpu => 4,
    }
}

pub(crate) fn supports_transparency(modes: &[wgpu::CompositeAlphaMode]) -> bool {
    modes.iter().any(|mode| {
        matches!(
            mode,
            wgpu::CompositeAlphaMode::PreMultiplied | wgpu::CompositeAlphaMode::PostMultiplied
        )
    })
}

/// First non-sRGB format, or the first format at all.
pub(crate) fn pick_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first().copied())
}

/// Prefer a compositing mode that lets transparent pixels show the desktop.
pub(crate) fn pick_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    [
        wgpu::CompositeAlphaMode::PreMultiplied,
        wgpu::CompositeAlphaMode::PostMultiplied,
    ]
    .into_iter()
    .find(|mode| modes.contains(mode))
    .or_else(|| modes.first().copied())
    .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::CompositeAlphaMode as Mode;

    #[test]
    fn test_alpha_mode_prefers_premultiplied() {
        let modes = [Mode::Opaque, Mode::PostMultiplied, Mode::PreMultiplied];
        assert_eq!(pick_alpha_mode(&modes), Mode::PreMultiplied);
    }

    #[test]
    fn test_alpha_mode_falls_back_to_post_multiplied() {
        assert_eq!(pick_alpha_mode(&[Mode::Opaque, Mode::PostMultiplied]), Mode::PostMultiplied);
    }

    fn candidate(device_type: wgpu::DeviceType, alpha_modes: &[Mode]) -> AdapterCandidate {
        AdapterCandidate {
            supports_surface: true,
            alpha_modes: alpha_modes.to_vec(),
            device_type,
        }
    }

    #[test]
    fn test_adapter_with_transparent_surface_wins() {
        // DX12 style opaque-only integrated adapter next to a Vulkan one that composites.
        let candidates = [
            candidate(wgpu::DeviceType::IntegratedGpu, &[Mode::Opaque]),
            candidate(wgpu::DeviceType::DiscreteGpu, &[Mode::Opaque, Mode::PreMultiplied]),
        ];
        assert_eq!(pick_adapter(&candidates), Some(1));
    }

    #[test]
    fn test_adapter_prefers_low_power_among_transparent() {
        let candidates = [
            candidate(wgpu::DeviceType::Cpu, &[Mode::PreMultiplied]),
            candidate(wgpu::DeviceType::DiscreteGpu, &[Mode::PostMultiplied]),
            candidate(wgpu::DeviceType::IntegratedGpu, &[Mode::PreMultiplied]),
        ];
        assert_eq!(pick_adapter(&candidates), Some(2));
    }

    #[test]
    fn test_adapter_must_support_surface() {
        let mut unsupported = candidate(wgpu::DeviceType::IntegratedGpu, &[Mode::PreMultiplied]);
        unsupported.supports_surface = false;
        assert_eq!(pick_adapter(&[unsupported]), None);
    }

    #[test]
    fn test_no_transparent_adapter() {
        let candidates = [
            candidate(wgpu::DeviceType::IntegratedGpu, &[Mode::Opaque]),
            candidate(wgpu::DeviceType::DiscreteGpu, &[Mode::Opaque, Mode::Inherit]),
        ];
        assert_eq!(pick_adapter(&candidates), None);
        assert_eq!(pick_adapter(&[]), None);
    }

    #[test]
    fn test_format_prefers_linear() {
        use wgpu::TextureFormat as Format;
        assert_eq!(
            pick_format(&[Format::Bgra8UnormSrgb, Format::Bgra8Unorm, Format::Rgba8Unorm]),
            Some(Format::Bgra8Unorm)
        );
        assert_eq!(pick_format(&[Format::Rgba8UnormSrgb]), Some(Format::Rgba8UnormSrgb));
        assert_eq!(pick_format(&[]), None);
    }

    #[test]
    fn test_alpha_mode_opaque_only() {
        assert_eq!(pick_alpha_mode(&[Mode::Opaque]), Mode::Opaque);
        assert_eq!(pick_alpha_mode(&[]), Mode::Auto);
    }
}
