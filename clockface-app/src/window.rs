//! Per-monitor clock window.

use std::sync::Arc;

use clockface::gpu::{RenderResources, wgpu};
use clockface::{FontAtlas, GpuError, TextRenderer};
use winit::error::OsError;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId, WindowLevel};

use crate::clock::ClockText;
use crate::config::ClockConfig;
use crate::monitor::{MonitorInfo, Placement};

/// Borderless, transparent, always-on-top window showing time and date.
pub struct ClockWindow {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    monitor: MonitorInfo,
}

impl ClockWindow {
    /// Create the (still hidden) native window for `placement`.
    pub fn create_window(event_loop: &ActiveEventLoop, placement: &Placement) -> Result<Arc<Window>, OsError> {
        #[allow(unused_mut)]
        let mut attributes = Window::default_attributes()
            .with_title("clockface")
            .with_decorations(false)
            .with_transparent(true)
            .with_resizable(false)
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(placement.size)
            .with_position(placement.position);

        #[cfg(target_os = "windows")]
        {
            use winit::platform::windows::WindowAttributesExtWindows;
            attributes = attributes.with_skip_taskbar(true);
        }

        event_loop.create_window(attributes).map(Arc::new)
    }

    /// Configure `surface` with the shared pipeline format and show the window.
    pub fn new(
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        monitor: MonitorInfo,
        resources: &RenderResources,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let surface_config =
            resources
                .gpu()
                .configure_surface(&surface, resources.format(), size.width, size.height)?;

        window.set_visible(true);
        tracing::info!(
            "Clock window on monitor {} ({}) at {:?}",
            monitor.index,
            monitor.name.as_deref().unwrap_or("unnamed"),
            window.outer_position().ok()
        );

        Ok(Self {
            window,
            surface,
            surface_config,
            monitor,
        })
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn monitor(&self) -> &MonitorInfo {
        &self.monitor
    }

    /// Re-assert the always-on-top level so the taskbar cannot cover the clock.
    pub fn keep_on_top(&self) {
        self.window.set_window_level(WindowLevel::AlwaysOnTop);
    }

    /// Draw `text` into the window.
    pub fn render(
        &mut self,
        resources: &mut RenderResources,
        atlas: &FontAtlas,
        renderer: &mut TextRenderer,
        text: &ClockText,
        config: &ClockConfig,
    ) -> Result<(), GpuError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface of monitor {} lost, reconfiguring", self.monitor.index);
                self.surface.configure(resources.gpu().device(), &self.surface_config);
                self.surface.get_current_texture()?
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let viewport = (self.surface_config.width, self.surface_config.height);
        let scale = self.window.scale_factor() as f32;
        let anchors = text_anchors(viewport, scale, atlas.glyph_height(), config);

        renderer.clear();
        renderer.draw_text(&text.time, anchors.time.0, anchors.time.1, atlas, scale);
        renderer.draw_text(&text.date, anchors.date.0, anchors.date.1, atlas, scale);
        resources.render(&view, viewport, renderer);

        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }
}

/// Anchor points for the two text lines, origin at the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnchors {
    pub time: (f32, f32),
    pub date: (f32, f32),
}

/// Time sits on the vertical center; the date one glyph row below it.
/// Both are right-aligned `margin` pixels from the right edge.
pub fn text_anchors(viewport: (u32, u32), scale: f32, glyph_height: u32, config: &ClockConfig) -> TextAnchors {
    let x = viewport.0 as f32 - config.margin as f32 * scale;
    let y = (viewport.1 / 2) as f32;
    TextAnchors {
        time: (x, y),
        date: (x, y - (glyph_height + config.line_gap) as f32 * scale),
    }
}
