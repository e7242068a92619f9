//! Event loop: window setup, minute-debounced redraws and shutdown.

use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clockface::gpu::{GpuContext, RenderResources};
use clockface::{FontAtlas, TextRenderer};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::clock::{ClockText, MinuteTracker};
use crate::config::ClockConfig;
use crate::menu::{ClockMenu, MenuAction};
use crate::monitor;
use crate::window::ClockWindow;

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A clock window was closed.
    Closed,
    /// Only one monitor is connected; nothing to show.
    NoSecondaryMonitor,
}

/// Run the clocks until a window is closed.
pub fn run(config: ClockConfig) -> anyhow::Result<Outcome> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = ClockApp::new(config);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;
    app.finish()
}

/// Everything that exists once startup succeeded.
///
/// Fields drop in declaration order: window surfaces go before the device.
struct Running {
    windows: Vec<ClockWindow>,
    menu: ClockMenu,
    renderer: TextRenderer,
    text: Option<ClockText>,
    atlas: FontAtlas,
    resources: RenderResources,
}

impl Running {
    fn render_all(&mut self, config: &ClockConfig) {
        let Some(text) = &self.text else {
            return;
        };
        for window in &mut self.windows {
            if let Err(e) = window.render(&mut self.resources, &self.atlas, &mut self.renderer, text, config) {
                tracing::warn!("Skipping frame on monitor {}: {}", window.monitor().index, e);
            }
        }
    }

    fn render_one(&mut self, id: WindowId, config: &ClockConfig) {
        let Some(text) = &self.text else {
            return;
        };
        if let Some(window) = self.windows.iter_mut().find(|w| w.id() == id) {
            if let Err(e) = window.render(&mut self.resources, &self.atlas, &mut self.renderer, text, config) {
                tracing::warn!("Skipping redraw on monitor {}: {}", window.monitor().index, e);
            }
        }
    }
}

enum State {
    Starting,
    Running(Running),
    NoSecondaryMonitor,
    Failed(anyhow::Error),
    Closed,
}

struct ClockApp {
    config: ClockConfig,
    state: State,
    minutes: MinuteTracker,
    next_poll: Instant,
}

impl ClockApp {
    fn new(config: ClockConfig) -> Self {
        Self {
            config,
            state: State::Starting,
            minutes: MinuteTracker::new(),
            next_poll: Instant::now(),
        }
    }

    fn finish(self) -> anyhow::Result<Outcome> {
        match self.state {
            State::Failed(e) => Err(e),
            State::NoSecondaryMonitor => Ok(Outcome::NoSecondaryMonitor),
            State::Starting | State::Running(_) | State::Closed => Ok(Outcome::Closed),
        }
    }

    /// Build the atlas, windows and shared GPU resources.
    ///
    /// Returns `None` when there is no monitor besides the primary one.
    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Option<Running>> {
        let monitors = monitor::enumerate(event_loop);
        tracing::info!("Found {} monitor(s)", monitors.len());

        let planned = monitor::plan_windows(&monitors, &self.config);
        if planned.is_empty() {
            return Ok(None);
        }

        let (atlas, atlas_image) = FontAtlas::create_with_dpi(
            &self.config.font_name,
            self.config.font_size,
            self.config.font_flags(),
            self.config.dpi,
        )
        .with_context(|| format!("failed to build font atlas for {:?}", self.config.font_name))?;

        let instance = GpuContext::create_instance();
        let mut targets = Vec::with_capacity(planned.len());
        for (info, placement) in planned {
            let window = ClockWindow::create_window(event_loop, &placement)
                .with_context(|| format!("failed to create window on monitor {}", info.index))?;
            let surface = instance
                .create_surface(window.clone())
                .with_context(|| format!("failed to create surface on monitor {}", info.index))?;
            targets.push((window, surface, info));
        }

        // The first window's surface picks the adapter; every window shares it.
        let (gpu, format) = {
            let first = &targets[0].1;
            let gpu = GpuContext::new(&instance, first).context("failed to initialize GPU")?;
            let format = gpu.preferred_format(first).context("failed to pick surface format")?;
            (gpu, format)
        };
        let resources = RenderResources::new(gpu, format, atlas_image);

        let windows = targets
            .into_iter()
            .map(|(window, surface, info)| {
                let index = info.index;
                ClockWindow::new(window, surface, info, &resources)
                    .with_context(|| format!("failed to configure surface on monitor {}", index))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let menu = ClockMenu::new().context("failed to create context menu")?;

        Ok(Some(Running {
            windows,
            menu,
            renderer: TextRenderer::new(),
            text: None,
            atlas,
            resources,
        }))
    }

    /// Redraw every clock if the minute changed and keep them above the taskbar.
    fn poll(&mut self) {
        let State::Running(running) = &mut self.state else {
            return;
        };

        let now = Local::now();
        if self.minutes.advance(now.naive_local()) {
            match ClockText::format(&now, &self.config.time_format, &self.config.date_format) {
                Ok(text) => {
                    tracing::debug!("Rendering {} {}", text.time, text.date);
                    running.text = Some(text);
                    running.render_all(&self.config);
                }
                Err(e) => {
                    tracing::warn!("Failed to format time: {}", e);
                    // Try again on the next poll.
                    self.minutes.reset();
                }
            }
        }

        for window in &running.windows {
            window.keep_on_top();
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        tracing::info!("Clock closed, shutting down");
        self.state = State::Closed;
        event_loop.exit();
    }
}

impl ApplicationHandler for ClockApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, State::Starting) {
            return;
        }

        self.state = match self.start(event_loop) {
            Ok(Some(running)) => {
                tracing::info!("Started {} clock window(s)", running.windows.len());
                State::Running(running)
            }
            Ok(None) => {
                tracing::info!("Only one monitor connected, nothing to do");
                event_loop.exit();
                State::NoSecondaryMonitor
            }
            Err(e) => {
                tracing::error!("Startup failed: {:#}", e);
                event_loop.exit();
                State::Failed(e)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Right,
                ..
            } => {
                let action = match &self.state {
                    State::Running(running) => running
                        .windows
                        .iter()
                        .find(|w| w.id() == window_id)
                        .and_then(|w| running.menu.show(w.window())),
                    _ => None,
                };
                if action == Some(MenuAction::Close) {
                    self.close(event_loop);
                }
            }
            WindowEvent::RedrawRequested => {
                if let State::Running(running) = &mut self.state {
                    running.render_one(window_id, &self.config);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let menu_closed =
            matches!(&self.state, State::Running(running) if running.menu.poll() == Some(MenuAction::Close));
        if menu_closed {
            self.close(event_loop);
            return;
        }

        let now = Instant::now();
        if now >= self.next_poll {
            self.poll();
            self.next_poll = now + self.config.poll_interval();
        }
        if matches!(self.state, State::Running(_)) {
            event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_poll));
        }
    }
}
