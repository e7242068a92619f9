//! Monitor enumeration and clock placement.

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;

use crate::config::ClockConfig;

/// Geometry of one connected monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorInfo {
    pub index: usize,
    pub name: Option<String>,
    pub position: PhysicalPosition<i32>,
    pub size: PhysicalSize<u32>,
    pub scale_factor: f64,
    pub is_primary: bool,
    /// Physical pixels the system reserves outside the work area (the
    /// taskbar), when the platform reports it.
    pub reserved_height: Option<u32>,
}

/// Where a clock window goes on its monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: PhysicalPosition<i32>,
    pub size: PhysicalSize<u32>,
}

/// List connected monitors in platform order.
pub fn enumerate(event_loop: &ActiveEventLoop) -> Vec<MonitorInfo> {
    let primary = event_loop.primary_monitor();
    event_loop
        .available_monitors()
        .enumerate()
        .map(|(index, handle)| MonitorInfo {
            index,
            name: handle.name(),
            position: handle.position(),
            size: handle.size(),
            scale_factor: handle.scale_factor(),
            is_primary: primary.as_ref() == Some(&handle),
            reserved_height: reserved_height(&handle),
        })
        .collect()
}

/// Monitors that get a clock: all but the primary.
///
/// When the platform does not report a primary monitor, the first one is
/// treated as primary.
pub fn secondary_monitors(monitors: &[MonitorInfo]) -> Vec<&MonitorInfo> {
    if monitors.iter().any(|m| m.is_primary) {
        monitors.iter().filter(|m| !m.is_primary).collect()
    } else {
        monitors.iter().skip(1).collect()
    }
}

/// Monitor height minus work area height.
#[cfg(target_os = "windows")]
fn reserved_height(handle: &MonitorHandle) -> Option<u32> {
    use windows::Win32::Graphics::Gdi::{GetMonitorInfoW, HMONITOR, MONITORINFO};
    use winit::platform::windows::MonitorHandleExtWindows;

    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    let hmonitor = HMONITOR(handle.hmonitor() as *mut std::ffi::c_void);
    // SAFETY: `hmonitor` comes from a live winit monitor handle and `info`
    // is a properly sized MONITORINFO.
    let ok = unsafe { GetMonitorInfoW(hmonitor, &mut info) }.as_bool();
    if !ok {
        tracing::warn!("GetMonitorInfoW failed for {:?}", handle.name());
        return None;
    }

    let monitor_height = info.rcMonitor.bottom - info.rcMonitor.top;
    let work_height = info.rcWork.bottom - info.rcWork.top;
    u32::try_from(monitor_height - work_height).ok()
}

#[cfg(not(target_os = "windows"))]
fn reserved_height(_handle: &MonitorHandle) -> Option<u32> {
    None
}

/// Bottom-right corner of `monitor`, vertically centered on the taskbar.
///
/// The taskbar height is the monitor's reserved area when known, otherwise
/// the configured height.
pub fn clock_placement(monitor: &MonitorInfo, config: &ClockConfig) -> Placement {
    let scale = monitor.scale_factor;
    let scaled = |v: u32| (v as f64 * scale).round() as i32;

    let width = scaled(config.window_width).max(1);
    let height = scaled(config.window_height).max(1);
    let margin = scaled(config.margin);
    let taskbar = match monitor.reserved_height {
        Some(reserved) => i32::try_from(reserved).unwrap_or(i32::MAX),
        None => scaled(config.taskbar_height),
    };

    let right = monitor.position.x + monitor.size.width as i32;
    let bottom = monitor.position.y + monitor.size.height as i32;

    Placement {
        position: PhysicalPosition::new(right - width - margin, bottom - (height + taskbar) / 2),
        size: PhysicalSize::new(width as u32, height as u32),
    }
}

/// Placements for every monitor that gets a clock.
pub fn plan_windows(monitors: &[MonitorInfo], config: &ClockConfig) -> Vec<(MonitorInfo, Placement)> {
    secondary_monitors(monitors)
        .into_iter()
        .map(|m| (m.clone(), clock_placement(m, config)))
        .collect()
}
