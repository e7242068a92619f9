//! Right-click context menu with a single "Close" item.

use winit::window::Window;

/// Item picked from the context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Close,
}

fn action_for<I: PartialEq + ?Sized>(selected: &I, close: &I) -> Option<MenuAction> {
    (selected == close).then_some(MenuAction::Close)
}

#[cfg(target_os = "windows")]
mod native {
    use muda::{ContextMenu, Menu, MenuEvent, MenuItem};
    use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};

    use super::{MenuAction, Window, action_for};

    /// Native popup menu shared by every clock window.
    pub struct ClockMenu {
        menu: Menu,
        close: MenuItem,
    }

    impl ClockMenu {
        pub fn new() -> anyhow::Result<Self> {
            let menu = Menu::new();
            let close = MenuItem::new("Close", true, None);
            menu.append(&close)?;
            Ok(Self { menu, close })
        }

        /// Open the menu at the cursor. The selection arrives through [`Self::poll`].
        pub fn show(&self, window: &Window) -> Option<MenuAction> {
            let hwnd = match window.window_handle().map(|handle| handle.as_raw()) {
                Ok(RawWindowHandle::Win32(handle)) => handle.hwnd.get(),
                Ok(other) => {
                    tracing::warn!("Context menu needs a Win32 window, got {:?}", other);
                    return None;
                }
                Err(e) => {
                    tracing::warn!("No window handle for context menu: {}", e);
                    return None;
                }
            };
            // SAFETY: `hwnd` belongs to `window`, which outlives the modal menu.
            let _ = unsafe { self.menu.show_context_menu_for_hwnd(hwnd, None) };
            None
        }

        /// Drain pending menu events.
        pub fn poll(&self) -> Option<MenuAction> {
            let mut action = None;
            while let Ok(event) = MenuEvent::receiver().try_recv() {
                action = action.or(action_for(event.id(), self.close.id()));
            }
            action
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod native {
    use super::{MenuAction, Window};

    /// Without a native popup, a right-click selects "Close" directly.
    pub struct ClockMenu;

    impl ClockMenu {
        pub fn new() -> anyhow::Result<Self> {
            tracing::debug!("No native context menu on this platform");
            Ok(Self)
        }

        pub fn show(&self, _window: &Window) -> Option<MenuAction> {
            Some(MenuAction::Close)
        }

        pub fn poll(&self) -> Option<MenuAction> {
            None
        }
    }
}

pub use native::ClockMenu;
