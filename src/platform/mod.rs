//! Platform seam for window enumeration and message delivery.
//!
//! The engine only talks to [`WindowTree`] and [`WindowBackend`]. The Win32
//! implementation is compiled on Windows; other targets fail at startup with
//! [`crate::KeepAliveError::UnsupportedPlatform`]. The [`mock`] backend records
//! everything in memory and drives the tests.

use std::sync::Arc;

use crate::error::Result;
use crate::injector::SessionKeyboard;
use crate::keys::VirtualKey;
use crate::window_locator::WindowCandidate;

pub mod mock;

#[cfg(windows)]
pub mod win32;

/// Opaque native window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Screen rectangle in pixels, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point {
            x: self.left + (self.right - self.left) / 2,
            y: self.top + (self.bottom - self.top) / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// The window messages the injector posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMessage {
    KeyDown,
    KeyUp,
    LeftButtonDown,
    LeftButtonUp,
}

/// Read-only view of the desktop window hierarchy.
pub trait WindowTree: Send + Sync {
    /// Top-level, unowned, visible window of the process, if any.
    fn main_window(&self, pid: u32) -> Option<WindowHandle>;

    /// Every descendant of `root` with its class name.
    fn descendants(&self, root: WindowHandle) -> Vec<WindowCandidate>;
}

/// Fire-and-forget input primitives.
pub trait WindowBackend: Send + Sync {
    /// Posts a message to the window's queue without waiting for it to be
    /// processed. Returns `false` when the OS refused the post.
    fn post_message(
        &self,
        window: WindowHandle,
        message: WindowMessage,
        wparam: usize,
        lparam: isize,
    ) -> bool;

    fn window_rect(&self, window: WindowHandle) -> Option<Rect>;

    fn cursor_position(&self) -> Option<Point>;

    fn set_cursor_position(&self, point: Point) -> bool;

    /// Hardware scan code for a virtual key, 0 when unknown.
    fn scan_code(&self, key: VirtualKey) -> u32;
}

/// Native window tree and input backend for the current OS.
#[cfg(windows)]
pub fn native() -> Result<(Arc<dyn WindowTree>, Arc<dyn WindowBackend>)> {
    let windows = Arc::new(win32::Win32Windows::new());
    let tree: Arc<dyn WindowTree> = windows.clone();
    let backend: Arc<dyn WindowBackend> = windows;
    Ok((tree, backend))
}

#[cfg(not(windows))]
pub fn native() -> Result<(Arc<dyn WindowTree>, Arc<dyn WindowBackend>)> {
    Err(crate::error::KeepAliveError::unsupported_platform(
        "posting input to session windows requires Windows",
    ))
}

/// Keyboard stream of the focused session client.
#[cfg(windows)]
pub fn native_keyboard() -> Result<Arc<dyn SessionKeyboard>> {
    Ok(Arc::new(win32::Win32Keyboard::new()))
}

#[cfg(not(windows))]
pub fn native_keyboard() -> Result<Arc<dyn SessionKeyboard>> {
    Err(crate::error::KeepAliveError::unsupported_platform(
        "the session keyboard channel requires Windows",
    ))
}
