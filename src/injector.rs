//! Synthesizes one unit of input against the target.
//!
//! Two delivery paths exist. Native session windows get posted window
//! messages; clients that expose a virtual keyboard channel for their session
//! get key events through that channel instead. Both are best-effort: a post
//! to a closed window succeeds or fails silently at the OS level and nothing
//! here waits for the application to react.

use std::fmt;
use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::error::{KeepAliveError, Result};
use crate::keys::VirtualKey;
use crate::platform::{Point, WindowBackend, WindowMessage, WindowTree};
use crate::session::{ProcessHandle, SessionController};
use crate::window_locator::{self, TargetWindow};

const MK_LBUTTON: usize = 0x0001;

/// Keyboard channel of a remote session object.
pub trait SessionKeyboard: Send + Sync {
    fn send_key_down(&self, key: VirtualKey) -> Result<()>;
    fn send_key_up(&self, key: VirtualKey) -> Result<()>;
}

/// The synthetic event produced on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    KeyTap(VirtualKey),
    Click,
}

impl fmt::Display for TickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickAction::KeyTap(key) => write!(f, "key tap ({key})"),
            TickAction::Click => write!(f, "center click"),
        }
    }
}

#[derive(Clone)]
pub enum InputInjector {
    /// Posts window messages to a located native window.
    Window {
        target: TargetWindow,
        backend: Arc<dyn WindowBackend>,
    },
    /// Sends keys through a session's virtual keyboard.
    Session { keyboard: Arc<dyn SessionKeyboard> },
}

impl fmt::Debug for InputInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputInjector::Window { target, .. } => {
                f.debug_struct("Window").field("target", target).finish()
            }
            InputInjector::Session { .. } => f.write_str("Session"),
        }
    }
}

impl InputInjector {
    pub fn window(target: TargetWindow, backend: Arc<dyn WindowBackend>) -> Self {
        Self::Window { target, backend }
    }

    pub fn session(keyboard: Arc<dyn SessionKeyboard>) -> Self {
        Self::Session { keyboard }
    }

    /// Picks the delivery path for a ready session: its keyboard channel when
    /// it exposes one, otherwise the `window_class` window of `process`.
    pub fn for_session<S: SessionController>(
        session: &S,
        tree: &dyn WindowTree,
        backend: Arc<dyn WindowBackend>,
        process: &ProcessHandle,
        window_class: &str,
    ) -> Result<Self> {
        if let Some(keyboard) = session.session_keyboard() {
            info!(pid = process.pid, "input goes through the session keyboard channel");
            return Ok(Self::session(keyboard));
        }

        let target = window_locator::locate(tree, process, window_class)?;
        info!(
            window = %target.handle(),
            class = target.class_name(),
            "input goes to the session window"
        );
        Ok(Self::window(target, backend))
    }

    pub fn inject(&self, action: TickAction) -> Result<()> {
        match action {
            TickAction::KeyTap(key) => self.inject_key_tap(key),
            TickAction::Click => self.inject_click(),
        }
    }

    /// Key-down immediately followed by key-up. No modifiers, no delay.
    pub fn inject_key_tap(&self, key: VirtualKey) -> Result<()> {
        match self {
            InputInjector::Window { target, backend } => {
                let scan = backend.scan_code(key);
                let window = target.handle();
                let code = key.code() as usize;

                let down = key_lparam(scan, false);
                if !backend.post_message(window, WindowMessage::KeyDown, code, down) {
                    return Err(KeepAliveError::injection_delivery_failure(format!(
                        "key-down for {key} was not queued to window {window}"
                    )));
                }
                let up = key_lparam(scan, true);
                if !backend.post_message(window, WindowMessage::KeyUp, code, up) {
                    return Err(KeepAliveError::injection_delivery_failure(format!(
                        "key-up for {key} was not queued to window {window}"
                    )));
                }
                trace!(%key, %window, "posted key tap");
                Ok(())
            }
            InputInjector::Session { keyboard } => {
                keyboard.send_key_down(key)?;
                keyboard.send_key_up(key)?;
                trace!(%key, "sent key tap over session channel");
                Ok(())
            }
        }
    }

    /// Left click at the center of the target window's screen rectangle.
    ///
    /// The global pointer is moved to the center for the duration of the
    /// click and put back afterwards, also when posting fails.
    pub fn inject_click(&self) -> Result<()> {
        let (target, backend) = match self {
            InputInjector::Window { target, backend } => (target, backend),
            InputInjector::Session { .. } => {
                return Err(KeepAliveError::injection_delivery_failure(
                    "pointer input is not available over the session keyboard channel",
                ))
            }
        };

        let window = target.handle();
        let rect = backend.window_rect(window).ok_or_else(|| {
            KeepAliveError::injection_delivery_failure(format!(
                "could not read the rectangle of window {window}"
            ))
        })?;
        let center = rect.center();
        // Mouse message coordinates are relative to the window origin.
        let lparam = pack_point(Point {
            x: center.x - rect.left,
            y: center.y - rect.top,
        });

        let _snapshot = CursorSnapshot::capture(backend.as_ref()).ok_or_else(|| {
            KeepAliveError::injection_delivery_failure("could not read the cursor position")
        })?;

        if !backend.set_cursor_position(center) {
            warn!(x = center.x, y = center.y, "failed to move cursor to window center");
        }

        if !backend.post_message(window, WindowMessage::LeftButtonDown, MK_LBUTTON, lparam) {
            return Err(KeepAliveError::injection_delivery_failure(format!(
                "button-down was not queued to window {window}"
            )));
        }
        if !backend.post_message(window, WindowMessage::LeftButtonUp, 0, lparam) {
            return Err(KeepAliveError::injection_delivery_failure(format!(
                "button-up was not queued to window {window}"
            )));
        }

        trace!(%window, x = center.x, y = center.y, "posted center click");
        Ok(())
    }
}

/// Pointer position captured before a click and restored when dropped.
struct CursorSnapshot<'a> {
    backend: &'a dyn WindowBackend,
    position: Point,
}

impl<'a> CursorSnapshot<'a> {
    fn capture(backend: &'a dyn WindowBackend) -> Option<Self> {
        let position = backend.cursor_position()?;
        Some(Self { backend, position })
    }
}

impl Drop for CursorSnapshot<'_> {
    fn drop(&mut self) {
        if !self.backend.set_cursor_position(self.position) {
            warn!(
                x = self.position.x,
                y = self.position.y,
                "failed to restore cursor position"
            );
        }
    }
}

/// lParam for WM_KEYDOWN / WM_KEYUP: repeat count 1 and the scan code; key-up
/// also sets the previous-state and transition bits.
pub fn key_lparam(scan_code: u32, key_up: bool) -> isize {
    let mut value: u32 = 1 | ((scan_code & 0xFF) << 16);
    if key_up {
        value |= (1 << 30) | (1 << 31);
    }
    value as isize
}

/// Packs a point the way MAKELPARAM does: x in the low word, y in the high word.
pub fn pack_point(point: Point) -> isize {
    let x = point.x as i16 as u16 as u32;
    let y = point.y as i16 as u16 as u32;
    ((y << 16) | x) as isize
}
