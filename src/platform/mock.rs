//! In-memory window tree and input backend.
//!
//! Nothing here touches the OS. Every posted message and cursor move is
//! recorded behind a `Mutex` so tests can share the mock through an `Arc`
//! and assert on exactly what was delivered and in which order.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Point, Rect, WindowBackend, WindowHandle, WindowMessage, WindowTree};
use crate::error::{KeepAliveError, Result};
use crate::injector::SessionKeyboard;
use crate::keys::VirtualKey;
use crate::window_locator::WindowCandidate;

/// A fake desktop: main windows per pid and children per window.
#[derive(Debug, Default)]
pub struct MockWindowTree {
    main_windows: HashMap<u32, WindowHandle>,
    children: HashMap<WindowHandle, Vec<WindowCandidate>>,
}

impl MockWindowTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_main_window(mut self, pid: u32, handle: WindowHandle) -> Self {
        self.main_windows.insert(pid, handle);
        self
    }

    /// Adds `handle` with `class_name` as a direct child of `parent`.
    pub fn with_child(mut self, parent: WindowHandle, handle: WindowHandle, class_name: &str) -> Self {
        self.children
            .entry(parent)
            .or_default()
            .push(WindowCandidate::new(class_name, handle));
        self
    }
}

impl WindowTree for MockWindowTree {
    fn main_window(&self, pid: u32) -> Option<WindowHandle> {
        self.main_windows.get(&pid).copied()
    }

    fn descendants(&self, root: WindowHandle) -> Vec<WindowCandidate> {
        let mut found = Vec::new();
        let mut pending = vec![root];
        while let Some(parent) = pending.pop() {
            for child in self.children.get(&parent).into_iter().flatten() {
                pending.push(child.handle);
                found.push(child.clone());
            }
        }
        found
    }
}

/// One recorded `post_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedMessage {
    pub window: WindowHandle,
    pub message: WindowMessage,
    pub wparam: usize,
    pub lparam: isize,
    /// Cursor position at the moment the message was posted.
    pub cursor: Point,
}

#[derive(Debug, Default)]
pub struct MockWindowBackend {
    pub posted: Mutex<Vec<PostedMessage>>,
    pub cursor: Mutex<Point>,
    /// Every position passed to `set_cursor_position`.
    pub cursor_moves: Mutex<Vec<Point>>,
    pub rects: Mutex<HashMap<WindowHandle, Rect>>,
    /// When `true`, `post_message` records nothing and reports failure.
    pub should_fail: bool,
}

impl MockWindowBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(self, point: Point) -> Self {
        *self.cursor.lock().unwrap() = point;
        self
    }

    pub fn with_rect(self, window: WindowHandle, rect: Rect) -> Self {
        self.rects.lock().unwrap().insert(window, rect);
        self
    }

    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted.lock().unwrap().clone()
    }

    pub fn cursor(&self) -> Point {
        *self.cursor.lock().unwrap()
    }
}

impl WindowBackend for MockWindowBackend {
    fn post_message(
        &self,
        window: WindowHandle,
        message: WindowMessage,
        wparam: usize,
        lparam: isize,
    ) -> bool {
        if self.should_fail {
            return false;
        }
        let cursor = self.cursor();
        self.posted.lock().unwrap().push(PostedMessage {
            window,
            message,
            wparam,
            lparam,
            cursor,
        });
        true
    }

    fn window_rect(&self, window: WindowHandle) -> Option<Rect> {
        self.rects.lock().unwrap().get(&window).copied()
    }

    fn cursor_position(&self) -> Option<Point> {
        Some(self.cursor())
    }

    fn set_cursor_position(&self, point: Point) -> bool {
        *self.cursor.lock().unwrap() = point;
        self.cursor_moves.lock().unwrap().push(point);
        true
    }

    fn scan_code(&self, key: VirtualKey) -> u32 {
        match key.code() {
            0x41 => 0x1E,
            0x20 => 0x39,
            _ => 0,
        }
    }
}

/// Virtual keyboard channel that records `(key, pressed)` pairs.
#[derive(Debug, Default)]
pub struct MockSessionKeyboard {
    pub events: Mutex<Vec<(VirtualKey, bool)>>,
    pub should_fail: bool,
}

impl MockSessionKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(VirtualKey, bool)> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, key: VirtualKey, pressed: bool) -> Result<()> {
        if self.should_fail {
            return Err(KeepAliveError::injection_delivery_failure(
                "mock session disconnected",
            ));
        }
        self.events.lock().unwrap().push((key, pressed));
        Ok(())
    }
}

impl SessionKeyboard for MockSessionKeyboard {
    fn send_key_down(&self, key: VirtualKey) -> Result<()> {
        self.record(key, true)
    }

    fn send_key_up(&self, key: VirtualKey) -> Result<()> {
        self.record(key, false)
    }
}
