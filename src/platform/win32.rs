//! Win32 window enumeration, message posting and keyboard input via `winapi`.

#![cfg(windows)]

use std::mem;
use std::ptr;

use tracing::trace;
use winapi::shared::minwindef::{BOOL, DWORD, FALSE, LPARAM, TRUE, UINT, WPARAM};
use winapi::shared::windef::{HWND, POINT, RECT};
use winapi::um::winuser::{
    EnumChildWindows, EnumWindows, GetClassNameW, GetCursorPos, GetWindow, GetWindowRect,
    GetWindowThreadProcessId, IsWindowVisible, MapVirtualKeyW, PostMessageW, SendInput,
    SetCursorPos, GW_OWNER, INPUT, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP, MAPVK_VK_TO_VSC,
    WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP,
};

use super::{Point, Rect, WindowBackend, WindowHandle, WindowMessage, WindowTree};
use crate::error::{KeepAliveError, Result};
use crate::injector::SessionKeyboard;
use crate::keys::VirtualKey;
use crate::window_locator::WindowCandidate;

/// Zero-sized handle to the Win32 desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Windows;

impl Win32Windows {
    pub fn new() -> Self {
        Self
    }
}

fn hwnd(handle: WindowHandle) -> HWND {
    handle.0 as HWND
}

fn class_name(window: HWND) -> String {
    let mut buf = [0u16; 256];
    // SAFETY: buf outlives the call and its length is passed along.
    let len = unsafe { GetClassNameW(window, buf.as_mut_ptr(), buf.len() as i32) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..(len as usize).min(buf.len())])
}

struct MainWindowSearch {
    pid: DWORD,
    found: HWND,
}

unsafe extern "system" fn find_main_window(window: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam as *mut MainWindowSearch);
    let mut owner_pid: DWORD = 0;
    GetWindowThreadProcessId(window, &mut owner_pid);
    if owner_pid != search.pid {
        return TRUE;
    }
    if GetWindow(window, GW_OWNER).is_null() && IsWindowVisible(window) != FALSE {
        search.found = window;
        return FALSE;
    }
    TRUE
}

unsafe extern "system" fn collect_child(window: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam as *mut Vec<WindowCandidate>);
    found.push(WindowCandidate::new(
        class_name(window),
        WindowHandle(window as isize),
    ));
    TRUE
}

impl WindowTree for Win32Windows {
    fn main_window(&self, pid: u32) -> Option<WindowHandle> {
        let mut search = MainWindowSearch {
            pid,
            found: ptr::null_mut(),
        };
        // SAFETY: `search` lives until EnumWindows returns; the callback only
        // dereferences the pointer during enumeration.
        unsafe {
            EnumWindows(
                Some(find_main_window),
                &mut search as *mut MainWindowSearch as LPARAM,
            );
        }
        if search.found.is_null() {
            None
        } else {
            Some(WindowHandle(search.found as isize))
        }
    }

    fn descendants(&self, root: WindowHandle) -> Vec<WindowCandidate> {
        let mut found: Vec<WindowCandidate> = Vec::new();
        // SAFETY: same lifetime argument as in `main_window`. EnumChildWindows
        // already walks grandchildren.
        unsafe {
            EnumChildWindows(
                hwnd(root),
                Some(collect_child),
                &mut found as *mut Vec<WindowCandidate> as LPARAM,
            );
        }
        trace!(root = %root, count = found.len(), "enumerated child windows");
        found
    }
}

impl WindowBackend for Win32Windows {
    fn post_message(
        &self,
        window: WindowHandle,
        message: WindowMessage,
        wparam: usize,
        lparam: isize,
    ) -> bool {
        let msg: UINT = match message {
            WindowMessage::KeyDown => WM_KEYDOWN,
            WindowMessage::KeyUp => WM_KEYUP,
            WindowMessage::LeftButtonDown => WM_LBUTTONDOWN,
            WindowMessage::LeftButtonUp => WM_LBUTTONUP,
        };
        // SAFETY: PostMessageW tolerates stale handles and only queues.
        unsafe { PostMessageW(hwnd(window), msg, wparam as WPARAM, lparam as LPARAM) != FALSE }
    }

    fn window_rect(&self, window: WindowHandle) -> Option<Rect> {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        };
        // SAFETY: rect is a valid out pointer for the duration of the call.
        if unsafe { GetWindowRect(hwnd(window), &mut rect) } == FALSE {
            return None;
        }
        Some(Rect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    fn cursor_position(&self) -> Option<Point> {
        let mut point = POINT { x: 0, y: 0 };
        // SAFETY: point is a valid out pointer for the duration of the call.
        if unsafe { GetCursorPos(&mut point) } == FALSE {
            return None;
        }
        Some(Point {
            x: point.x,
            y: point.y,
        })
    }

    fn set_cursor_position(&self, point: Point) -> bool {
        unsafe { SetCursorPos(point.x, point.y) != FALSE }
    }

    fn scan_code(&self, key: VirtualKey) -> u32 {
        unsafe { MapVirtualKeyW(key.code() as UINT, MAPVK_VK_TO_VSC) }
    }
}

/// The input stream the focused remote desktop client forwards to its
/// session. Keys only reach the session while the client has focus.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Keyboard;

impl Win32Keyboard {
    pub fn new() -> Self {
        Self
    }

    fn send(&self, key: VirtualKey, key_up: bool) -> Result<()> {
        // SAFETY: INPUT is plain data; the keyboard member is filled in
        // before the struct is handed to SendInput.
        let mut input: INPUT = unsafe { mem::zeroed() };
        input.type_ = INPUT_KEYBOARD;
        unsafe {
            *input.u.ki_mut() = KEYBDINPUT {
                wVk: key.code(),
                wScan: 0,
                dwFlags: if key_up { KEYEVENTF_KEYUP } else { 0 },
                time: 0,
                dwExtraInfo: 0,
            };
        }

        // SAFETY: one valid INPUT and its exact size.
        let sent = unsafe { SendInput(1, &mut input, mem::size_of::<INPUT>() as i32) };
        if sent != 1 {
            return Err(KeepAliveError::injection_delivery_failure(format!(
                "SendInput rejected {key}"
            )));
        }
        Ok(())
    }
}

impl SessionKeyboard for Win32Keyboard {
    fn send_key_down(&self, key: VirtualKey) -> Result<()> {
        self.send(key, false)
    }

    fn send_key_up(&self, key: VirtualKey) -> Result<()> {
        self.send(key, true)
    }
}
