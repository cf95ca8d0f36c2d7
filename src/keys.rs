//! Key names to Windows virtual-key codes.
//!
//! The codes are plain numbers so they can be parsed and validated on any
//! platform; only the Win32 backend turns them into messages.

use std::fmt;

use crate::error::{KeepAliveError, Result};

/// A Windows virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const A: VirtualKey = VirtualKey(0x41);
    pub const SPACE: VirtualKey = VirtualKey(0x20);
    pub const SHIFT: VirtualKey = VirtualKey(0x10);

    pub fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VK 0x{:02X}", self.0)
    }
}

/// Parses a key name such as `a`, `7`, `f15`, `space` or `pagedown`.
///
/// Matching is case-insensitive. Modifier names are accepted on their own
/// because a lone shift tap is a common keep-alive choice.
pub fn parse_key(name: &str) -> Result<VirtualKey> {
    let key = name.trim().to_lowercase();
    if key.is_empty() {
        return Err(KeepAliveError::invalid_key(name, "key name is empty"));
    }

    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Ok(VirtualKey(c.to_ascii_uppercase() as u16));
        }
        if c.is_ascii_digit() {
            return Ok(VirtualKey(c as u16));
        }
    }

    if let Some(n) = key.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        return match n {
            1..=24 => Ok(VirtualKey(0x6F + n)),
            _ => Err(KeepAliveError::invalid_key(
                name,
                "function keys range from f1 to f24",
            )),
        };
    }

    let code = match key.as_str() {
        "space" => 0x20,
        "enter" | "return" => 0x0D,
        "tab" => 0x09,
        "escape" | "esc" => 0x1B,
        "backspace" => 0x08,
        "delete" | "del" => 0x2E,
        "insert" | "ins" => 0x2D,
        "home" => 0x24,
        "end" => 0x23,
        "pageup" => 0x21,
        "pagedown" => 0x22,
        "left" | "arrowleft" => 0x25,
        "up" | "arrowup" => 0x26,
        "right" | "arrowright" => 0x27,
        "down" | "arrowdown" => 0x28,
        "shift" => 0x10,
        "ctrl" | "control" => 0x11,
        "alt" => 0x12,
        "scrolllock" => 0x91,
        _ => return Err(KeepAliveError::invalid_key(name, "unknown key name")),
    };

    Ok(VirtualKey(code))
}
