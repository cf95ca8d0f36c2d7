//! Optional global hotkey that toggles the simulation from any window.
//!
//! The hotkey manager lives on its own thread. On Windows that thread also
//! pumps messages, which is how `global-hotkey` receives `WM_HOTKEY`.

use std::str::FromStr;
use std::sync::mpsc as std_mpsc;
use std::thread;

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::console::Command;
use crate::error::{KeepAliveError, Result};

/// Parses strings such as `ctrl+alt+k` or `shift+F9`.
pub fn parse_hotkey(value: &str) -> Result<HotKey> {
    if value.trim().is_empty() {
        return Err(KeepAliveError::hotkey("hotkey is empty"));
    }
    HotKey::from_str(value.trim()).map_err(|e| KeepAliveError::hotkey(format!("'{value}': {e}")))
}

/// Registers `value` globally and forwards each press as [`Command::Toggle`].
///
/// Returns once registration succeeded or failed; the listener threads run
/// for the rest of the process.
pub fn spawn_toggle_listener(value: &str, commands: UnboundedSender<Command>) -> Result<()> {
    let hotkey = parse_hotkey(value)?;
    let hotkey_id = hotkey.id();
    let (registered_tx, registered_rx) = std_mpsc::channel::<Result<()>>();

    thread::Builder::new()
        .name("hotkey-manager".into())
        .spawn(move || {
            let manager = match GlobalHotKeyManager::new() {
                Ok(manager) => manager,
                Err(e) => {
                    let _ = registered_tx.send(Err(KeepAliveError::hotkey(e.to_string())));
                    return;
                }
            };
            if let Err(e) = manager.register(hotkey) {
                let _ = registered_tx.send(Err(KeepAliveError::hotkey(e.to_string())));
                return;
            }
            let _ = registered_tx.send(Ok(()));
            pump_messages();
            drop(manager);
        })?;

    registered_rx
        .recv()
        .map_err(|_| KeepAliveError::hotkey("hotkey thread exited during registration"))??;

    thread::Builder::new()
        .name("hotkey-events".into())
        .spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.id != hotkey_id || event.state != HotKeyState::Pressed {
                    continue;
                }
                debug!("toggle hotkey pressed");
                if commands.send(Command::Toggle).is_err() {
                    break;
                }
            }
        })?;

    info!(hotkey = value, "global toggle hotkey registered");
    Ok(())
}

#[cfg(windows)]
fn pump_messages() {
    use winapi::um::winuser::{DispatchMessageW, GetMessageW, TranslateMessage, MSG};

    // SAFETY: `msg` is a plain out struct owned by this thread.
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_messages() {
    // The manager runs its own event thread here; just keep it alive.
    loop {
        thread::park();
    }
}
