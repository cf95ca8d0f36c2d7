//! # Session Keep-Alive
//!
//! Keeps a remote desktop session from hitting its idle timeout by posting
//! synthetic keyboard or pointer input to the session window on a fixed,
//! operator-controlled cadence.
//!
//! ## Pipeline
//!
//! - [`ProcessSession`] finds the running client and waits for its window
//! - [`window_locator::locate`] resolves the descendant window by class name
//! - [`InputInjector::for_session`] picks the session keyboard channel or the
//!   located window; the injector sends one key tap or one center click per tick
//! - [`Scheduler`] drives the injector, paused until the operator toggles it
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use session_keepalive::{
//!     platform, window_locator, InputInjector, ProcessSession, Scheduler, SessionController,
//!     TickAction, VirtualKey,
//! };
//!
//! # async fn demo() -> session_keepalive::Result<()> {
//! let (tree, backend) = platform::native()?;
//! let mut session = ProcessSession::new(tree.clone(), "mstsc.exe", 10, Duration::from_secs(1));
//! let process = session.resolve_target_process().await?;
//! session.wait_until_ready(&process).await?;
//!
//! let target = window_locator::locate(tree.as_ref(), &process, "IHWindowClass")?;
//! let scheduler = Scheduler::spawn(
//!     InputInjector::window(target, backend),
//!     TickAction::KeyTap(VirtualKey::A),
//!     Duration::from_secs(30),
//! );
//! scheduler.toggle();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod hotkey;
pub mod injector;
pub mod keys;
pub mod platform;
pub mod process_finder;
pub mod scheduler;
pub mod session;
pub mod window_locator;

pub use config::{Config, InjectionKind, InputChannel};
pub use error::{KeepAliveError, Result};
pub use injector::{InputInjector, SessionKeyboard, TickAction};
pub use keys::VirtualKey;
pub use process_finder::ProcessFinder;
pub use scheduler::{Interval, Phase, Scheduler, SimulationState};
pub use session::{ProcessHandle, ProcessSession, SessionController};
pub use window_locator::{TargetWindow, WindowCandidate};
