//! Interactive operator surface on the terminal.
//!
//! Keys are read in raw mode on a dedicated thread and forwarded as
//! [`Command`]s to the async control loop. Everything printed while raw mode
//! is on ends lines with `\r\n`, log output included (see [`log_writer`]).

use std::io::{self, Write};
use std::thread;

use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::scheduler::{Phase, SimulationState};

/// Operator actions understood by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    IncreaseInterval,
    DecreaseInterval,
    Terminate,
}

impl Command {
    pub fn from_key_event(event: &KeyEvent) -> Option<Self> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        match event.code {
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Command::Terminate)
            }
            KeyCode::Char(' ') => Some(Command::Toggle),
            KeyCode::Up | KeyCode::Char('+') => Some(Command::IncreaseInterval),
            KeyCode::Down | KeyCode::Char('-') => Some(Command::DecreaseInterval),
            KeyCode::Esc | KeyCode::Char('q') => Some(Command::Terminate),
            _ => None,
        }
    }
}

/// Keeps the terminal in raw mode until dropped.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// Reads key presses until the operator terminates or the receiver is gone.
pub fn spawn_key_reader(commands: UnboundedSender<Command>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        match event::read() {
            Ok(Event::Key(key)) => {
                let Some(command) = Command::from_key_event(&key) else {
                    continue;
                };
                debug!(?command, "operator command");
                if commands.send(command).is_err() || command == Command::Terminate {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "terminal input failed, terminating");
                let _ = commands.send(Command::Terminate);
                break;
            }
        }
    })
}

/// Writer that ends every line with `\r\n`. Raw mode turns off the
/// terminal's own newline translation.
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in buf.split_inclusive(|&b| b == b'\n') {
            match line.strip_suffix(b"\n") {
                Some(body) if !body.ends_with(b"\r") => {
                    self.inner.write_all(body)?;
                    self.inner.write_all(b"\r\n")?;
                }
                _ => self.inner.write_all(line)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stderr for the tracing subscriber.
pub fn log_writer() -> CrlfWriter<io::Stderr> {
    CrlfWriter::new(io::stderr())
}

/// One human-readable line describing the state.
pub fn status_line(state: &SimulationState) -> String {
    let phase = match state.phase {
        Phase::Running => "running".green().bold(),
        Phase::Idle => "paused".yellow().bold(),
        Phase::Stopped => "stopped".red().bold(),
    };
    format!("Simulation {phase} | interval {}", state.interval.to_string().cyan())
}

/// Prints the status line. Works in both raw and cooked terminal modes.
pub fn print_status(state: &SimulationState) {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "{}\r\n", status_line(state));
    let _ = stdout.flush();
}

pub fn print_banner(state: &SimulationState, toggle_hotkey: Option<&str>) {
    println!("{}", "Session keep-alive ready".bold());
    println!("  {}  start/pause the simulation", "Space".bold());
    println!("  {}  change the interval by 1 s (1-60 s)", "Up/Down".bold());
    println!("  {}  exit", "Esc".bold());
    if let Some(hotkey) = toggle_hotkey {
        println!("  {}  start/pause from any window", hotkey.bold());
    }
    print_status(state);
}
