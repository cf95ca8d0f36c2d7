use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use session_keepalive::config::{parse_duration, InputChannel};
use session_keepalive::console::{self, Command, RawModeGuard};
use session_keepalive::platform::{self, WindowBackend, WindowTree};
use session_keepalive::{
    hotkey, Config, InjectionKind, InputInjector, ProcessSession, Scheduler, SessionController,
    TickAction,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "keepalive",
    version,
    about = "Keeps a remote desktop session alive by posting synthetic input to its window"
)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Remote desktop client process name
    #[arg(short, long)]
    process: Option<String>,

    /// Class name of the window that receives input
    #[arg(short, long)]
    window_class: Option<String>,

    /// Synthetic event sent on every tick
    #[arg(short, long, value_enum)]
    action: Option<InjectionKind>,

    /// Key tapped when the action is `key`
    #[arg(short, long)]
    key: Option<String>,

    /// Where tick input is delivered
    #[arg(long, value_enum)]
    channel: Option<InputChannel>,

    /// .rdp or .ica file that starts the client when it is not running
    #[arg(long, value_name = "FILE")]
    connect: Option<String>,

    /// Initial interval between ticks (1s to 60s)
    #[arg(short, long, value_parser = duration_arg)]
    interval: Option<Duration>,

    /// Attempts while waiting for the client process and window
    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long, value_parser = duration_arg)]
    retry_delay: Option<Duration>,

    /// Global hotkey that toggles the simulation, e.g. ctrl+alt+k
    #[arg(long)]
    hotkey: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<String>,
}

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

impl Cli {
    fn into_config(self) -> session_keepalive::Result<(Config, Option<String>)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(process) = self.process {
            config.process_name = process;
        }
        if let Some(class) = self.window_class {
            config.window_class = class;
        }
        if let Some(action) = self.action {
            config.action = action;
        }
        if let Some(key) = self.key {
            config.key = key;
        }
        if let Some(channel) = self.channel {
            config.channel = channel;
        }
        if self.connect.is_some() {
            config.connection_file = self.connect;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(delay) = self.retry_delay {
            config.retry_delay = delay;
        }
        if self.hotkey.is_some() {
            config.toggle_hotkey = self.hotkey;
        }
        config.verbose |= self.verbose;

        config.validate()?;
        Ok((config, self.save_config))
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "session_keepalive=debug,keepalive=debug"
    } else {
        "session_keepalive=info,keepalive=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(console::log_writer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let (config, save_path) = match Cli::parse().into_config() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = save_path {
        return match config.save_to_file(&path) {
            Ok(()) => {
                println!("Configuration saved to {}", path.bold());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{} {e}", "error:".red().bold());
                ExitCode::FAILURE
            }
        };
    }

    init_logging(config.verbose);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let action = match config.action {
        InjectionKind::Key => TickAction::KeyTap(config.virtual_key()?),
        InjectionKind::Click => TickAction::Click,
    };
    let (tree, backend) = platform::native()?;

    let mut session = ProcessSession::new(
        tree.clone(),
        &config.process_name,
        config.max_retries,
        config.retry_delay,
    );
    if let Some(file) = &config.connection_file {
        session = session.with_connection_file(file);
    }
    if config.channel == InputChannel::Session {
        session = session.with_keyboard(platform::native_keyboard()?);
    }
    let outcome = drive(&mut session, tree, backend, &config, action).await;
    session.release();
    outcome
}

async fn drive(
    session: &mut ProcessSession,
    tree: Arc<dyn WindowTree>,
    backend: Arc<dyn WindowBackend>,
    config: &Config,
    action: TickAction,
) -> anyhow::Result<()> {
    info!(process = %config.process_name, "waiting for the remote desktop client");
    let process = session.resolve_target_process().await?;
    session.wait_until_ready(&process).await?;

    let injector = InputInjector::for_session(
        &*session,
        tree.as_ref(),
        backend,
        &process,
        &config.window_class,
    )?;
    let scheduler = Scheduler::spawn(injector, action, config.interval);

    let (commands, mut incoming) = mpsc::unbounded_channel();
    let mut toggle_hotkey = config.toggle_hotkey.as_deref();
    if let Some(value) = toggle_hotkey {
        match hotkey::spawn_toggle_listener(value, commands.clone()) {
            Ok(()) => {}
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "continuing without the global hotkey");
                toggle_hotkey = None;
            }
            Err(e) => return Err(e.into()),
        }
    }

    console::print_banner(&scheduler.state(), toggle_hotkey);
    let raw_mode = RawModeGuard::enable().context("failed to switch the terminal to raw mode")?;
    console::spawn_key_reader(commands);

    while let Some(command) = incoming.recv().await {
        let state = match command {
            Command::Toggle => scheduler.toggle(),
            Command::IncreaseInterval => scheduler.increase_interval(),
            Command::DecreaseInterval => scheduler.decrease_interval(),
            Command::Terminate => break,
        };
        console::print_status(&state);
    }

    drop(raw_mode);
    let state = scheduler.terminate().await;
    console::print_status(&state);
    Ok(())
}
