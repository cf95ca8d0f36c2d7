//! Periodic injection driven by operator control.
//!
//! The scheduler owns a background tokio task and a `watch` channel holding
//! the [`SimulationState`]. Operator commands mutate the state through the
//! sender; the task reacts to every change. A tick re-reads the state and
//! injects while holding the channel's borrow, so a toggle, interval change
//! or stop either lands before the tick (and the tick sees it) or waits for
//! the in-flight injection to finish. Once [`Scheduler::terminate`] returns,
//! no further injection can fire.
//!
//! An interval change while running keeps the start of the current period:
//! the pending tick moves to `period start + new interval`, firing at once if
//! that moment has already passed. Switching the simulation on always starts
//! a fresh period. The channel only keeps the latest value, so a pause and
//! resume landing between two polls of the task would be invisible; every
//! Idle to Running transition therefore bumps [`SimulationState::run`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::injector::{InputInjector, TickAction};

pub const MIN_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_INTERVAL: Duration = Duration::from_secs(60);
pub const INTERVAL_STEP: Duration = Duration::from_secs(1);

/// Tick interval, always within [`MIN_INTERVAL`, `MAX_INTERVAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval(Duration);

impl Interval {
    /// Clamps `duration` into the allowed range.
    pub fn new(duration: Duration) -> Self {
        Self(duration.clamp(MIN_INTERVAL, MAX_INTERVAL))
    }

    pub fn increased(self) -> Self {
        Self::new(self.0.saturating_add(INTERVAL_STEP))
    }

    pub fn decreased(self) -> Self {
        Self::new(self.0.saturating_sub(INTERVAL_STEP))
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }

    pub fn as_millis(self) -> u128 {
        self.0.as_millis()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self(MIN_INTERVAL)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.as_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    /// Terminal.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationState {
    pub phase: Phase,
    pub interval: Interval,
    /// Bumped every time the simulation is switched on.
    pub run: u64,
}

impl SimulationState {
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Idle => "paused",
            Phase::Running => "running",
            Phase::Stopped => "stopped",
        };
        write!(f, "Simulation {phase} | interval {}", self.interval)
    }
}

pub struct Scheduler {
    control: watch::Sender<SimulationState>,
    ticks: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Arms a paused scheduler. Must be called from within a tokio runtime.
    pub fn spawn(injector: InputInjector, action: TickAction, interval: Duration) -> Self {
        let initial = SimulationState {
            phase: Phase::Idle,
            interval: Interval::new(interval),
            run: 0,
        };
        let (control, receiver) = watch::channel(initial);
        let ticks = Arc::new(AtomicU64::new(0));

        info!(%action, interval = %initial.interval, "scheduler armed (paused)");
        let task = tokio::spawn(run_ticks(receiver, injector, action, ticks.clone()));

        Self {
            control,
            ticks,
            task: Some(task),
        }
    }

    pub fn state(&self) -> SimulationState {
        *self.control.borrow()
    }

    /// Number of injections fired so far.
    pub fn ticks_fired(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Idle becomes Running and Running becomes Idle.
    pub fn toggle(&self) -> SimulationState {
        self.control.send_if_modified(|state| match state.phase {
            Phase::Idle => {
                state.phase = Phase::Running;
                state.run = state.run.wrapping_add(1);
                true
            }
            Phase::Running => {
                state.phase = Phase::Idle;
                true
            }
            Phase::Stopped => false,
        });
        let state = self.state();
        debug!(state = %state, "simulation toggled");
        state
    }

    pub fn increase_interval(&self) -> SimulationState {
        self.retune(Interval::increased)
    }

    pub fn decrease_interval(&self) -> SimulationState {
        self.retune(Interval::decreased)
    }

    fn retune(&self, change: fn(Interval) -> Interval) -> SimulationState {
        self.control.send_if_modified(|state| {
            if state.phase == Phase::Stopped {
                return false;
            }
            let next = change(state.interval);
            let modified = next != state.interval;
            state.interval = next;
            modified
        });
        let state = self.state();
        debug!(interval = %state.interval, "interval changed");
        state
    }

    /// Stops the scheduler for good and waits for the tick task to exit.
    ///
    /// A tick that is already injecting completes first; a pending tick never
    /// fires.
    pub async fn terminate(mut self) -> SimulationState {
        self.control.send_modify(|state| state.phase = Phase::Stopped);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "tick task ended abnormally");
            }
        }
        debug!(ticks = self.ticks_fired(), "scheduler stopped");
        self.state()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.control.send_modify(|state| state.phase = Phase::Stopped);
            task.abort();
        }
    }
}

async fn run_ticks(
    mut control: watch::Receiver<SimulationState>,
    injector: InputInjector,
    action: TickAction,
    ticks: Arc<AtomicU64>,
) {
    // Run number and start of the current period while running.
    let mut period: Option<(u64, Instant)> = None;

    loop {
        let state = *control.borrow_and_update();
        match state.phase {
            Phase::Stopped => break,
            Phase::Idle => {
                period = None;
                if control.changed().await.is_err() {
                    break;
                }
            }
            Phase::Running => {
                let start = match period {
                    Some((run, start)) if run == state.run => start,
                    _ => {
                        let now = Instant::now();
                        period = Some((state.run, now));
                        now
                    }
                };
                let deadline = start + state.interval.as_duration();

                tokio::select! {
                    biased;
                    changed = control.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = time::sleep_until(deadline) => {
                        if fire(&control, state.run, &injector, action, &ticks) {
                            period = Some((state.run, Instant::now()));
                        }
                    }
                }
            }
        }
    }

    debug!("tick task exited");
}

/// Injects once if the simulation is still in run `run`. The state borrow is
/// held across the injection so control changes wait for it.
fn fire(
    control: &watch::Receiver<SimulationState>,
    run: u64,
    injector: &InputInjector,
    action: TickAction,
    ticks: &AtomicU64,
) -> bool {
    let state = control.borrow();
    if state.phase != Phase::Running || state.run != run {
        return false;
    }

    match injector.inject(action) {
        Ok(()) => {}
        // Delivery is best-effort; a closed window looks the same as a busy one.
        Err(e) if !e.is_fatal() => debug!(error = %e, "tick delivery failed"),
        Err(e) => warn!(error = %e, "tick failed"),
    }
    let fired = ticks.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(tick = fired, "tick fired");
    true
}
