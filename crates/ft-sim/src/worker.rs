//! Background tick driver: the simulator on its own OS thread.
//!
//! The owner talks to the thread only through channels carrying owned
//! values.  Commands go in over an unbounded channel; roster snapshots come
//! out over a bounded one, and the worker drops a snapshot rather than block
//! when the owner falls behind.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender, TrySendError};
use ft_core::{RosterUpdate, TrackedEntity};
use ft_route::RouteSet;

use crate::PositionSimulator;

/// Snapshots buffered between worker and owner.
const OUTPUT_CAPACITY: usize = 2;

/// One tick's output: the roster plus each slot's route progress.
pub(crate) type Frame = (RosterUpdate, Vec<f64>);

/// Something that can start a named OS thread.
///
/// [`OsThreads`] is the real one; tests substitute a spawner that fails to
/// exercise the foreground fallback.
pub trait Spawn {
    fn spawn<F, T>(&self, name: &str, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;
}

/// Spawns with [`std::thread::Builder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OsThreads;

impl Spawn for OsThreads {
    fn spawn<F, T>(&self, name: &str, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        thread::Builder::new().name(name.to_owned()).spawn(f)
    }
}

pub(crate) enum WorkerCommand {
    SetRoster(Vec<TrackedEntity>),
    SetRoutes(RouteSet),
    Stop,
}

/// Handle to a running worker thread.
pub struct BackgroundWorker {
    cmd_tx: Sender<WorkerCommand>,
    out_rx: Receiver<Frame>,
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<PositionSimulator>>,
}

impl BackgroundWorker {
    /// Move `sim` onto a new thread and start ticking at its configured rate.
    ///
    /// On spawn failure the simulator is gone with the closure; the caller
    /// rebuilds one from its own copy of config, routes and roster.
    pub fn spawn(sim: PositionSimulator, spawner: &impl Spawn) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = unbounded();
        let (out_tx, out_rx) = bounded(OUTPUT_CAPACITY);
        let active = Arc::new(AtomicBool::new(true));
        let thread_active = Arc::clone(&active);

        let handle = spawner.spawn("ft-sim-worker", move || run(sim, cmd_rx, out_tx, thread_active))?;
        tracing::debug!("simulation worker started");
        Ok(Self { cmd_tx, out_rx, active, handle: Some(handle) })
    }

    /// Queue a roster replacement.  `false` if the worker has gone away.
    pub fn set_roster(&self, roster: Vec<TrackedEntity>) -> bool {
        self.cmd_tx.send(WorkerCommand::SetRoster(roster)).is_ok()
    }

    /// Queue a route-set replacement.  `false` if the worker has gone away.
    pub fn set_routes(&self, routes: RouteSet) -> bool {
        self.cmd_tx.send(WorkerCommand::SetRoutes(routes)).is_ok()
    }

    /// Drain every pending snapshot and return the newest.
    pub fn latest(&self) -> Option<RosterUpdate> {
        self.latest_frame().map(|(update, _)| update)
    }

    /// [`latest`][Self::latest] with the progress that goes with it.
    pub(crate) fn latest_frame(&self) -> Option<Frame> {
        self.out_rx.try_iter().last()
    }

    /// `false` once the worker thread has exited for any reason.
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the timer, then join.  Returns the simulator if the thread
    /// exited cleanly, `None` if it panicked.
    pub fn stop(mut self) -> Option<PositionSimulator> {
        self.halt()
    }

    fn halt(&mut self) -> Option<PositionSimulator> {
        self.active.store(false, Ordering::Release);
        let _ = self.cmd_tx.send(WorkerCommand::Stop);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(sim) => Some(sim),
            Err(_) => {
                tracing::error!("simulation worker panicked");
                None
            }
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.halt();
        }
    }
}

// ── Thread body ───────────────────────────────────────────────────────────────

fn run(
    mut sim: PositionSimulator,
    cmd_rx:  Receiver<WorkerCommand>,
    out_tx:  Sender<Frame>,
    active:  Arc<AtomicBool>,
) -> PositionSimulator {
    let interval = sim.config().tick_interval();
    let max_dt: Duration = sim.config().max_frame_dt();
    let ticker = tick(interval);
    let mut last = Instant::now();

    while active.load(Ordering::Acquire) {
        let keep_going = select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(WorkerCommand::SetRoster(roster)) => { sim.set_roster(roster); true }
                Ok(WorkerCommand::SetRoutes(routes)) => { sim.set_routes(routes); true }
                Ok(WorkerCommand::Stop) | Err(_)     => false,
            },
            recv(ticker) -> at => {
                let now = at.unwrap_or_else(|_| Instant::now());
                let dt = now.saturating_duration_since(last).min(max_dt);
                last = now;
                if active.load(Ordering::Acquire) {
                    let update = sim.step(dt);
                    match out_tx.try_send((update, sim.progress_by_slot())) {
                        Ok(()) | Err(TrySendError::Full(_)) => true,
                        Err(TrySendError::Disconnected(_))  => false,
                    }
                } else {
                    false
                }
            },
        };
        if !keep_going {
            break;
        }
    }

    tracing::debug!(tick = %sim.current_tick(), "simulation worker stopped");
    sim
}
