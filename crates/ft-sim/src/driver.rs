//! `SimDriver` — picks a tick driver and publishes roster updates.

use std::sync::Arc;
use std::time::Instant;

use ft_bus::{EngineBus, EngineEvent};
use ft_core::{ExecutionMode, RosterUpdate, SimConfig, TrackedEntity};
use ft_route::RouteSet;

use crate::foreground::ForegroundDriver;
use crate::worker::{BackgroundWorker, OsThreads, Spawn};
use crate::{PositionSimulator, SimError, SimResult};

/// Which driver is currently stepping the simulator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DriverMode {
    Background,
    Foreground,
    Stopped,
}

enum Engine {
    Background(BackgroundWorker),
    Foreground(ForegroundDriver),
    Stopped,
}

/// Owner-side handle for the position simulator.
///
/// Prefers a dedicated worker thread.  With [`ExecutionMode::Auto`] a failed
/// spawn, or a worker that dies later, silently falls back to stepping in
/// [`on_frame`][Self::on_frame]; with [`ExecutionMode::Background`] a failed
/// spawn is an error.  Either way every new snapshot is published on the bus
/// as an [`EngineEvent::Roster`] from the owner's thread.
///
/// The host must call `on_frame` once per frame in both modes: in the
/// background it drains the worker's output, in the foreground it ticks.
pub struct SimDriver {
    engine:     Engine,
    bus:        EngineBus,
    config:     SimConfig,
    routes:     RouteSet,
    /// Last roster handed to [`set_roster`][Self::set_roster].
    roster:     Vec<TrackedEntity>,
    /// Last snapshot published.
    latest:     Option<RosterUpdate>,
    /// Last worker output, kept to rebuild from if the worker dies.
    checkpoint: Option<Checkpoint>,
}

struct Checkpoint {
    entities: Arc<[TrackedEntity]>,
    progress: Vec<f64>,
}

impl SimDriver {
    pub fn start(config: SimConfig, routes: RouteSet, bus: EngineBus) -> SimResult<Self> {
        Self::start_with(config, routes, bus, &OsThreads)
    }

    /// [`start`][Self::start] with a caller-supplied thread spawner.
    pub fn start_with(
        config:  SimConfig,
        routes:  RouteSet,
        bus:     EngineBus,
        spawner: &impl Spawn,
    ) -> SimResult<Self> {
        let sim = PositionSimulator::new(config.clone())?.with_routes(routes.clone());

        let engine = match config.execution {
            ExecutionMode::Foreground => Engine::Foreground(ForegroundDriver::new(sim)),
            ExecutionMode::Background => {
                Engine::Background(BackgroundWorker::spawn(sim, spawner).map_err(SimError::Spawn)?)
            }
            ExecutionMode::Auto => match BackgroundWorker::spawn(sim, spawner) {
                Ok(worker) => Engine::Background(worker),
                Err(e) => {
                    tracing::debug!(error = %e, "no worker thread, simulating in the foreground");
                    let sim = PositionSimulator::new(config.clone())?.with_routes(routes.clone());
                    Engine::Foreground(ForegroundDriver::new(sim))
                }
            },
        };

        Ok(Self {
            engine,
            bus,
            config,
            routes,
            roster: Vec::new(),
            latest: None,
            checkpoint: None,
        })
    }

    pub fn mode(&self) -> DriverMode {
        match self.engine {
            Engine::Background(_) => DriverMode::Background,
            Engine::Foreground(_) => DriverMode::Foreground,
            Engine::Stopped       => DriverMode::Stopped,
        }
    }

    // ── Inputs ────────────────────────────────────────────────────────────

    /// Replace the simulated roster.
    pub fn set_roster(&mut self, roster: Vec<TrackedEntity>) -> SimResult<()> {
        self.roster = roster.clone();
        self.checkpoint = None;
        if let Engine::Background(w) = &self.engine {
            if w.set_roster(roster) {
                return Ok(());
            }
            self.fall_back()?;
        }
        match &mut self.engine {
            Engine::Foreground(f) => f.simulator_mut().set_roster(self.roster.clone()),
            Engine::Stopped       => return Err(SimError::Stopped),
            Engine::Background(_) => {}
        }
        Ok(())
    }

    /// Replace the named route set.
    pub fn set_routes(&mut self, routes: RouteSet) -> SimResult<()> {
        self.routes = routes.clone();
        if let Engine::Background(w) = &self.engine {
            if w.set_routes(routes) {
                return Ok(());
            }
            self.fall_back()?;
        }
        match &mut self.engine {
            Engine::Foreground(f) => f.simulator_mut().set_routes(self.routes.clone()),
            Engine::Stopped       => return Err(SimError::Stopped),
            Engine::Background(_) => {}
        }
        Ok(())
    }

    // ── Frame pump ────────────────────────────────────────────────────────

    /// Pump the driver once per host frame.
    ///
    /// Returns the roster update published this frame, if any.
    pub fn on_frame(&mut self, now: Instant) -> Option<RosterUpdate> {
        let update = match &mut self.engine {
            Engine::Background(w) => {
                let frame = w.latest_frame();
                if frame.is_none() && !w.is_alive() {
                    if let Err(e) = self.fall_back() {
                        tracing::error!(error = %e, "simulation fallback failed");
                    }
                }
                frame.map(|(update, progress)| {
                    self.checkpoint =
                        Some(Checkpoint { entities: Arc::clone(&update.entities), progress });
                    update
                })
            }
            Engine::Foreground(f) => f.on_frame(now),
            Engine::Stopped       => None,
        }?;

        self.bus.publish(EngineEvent::Roster(update.clone()));
        self.latest = Some(update.clone());
        Some(update)
    }

    /// The most recently published roster.
    pub fn latest(&self) -> Option<&RosterUpdate> {
        self.latest.as_ref()
    }

    /// Stop ticking.  Joins the worker thread if there is one.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.engine, Engine::Stopped) {
            Engine::Background(w) => {
                w.stop();
            }
            Engine::Foreground(_) | Engine::Stopped => {}
        }
    }

    /// Switch to foreground stepping after the worker went away.
    ///
    /// Reuses the worker's simulator if it exited cleanly.  Otherwise rebuilds
    /// one from the worker's last output, route progress included, so entities
    /// resume where they were last seen.  With no output since the last
    /// roster input, that roster starts over.
    fn fall_back(&mut self) -> SimResult<()> {
        let Engine::Background(worker) = std::mem::replace(&mut self.engine, Engine::Stopped)
        else {
            return Ok(());
        };

        let sim = match worker.stop() {
            Some(sim) => sim,
            None => {
                let mut sim =
                    PositionSimulator::new(self.config.clone())?.with_routes(self.routes.clone());
                match &self.checkpoint {
                    Some(cp) => {
                        sim.set_roster(cp.entities.to_vec());
                        sim.restore_progress(&cp.progress);
                    }
                    None => sim.set_roster(self.roster.clone()),
                }
                sim
            }
        };

        tracing::warn!("simulation worker exited, continuing in the foreground");
        self.engine = Engine::Foreground(ForegroundDriver::new(sim));
        Ok(())
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
