//! Simulation session
//!
//! Owns the entity store, spatial grid, clock and intent worker for one
//! session, and runs every per-tick pass from a single entry point.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::metrics::{Metrics, TickSample};
use crate::sim::agent::{Agent, AgentId};
use crate::sim::clock::{MotionState, SimClock};
use crate::sim::command_buffer::{CommandBuffer, CommandSender, SimCommand};
use crate::sim::scenario::{ScenarioError, ScenarioProfile};
use crate::sim::spatial::SpatialHashGrid;
use crate::sim::store::{EntityStore, StoreError};
use crate::sim::systems::alerts::{self, ThreatAlert};
use crate::sim::systems::telemetry::{self, TelemetrySnapshot};
use crate::sim::systems::{drift, flocking};
use crate::sim::tactical::worker::{IntentEvaluator, IntentScheduler, IntentWorker, WorkerError};
use crate::util::vec2::Vec2;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Render-facing transform of one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFrame {
    pub id: AgentId,
    pub position: Vec2,
    pub heading: f32,
    pub selected: bool,
}

/// Everything published for one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickOutput {
    pub tick: u64,
    pub dt: f32,
    pub paused: bool,
    pub generation: u64,
    pub frames: Vec<AgentFrame>,
    pub telemetry: TelemetrySnapshot,
    pub alerts: Vec<ThreatAlert>,
}

pub struct Simulation {
    config: SimConfig,
    store: EntityStore,
    grid: SpatialHashGrid,
    clock: SimClock,
    worker: Option<IntentWorker>,
    scheduler: IntentScheduler,
    /// A snapshot is with the worker and its response has not been taken yet
    in_flight: bool,
    worker_lost: bool,
    selected: Option<AgentId>,
    profile: ScenarioProfile,
    telemetry: TelemetrySnapshot,
    commands: CommandBuffer,
    metrics: Arc<Metrics>,
}

impl Simulation {
    /// Start a session with the default behavior tree worker and load the
    /// configured scenario
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let worker = IntentWorker::spawn()?;
        Self::assemble(config, Some(worker))
    }

    pub fn with_evaluator<E: IntentEvaluator>(config: SimConfig, evaluator: E) -> Result<Self, SimError> {
        let worker = IntentWorker::with_evaluator(evaluator)?;
        Self::assemble(config, Some(worker))
    }

    /// Flocking only, no tactical layer
    pub fn without_worker(config: SimConfig) -> Result<Self, SimError> {
        Self::assemble(config, None)
    }

    fn assemble(config: SimConfig, worker: Option<IntentWorker>) -> Result<Self, SimError> {
        let mut clock = SimClock::new(config.max_dt);
        clock.set_motion(MotionState::new(false, config.reduced_motion));

        let metrics = Arc::new(Metrics::new());
        metrics
            .worker_connected
            .store(worker.is_some() as u64, Ordering::Relaxed);

        let mut sim = Self {
            grid: SpatialHashGrid::new(config.flocking.cell_size),
            scheduler: IntentScheduler::new(config.intent_interval),
            profile: config.scenario,
            config,
            store: EntityStore::new(),
            clock,
            worker,
            in_flight: false,
            worker_lost: false,
            selected: None,
            telemetry: TelemetrySnapshot::default(),
            commands: CommandBuffer::default(),
            metrics,
        };
        sim.reset(sim.profile)?;
        Ok(sim)
    }

    /// Report into a shared registry instead of the session's own
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics
            .worker_connected
            .store(self.worker.is_some() as u64, Ordering::Relaxed);
        self.metrics = metrics;
        self
    }

    /// Replace the agent set with a freshly generated profile
    pub fn reset(&mut self, profile: ScenarioProfile) -> Result<(), SimError> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        self.load(profile.generate(seed))?;
        self.profile = profile;
        let population = self.store.population();
        info!(
            "Scenario '{}' loaded: {} agents ({} swarm), generation {}",
            profile,
            population.total(),
            population.swarm,
            self.store.generation()
        );
        Ok(())
    }

    /// Replace the agent set wholesale. Any response still in flight belongs
    /// to the previous generation and will be dropped on arrival.
    pub fn load(&mut self, agents: Vec<Agent>) -> Result<(), SimError> {
        self.store.load(agents)?;
        self.clock.reset();
        self.selected = None;
        self.telemetry = telemetry::analyze(self.store.agents());
        Ok(())
    }

    /// Handle for the UI layer
    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    pub fn apply_command(&mut self, command: SimCommand) {
        match command {
            SimCommand::Reset(profile) => {
                if let Err(e) = self.reset(profile) {
                    warn!("Failed to reset scenario '{}': {}", profile, e);
                }
            }
            SimCommand::Pause => self.clock.pause(),
            SimCommand::Resume => self.clock.resume(),
            SimCommand::Select(id) => self.selected = id.filter(|id| self.store.contains(*id)),
            SimCommand::SetMotion(motion) => self.clock.set_motion(motion),
        }
    }

    /// Run one tick for `wall` seconds of real time
    pub fn tick(&mut self, wall: Duration) -> TickOutput {
        let started = Instant::now();

        for command in self.commands.drain() {
            self.apply_command(command);
        }

        let dt = self.clock.advance(wall);
        self.collect_intents();

        let mut alerts = Vec::new();
        if dt > 0.0 {
            let report = flocking::update(&mut self.store, &mut self.grid, &self.config.flocking, dt);
            self.metrics.steering_peak_force.store(report.peak_force as f64);
            drift::update(&mut self.store, self.clock.sim_time(), self.clock.motion().effective());
            alerts = alerts::update(&mut self.store, dt);

            let ttl = self.config.intent_ttl.map(|ttl| ttl.as_secs_f32());
            let expired = self.store.expire_intents(dt, ttl);
            if expired > 0 {
                debug!("Expired {} stale intents", expired);
                self.metrics.intents_expired.fetch_add(expired as u64, Ordering::Relaxed);
            }
        }

        self.telemetry = telemetry::analyze(self.store.agents());

        let population = self.store.population();
        if !self.clock.is_paused() && self.scheduler.poll(wall) && population.swarm > 0 {
            self.dispatch_snapshot();
        }

        let frames = self
            .store
            .agents()
            .iter()
            .map(|a| AgentFrame {
                id: a.id,
                position: a.position,
                heading: a.heading,
                selected: self.selected == Some(a.id),
            })
            .collect();

        self.metrics.alerts_fired.fetch_add(alerts.len() as u64, Ordering::Relaxed);
        self.metrics.observe_tick(TickSample {
            elapsed: started.elapsed(),
            population,
            telemetry: &self.telemetry,
            sim_time: self.clock.sim_time(),
            generation: self.store.generation(),
        });

        TickOutput {
            tick: self.clock.tick(),
            dt,
            paused: self.clock.is_paused(),
            generation: self.store.generation(),
            frames,
            telemetry: self.telemetry,
            alerts,
        }
    }

    /// Merge a finished worker response, if any
    fn collect_intents(&mut self) {
        let Some(worker) = self.worker.as_ref() else {
            return;
        };
        match worker.try_recv() {
            Ok(Some(response)) => {
                self.in_flight = false;
                self.metrics.intent_responses.fetch_add(1, Ordering::Relaxed);
                if response.remainder() > 0 {
                    warn!(
                        "Intent response has {} trailing values outside a full entry",
                        response.remainder()
                    );
                }

                let merge = self.store.apply_intents(&response);
                if merge.stale {
                    self.metrics.intent_responses_stale.fetch_add(1, Ordering::Relaxed);
                }
                self.metrics.intents_applied.fetch_add(merge.applied as u64, Ordering::Relaxed);
                self.metrics.intents_unknown.fetch_add(merge.unknown as u64, Ordering::Relaxed);
            }
            Ok(None) => {}
            Err(_) => self.lose_worker(),
        }
    }

    fn dispatch_snapshot(&mut self) {
        let Some(worker) = self.worker.as_ref() else {
            return;
        };
        if self.in_flight {
            debug!("Intent dispatch skipped, previous snapshot still in flight");
            self.metrics.intent_dispatches_skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match worker.try_submit(self.store.tactical_snapshot()) {
            Ok(()) => {
                self.in_flight = true;
                self.metrics.intent_requests.fetch_add(1, Ordering::Relaxed);
            }
            Err(WorkerError::Busy) => {
                self.metrics.intent_dispatches_skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => self.lose_worker(),
        }
    }

    /// The worker is gone for good; keep running on the last intents
    fn lose_worker(&mut self) {
        if !self.worker_lost {
            warn!("Tactical intent worker disconnected, continuing with last known intents");
        }
        self.worker_lost = true;
        self.in_flight = false;
        self.worker = None;
        self.metrics.worker_connected.store(0, Ordering::Relaxed);
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn profile(&self) -> ScenarioProfile {
        self.profile
    }

    pub fn selected(&self) -> Option<AgentId> {
        self.selected
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }
}
