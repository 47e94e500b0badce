//! Cycle-driven simulation driver.
//!
//! The engine owns the random source and either a single standalone pool or
//! a [`Router`] over two category pools. Each step advances the global cycle
//! counter by one and runs exactly one full cycle of every pool. Cycle
//! reports are turned into event log lines between cycles; the pools
//! themselves never see the sink.

use crate::clock::CycleClock;
use crate::config::{ConfigError, SimConfig};
use crate::event_log::{EventLogError, EventSink};
use crate::metrics::SimulationReport;
use crate::pool::{CycleReport, PoolController, PoolEvent};
use crate::request::JobCategory;
use crate::router::Router;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    EventLog(#[from] EventLogError),
}

/// What the engine drives.
#[derive(Debug)]
pub enum Topology {
    /// One pool generating its own arrivals.
    Standalone(PoolController),
    /// Two category pools fed by a router.
    Routed(Router),
}

impl Topology {
    /// Pools in execution order.
    pub fn pools(&self) -> Vec<&PoolController> {
        match self {
            Topology::Standalone(pool) => vec![pool],
            Topology::Routed(router) => router.pools().to_vec(),
        }
    }
}

/// The simulation driver.
#[derive(Debug)]
pub struct SimulationEngine {
    name: String,
    seed: u64,
    cycles: u64,
    rng: ChaCha8Rng,
    topology: Topology,
    clock: CycleClock,
    /// Worker counts before the first cycle, in pool order.
    initial_servers: Vec<usize>,
    arrivals: u64,
}

fn preload_pool(pool: &mut PoolController, count: u64, rng: &mut ChaCha8Rng) {
    if count == 0 {
        return;
    }
    let outcome = pool.preload(count, rng);
    tracing::debug!(
        pool = pool.name(),
        queued = outcome.queued,
        blocked = outcome.blocked,
        "Preloaded queue"
    );
}

impl SimulationEngine {
    /// Build an engine from a validated configuration. A standalone pool's
    /// queue is preloaded from the seeded random source before the first
    /// cycle; routed pools start empty.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = config.request_generator()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.simulation.seed);

        let topology = match &config.router {
            None => {
                let mut pool = PoolController::new(
                    config.pool.standalone_settings(),
                    config.pool.block_filter()?,
                    generator.clone(),
                );
                preload_pool(&mut pool, config.pool.initial_queue(), &mut rng);
                Topology::Standalone(pool)
            }
            Some(section) => {
                let stream = PoolController::new(
                    section.stream.settings(),
                    section.stream.block_filter()?,
                    generator.clone(),
                );
                let process = PoolController::new(
                    section.process.settings(),
                    section.process.block_filter()?,
                    generator.clone(),
                );
                Topology::Routed(Router::new(
                    stream,
                    process,
                    generator,
                    section.arrival_probability,
                ))
            }
        };

        Ok(Self::with_rng(
            config.simulation.name.clone(),
            config.simulation.seed,
            config.simulation.cycles,
            rng,
            topology,
        ))
    }

    /// Drive an already assembled topology with a fresh seeded random source.
    pub fn from_topology(
        name: impl Into<String>,
        seed: u64,
        cycles: u64,
        topology: Topology,
    ) -> Self {
        Self::with_rng(
            name.into(),
            seed,
            cycles,
            ChaCha8Rng::seed_from_u64(seed),
            topology,
        )
    }

    fn with_rng(
        name: String,
        seed: u64,
        cycles: u64,
        rng: ChaCha8Rng,
        topology: Topology,
    ) -> Self {
        let initial_servers = topology.pools().iter().map(|p| p.servers()).collect();
        Self {
            name,
            seed,
            cycles,
            rng,
            topology,
            clock: CycleClock::new(),
            initial_servers,
            arrivals: 0,
        }
    }

    /// Tag a standalone pool with a job category. Routed pools are already
    /// labelled, so this is a no-op for them.
    pub fn with_pool_label(mut self, label: JobCategory) -> Self {
        self.topology = match self.topology {
            Topology::Standalone(pool) => Topology::Standalone(pool.with_label(label)),
            routed => routed,
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Cycles run so far.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.now() >= self.cycles
    }

    /// Run one cycle and forward its events to `sink`. Returns the cycle
    /// number.
    pub fn step<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64, EventLogError> {
        let cycle = self.clock.tick();
        match &mut self.topology {
            Topology::Standalone(pool) => {
                let report = pool.run_cycle(&mut self.rng);
                if report.arrival {
                    self.arrivals += 1;
                }
                forward(sink, pool.name(), &report)?;
            }
            Topology::Routed(router) => {
                let report = router.run_cycle(&mut self.rng);
                if report.routed.is_some() {
                    self.arrivals += 1;
                }
                forward(sink, JobCategory::Stream.as_str(), &report.stream)?;
                forward(sink, JobCategory::Process.as_str(), &report.process)?;
            }
        }
        Ok(cycle)
    }

    /// Run the remaining cycles, flush the sink, and summarize.
    pub fn run<S: EventSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<SimulationReport, EventLogError> {
        tracing::info!(
            name = %self.name,
            seed = self.seed,
            cycles = self.cycles,
            pools = self.initial_servers.len(),
            "Starting simulation"
        );
        while !self.is_finished() {
            self.step(sink)?;
        }
        sink.flush()?;

        let report = self.report();
        tracing::info!(
            name = %self.name,
            processed = report.total_processed(),
            blocked = report.total_blocked(),
            "Simulation complete"
        );
        Ok(report)
    }

    /// Summary of the cycles run so far.
    pub fn report(&self) -> SimulationReport {
        let cycles = self.clock.now();
        let pools = self
            .topology
            .pools()
            .into_iter()
            .zip(&self.initial_servers)
            .map(|(pool, &initial)| pool.summary(cycles, initial))
            .collect();
        SimulationReport {
            name: self.name.clone(),
            seed: self.seed,
            cycles,
            arrivals: self.arrivals,
            pools,
        }
    }
}

/// Write a pool's events as `[pool] message` lines. Scaling actions also go
/// to `tracing`.
fn forward<S: EventSink + ?Sized>(
    sink: &mut S,
    pool: &str,
    report: &CycleReport,
) -> Result<(), EventLogError> {
    for event in &report.events {
        match event {
            PoolEvent::ScaledUp { .. } | PoolEvent::ScaledDown { .. } => {
                tracing::info!(cycle = report.cycle, pool, "{}", event);
            }
            PoolEvent::ScaleDownSkipped { .. } => {
                tracing::debug!(cycle = report.cycle, pool, "{}", event);
            }
            _ => {}
        }
        sink.log_event(report.cycle, &format!("[{}] {}", pool, event))?;
    }
    Ok(())
}
