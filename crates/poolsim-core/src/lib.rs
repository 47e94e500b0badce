//! PoolSim: cycle-stepped simulator for an autoscaled worker pool.
//!
//! A pool owns a FIFO queue and a resizable set of single-item workers. Every
//! cycle it admits new work, hands queued items to idle workers (dropping
//! items whose source address is blocked), ages every worker by one cycle and
//! lets a cooldown-gated autoscaler add or remove one worker. An optional
//! router splits generated traffic between a stream pool and a process pool.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐     ┌──────────┐     ┌──────────────┐
//! │ Generator │────▶│  Router  │────▶│  Event sink  │
//! │ (ChaCha8) │     │(category)│     │ (JSONL/mem)  │
//! └───────────┘     └────┬─────┘     └──────────────┘
//!                        │
//!           ┌────────────┴────────────┐
//!           ▼                         ▼
//!    ┌─────────────┐           ┌─────────────┐
//!    │ Stream pool │           │Process pool │
//!    │ queue+filter│           │ queue+filter│
//!    │ autoscaler  │           │ autoscaler  │
//!    └──────┬──────┘           └──────┬──────┘
//!      ┌────┴────┐               ┌────┴────┐
//!      ▼         ▼               ▼         ▼
//!  Worker 0 .. Worker N      Worker 0 .. Worker M
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod event_log;
pub mod generator;
pub mod metrics;
pub mod pool;
pub mod request;
pub mod router;
pub mod worker;

// Re-export key types for convenience.
pub use clock::CycleClock;
pub use config::{ConfigError, SimConfig};
pub use engine::{SimError, SimulationEngine, Topology};
pub use event_log::{EventSink, JsonlEventLog, MemoryEventLog, NullSink, TracingSink};
pub use generator::RequestGenerator;
pub use metrics::{PoolSummary, SimulationReport};
pub use pool::{CycleReport, PoolController, PoolEvent, PoolSettings, ScaleDecision};
pub use request::{JobCategory, WorkItem};
pub use router::Router;
pub use worker::Worker;

/// Run a complete simulation described by `config`, sending events to `sink`.
pub fn run_simulation<S: EventSink + ?Sized>(
    config: &SimConfig,
    sink: &mut S,
) -> Result<SimulationReport, SimError> {
    let mut engine = SimulationEngine::new(config)?;
    Ok(engine.run(sink)?)
}

/// Run a single standalone pool with default settings apart from its size,
/// run length and cooldown. `category` only labels the pool.
pub fn run_standalone<S: EventSink + ?Sized>(
    server_count: u32,
    total_cycles: u64,
    cooldown_period: u32,
    category: Option<JobCategory>,
    sink: &mut S,
) -> Result<SimulationReport, SimError> {
    let mut config = SimConfig::default();
    config.pool.servers = server_count;
    config.pool.cooldown = cooldown_period;
    config.simulation.cycles = total_cycles;

    let mut engine = SimulationEngine::new(&config)?;
    if let Some(category) = category {
        engine = engine.with_pool_label(category);
    }
    Ok(engine.run(sink)?)
}

/// Run the same configuration once per cooldown period. Every pool in the
/// run gets the overridden cooldown; seeds are identical across runs.
pub fn compare_cooldowns(
    config: &SimConfig,
    cooldowns: &[u32],
) -> Result<Vec<SimulationReport>, SimError> {
    cooldowns
        .iter()
        .map(|&cooldown| {
            let mut cfg = config.clone();
            cfg.simulation.name = format!("{} (cooldown {})", config.simulation.name, cooldown);
            cfg.pool.cooldown = cooldown;
            if let Some(router) = cfg.router.as_mut() {
                router.stream.cooldown = cooldown;
                router.process.cooldown = cooldown;
            }
            run_simulation(&cfg, &mut NullSink)
        })
        .collect()
}
