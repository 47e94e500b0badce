//! Category router in front of two independently scaled pools.
//!
//! The [`Router`] owns one pool for streaming jobs and one for processing
//! jobs. Each cycle it may generate a single arrival, sends it to the pool
//! matching its category, then runs the stream pool's full cycle followed by
//! the process pool's. The pools share no workers or queues, so that order is
//! only visible in event ordering.

use crate::generator::RequestGenerator;
use crate::pool::{CycleReport, PoolController};
use crate::request::{JobCategory, WorkItem};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default per-cycle arrival probability at the router.
pub const DEFAULT_ROUTER_ARRIVAL_PROBABILITY: f64 = 0.4;

/// Both pools' reports for one router cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterCycleReport {
    pub cycle: u64,
    /// Category of the item generated this cycle, if any.
    pub routed: Option<JobCategory>,
    pub stream: CycleReport,
    pub process: CycleReport,
}

impl RouterCycleReport {
    /// Pool reports in execution order.
    pub fn pools(&self) -> [&CycleReport; 2] {
        [&self.stream, &self.process]
    }
}

/// Per-category traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStats {
    pub generated: u64,
    pub routed_stream: u64,
    pub routed_process: u64,
}

/// Splits traffic between a stream pool and a process pool.
#[derive(Debug)]
pub struct Router {
    stream: PoolController,
    process: PoolController,
    generator: RequestGenerator,
    arrival_probability: f64,
    cycle: u64,
    stats: RouterStats,
}

impl Router {
    /// Build a router over two pools. Pools are relabelled with their
    /// category so their reports and summaries are distinguishable.
    ///
    /// # Panics
    ///
    /// Panics if `arrival_probability` is outside `[0, 1]` or NaN.
    pub fn new(
        stream: PoolController,
        process: PoolController,
        generator: RequestGenerator,
        arrival_probability: f64,
    ) -> Self {
        assert!(
            (0.0..=1.0).contains(&arrival_probability),
            "arrival probability {} is not within [0, 1]",
            arrival_probability
        );
        Self {
            stream: stream.with_label(JobCategory::Stream),
            process: process.with_label(JobCategory::Process),
            generator,
            arrival_probability,
            cycle: 0,
            stats: RouterStats::default(),
        }
    }

    pub fn pool(&self, category: JobCategory) -> &PoolController {
        match category {
            JobCategory::Stream => &self.stream,
            JobCategory::Process => &self.process,
        }
    }

    pub fn pool_mut(&mut self, category: JobCategory) -> &mut PoolController {
        match category {
            JobCategory::Stream => &mut self.stream,
            JobCategory::Process => &mut self.process,
        }
    }

    /// Pools in execution order.
    pub fn pools(&self) -> [&PoolController; 2] {
        [&self.stream, &self.process]
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    pub fn arrival_probability(&self) -> f64 {
        self.arrival_probability
    }

    /// Cycles run so far.
    pub fn now(&self) -> u64 {
        self.cycle
    }

    /// Send an item to the pool for its category. Returns that category.
    pub fn route(&mut self, item: WorkItem) -> JobCategory {
        let category = item.category;
        match category {
            JobCategory::Stream => self.stats.routed_stream += 1,
            JobCategory::Process => self.stats.routed_process += 1,
        }
        self.pool_mut(category).inject(item);
        category
    }

    /// One arrival trial, then a full cycle of each pool in order.
    pub fn run_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RouterCycleReport {
        self.cycle += 1;
        let routed = if rng.gen_bool(self.arrival_probability) {
            let item = self.generator.generate(rng);
            self.stats.generated += 1;
            Some(self.route(item))
        } else {
            None
        };

        let stream = self.stream.run_cycle(rng);
        let process = self.process.run_cycle(rng);

        RouterCycleReport {
            cycle: self.cycle,
            routed,
            stream,
            process,
        }
    }
}
