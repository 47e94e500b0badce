//! Pool controller: one queue, a resizable set of workers, and an autoscaler.
//!
//! Each call to [`PoolController::run_cycle`] performs, in order:
//!
//! 1. **Admission** (standalone pools only): one Bernoulli arrival trial.
//! 2. **Distribution**: for every worker in order, drain blocked items from
//!    the head of the queue, hand the next item to the worker if it is idle,
//!    then advance the worker by one cycle.
//! 3. **Scaling**: a cooldown-gated hysteresis controller adds or removes at
//!    most one worker.
//!
//! The pool never prints or logs. Every cycle returns a [`CycleReport`]
//! describing what happened, and the caller decides how to record it.

use crate::clock::CycleClock;
use crate::generator::RequestGenerator;
use crate::metrics::{self, PoolStats, PoolSummary};
use crate::request::{JobCategory, WorkItem};
use crate::worker::Worker;
use poolsim_filters::{AllowAll, BlockFilter};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Default queue-per-server multiplier above which a worker is added.
pub const DEFAULT_HIGH_THRESHOLD: u32 = 80;
/// Default queue-per-server multiplier below which a worker is removed.
pub const DEFAULT_LOW_THRESHOLD: u32 = 50;

/// Where new items come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Admission {
    /// The pool generates its own arrivals with this probability per cycle.
    Standalone { arrival_probability: f64 },
    /// Items arrive only through [`PoolController::inject`].
    External,
}

/// Static parameters of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Workers at start.
    pub servers: u32,
    /// Cycles to wait after a scaling action.
    pub cooldown: u32,
    /// Add a worker when queue > high * servers.
    pub high_threshold: u32,
    /// Remove a worker when queue < low * servers.
    pub low_threshold: u32,
    pub admission: Admission,
    /// Also apply the block filter when an item enters the queue.
    pub filter_at_admission: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            servers: 1,
            cooldown: 50,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            low_threshold: DEFAULT_LOW_THRESHOLD,
            admission: Admission::Standalone {
                arrival_probability: 0.3,
            },
            filter_at_admission: false,
        }
    }
}

/// Point at which the block filter rejected an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStage {
    Admission,
    Distribution,
}

/// Something that happened inside a pool during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    /// An item entered the queue.
    Admitted { source: String, duration: u32 },
    /// An item was discarded by the block filter.
    Blocked { source: String, stage: FilterStage },
    /// An item was handed to a worker.
    Assigned {
        worker_id: u32,
        source: String,
        duration: u32,
    },
    /// A worker finished an item.
    Completed { worker_id: u32, source: String },
    /// The autoscaler added a worker.
    ScaledUp {
        worker_id: u32,
        servers: usize,
        queue: usize,
    },
    /// The autoscaler removed an idle worker.
    ScaledDown {
        worker_id: u32,
        servers: usize,
        queue: usize,
    },
    /// Scale-down was wanted but every worker was busy.
    ScaleDownSkipped { servers: usize, queue: usize },
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolEvent::Admitted { source, duration } => {
                write!(f, "Request from {} queued ({} cycles)", source, duration)
            }
            PoolEvent::Blocked { source, stage } => {
                let at = match stage {
                    FilterStage::Admission => "admission",
                    FilterStage::Distribution => "distribution",
                };
                write!(f, "Blocked request from {} at {}", source, at)
            }
            PoolEvent::Assigned {
                worker_id,
                source,
                duration,
            } => write!(
                f,
                "Server {} assigned request from {} ({} cycles)",
                worker_id, source, duration
            ),
            PoolEvent::Completed { worker_id, source } => {
                write!(f, "Server {} completed request from {}", worker_id, source)
            }
            PoolEvent::ScaledUp {
                worker_id,
                servers,
                queue,
            } => write!(
                f,
                "Server {} added. Total servers: {} (queue {})",
                worker_id, servers, queue
            ),
            PoolEvent::ScaledDown {
                worker_id,
                servers,
                queue,
            } => write!(
                f,
                "Server {} removed. Total servers: {} (queue {})",
                worker_id, servers, queue
            ),
            PoolEvent::ScaleDownSkipped { servers, queue } => write!(
                f,
                "Scale down skipped: all {} servers busy (queue {})",
                servers, queue
            ),
        }
    }
}

/// What the autoscaler wants, before cooldown and idleness are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleIntent {
    Grow,
    Shrink,
    Hold,
}

/// Hysteresis rule on queue depth relative to the current pool size.
///
/// Both thresholds are multipliers of `servers`, so the bar rises as the
/// pool grows. A pool of one worker is never shrunk.
pub fn evaluate_scaling(queue: usize, servers: usize, high: u32, low: u32) -> ScaleIntent {
    let queue = queue as u64;
    let servers_u64 = servers as u64;
    if queue > u64::from(high) * servers_u64 {
        ScaleIntent::Grow
    } else if queue < u64::from(low) * servers_u64 && servers > 1 {
        ScaleIntent::Shrink
    } else {
        ScaleIntent::Hold
    }
}

/// The scaling step's outcome for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleDecision {
    /// Cooldown was active; the counter was decremented to `remaining`.
    Cooldown { remaining: u32 },
    /// A worker was added.
    Added { worker_id: u32 },
    /// An idle worker was removed.
    Removed { worker_id: u32 },
    /// Shrink was wanted but no worker was idle; cooldown left untouched.
    NoIdleWorker,
    /// Queue depth within bounds.
    Hold,
}

impl ScaleDecision {
    /// Whether the pool size changed.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            ScaleDecision::Added { .. } | ScaleDecision::Removed { .. }
        )
    }
}

/// Everything one pool did in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub label: Option<JobCategory>,
    /// Whether the admission trial produced an item this cycle.
    pub arrival: bool,
    pub queue_before_distribution: usize,
    pub queue_after_distribution: usize,
    pub servers: usize,
    pub scale: ScaleDecision,
    pub events: Vec<PoolEvent>,
}

/// Counts from [`PoolController::preload`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadOutcome {
    pub queued: u64,
    pub blocked: u64,
}

/// The load balancer: owns a worker set and a FIFO queue.
pub struct PoolController {
    label: Option<JobCategory>,
    settings: PoolSettings,
    /// Workers in distribution order. Removal is by index and only of idle
    /// entries.
    workers: Vec<Worker>,
    queue: VecDeque<WorkItem>,
    filter: Box<dyn BlockFilter>,
    generator: RequestGenerator,
    clock: CycleClock,
    cooldown_counter: u32,
    next_worker_id: u32,
    stats: PoolStats,
    /// Events from injections made between cycles, reported with the next
    /// cycle.
    pending_events: Vec<PoolEvent>,
}

impl PoolController {
    /// Create a pool with `settings.servers` idle workers.
    ///
    /// # Panics
    ///
    /// Panics if a standalone arrival probability is outside `[0, 1]` or NaN.
    pub fn new(
        settings: PoolSettings,
        filter: Box<dyn BlockFilter>,
        generator: RequestGenerator,
    ) -> Self {
        if let Admission::Standalone { arrival_probability } = settings.admission {
            assert!(
                (0.0..=1.0).contains(&arrival_probability),
                "arrival probability {} is not within [0, 1]",
                arrival_probability
            );
        }
        let servers = settings.servers;
        let workers: Vec<Worker> = (0..servers).map(Worker::new).collect();
        Self {
            label: None,
            stats: PoolStats::new(workers.len()),
            workers,
            queue: VecDeque::new(),
            filter,
            generator,
            clock: CycleClock::new(),
            cooldown_counter: 0,
            next_worker_id: servers,
            settings,
            pending_events: Vec::new(),
        }
    }

    /// Pool with default settings, no filtering, and the default generator.
    pub fn with_defaults(servers: u32) -> Self {
        Self::new(
            PoolSettings {
                servers,
                ..PoolSettings::default()
            },
            Box::new(AllowAll::new()),
            RequestGenerator::default(),
        )
    }

    /// Tag the pool with the job category it serves.
    pub fn with_label(mut self, label: JobCategory) -> Self {
        self.label = Some(label);
        self
    }

    pub fn label(&self) -> Option<JobCategory> {
        self.label
    }

    /// `stream`, `process`, or `pool` for an unlabelled pool.
    pub fn name(&self) -> &'static str {
        self.label.map_or("pool", |c| c.as_str())
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn filter_name(&self) -> &str {
        self.filter.name()
    }

    pub fn servers(&self) -> usize {
        self.workers.len()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn busy_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.is_busy()).count()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_counter
    }

    /// Last cycle run by this pool.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Enqueue an externally produced item.
    ///
    /// Returns `false` if admission filtering is enabled and the item was
    /// blocked. The resulting event is reported with the next cycle.
    pub fn inject(&mut self, item: WorkItem) -> bool {
        let event = self.admit(item);
        let queued = matches!(event, PoolEvent::Admitted { .. });
        self.pending_events.push(event);
        queued
    }

    /// Fill the queue with `count` generated items before the first cycle.
    pub fn preload<R: Rng + ?Sized>(&mut self, count: u64, rng: &mut R) -> PreloadOutcome {
        let mut outcome = PreloadOutcome::default();
        for _ in 0..count {
            let item = self.generator.generate(rng);
            match self.admit(item) {
                PoolEvent::Admitted { .. } => outcome.queued += 1,
                _ => outcome.blocked += 1,
            }
        }
        outcome
    }

    /// Run one full cycle: admission, distribution, scaling.
    pub fn run_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> CycleReport {
        let cycle = self.clock.tick();
        let mut events = std::mem::take(&mut self.pending_events);

        let arrival = match self.settings.admission {
            Admission::Standalone {
                arrival_probability,
            } => {
                if rng.gen_bool(arrival_probability) {
                    let item = self.generator.generate(rng);
                    events.push(self.admit(item));
                    true
                } else {
                    false
                }
            }
            Admission::External => false,
        };

        let queue_before_distribution = self.queue.len();
        self.distribute(&mut events);
        let queue_after_distribution = self.queue.len();

        let scale = self.scale(&mut events);

        CycleReport {
            cycle,
            label: self.label,
            arrival,
            queue_before_distribution,
            queue_after_distribution,
            servers: self.workers.len(),
            scale,
            events,
        }
    }

    /// End-of-run summary over `cycles` cycles.
    pub fn summary(&self, cycles: u64, initial_servers: usize) -> PoolSummary {
        PoolSummary {
            label: self.name().to_string(),
            filter: self.filter.name().to_string(),
            cycles,
            admitted: self.stats.admitted,
            blocked: self.stats.blocked,
            processed: self.stats.processed,
            completed: self.stats.completed,
            initial_servers,
            final_servers: self.workers.len(),
            peak_servers: self.stats.peak_servers,
            final_queue: self.queue.len(),
            busy_workers: self.busy_workers(),
            scale_ups: self.stats.scale_ups,
            scale_downs: self.stats.scale_downs,
            scale_down_misses: self.stats.scale_down_misses,
            min_duration: self.stats.min_duration,
            max_duration: self.stats.max_duration,
            throughput: metrics::throughput(self.stats.processed, cycles),
        }
    }

    /// Record the item and either queue it or block it at admission.
    fn admit(&mut self, item: WorkItem) -> PoolEvent {
        self.stats.observe_duration(item.service_duration);
        if self.settings.filter_at_admission && self.filter.is_blocked(&item.source) {
            self.stats.blocked += 1;
            return PoolEvent::Blocked {
                source: item.source,
                stage: FilterStage::Admission,
            };
        }
        self.stats.admitted += 1;
        let event = PoolEvent::Admitted {
            source: item.source.clone(),
            duration: item.service_duration,
        };
        self.queue.push_back(item);
        event
    }

    /// Blocked items are drained lazily, once per worker visited, interleaved
    /// with assignment.
    fn distribute(&mut self, events: &mut Vec<PoolEvent>) {
        for worker in self.workers.iter_mut() {
            while self
                .queue
                .front()
                .is_some_and(|head| self.filter.is_blocked(&head.source))
            {
                if let Some(item) = self.queue.pop_front() {
                    self.stats.blocked += 1;
                    events.push(PoolEvent::Blocked {
                        source: item.source,
                        stage: FilterStage::Distribution,
                    });
                }
            }

            if worker.is_idle() {
                if let Some(item) = self.queue.pop_front() {
                    self.stats.processed += 1;
                    events.push(PoolEvent::Assigned {
                        worker_id: worker.id,
                        source: item.source.clone(),
                        duration: item.service_duration,
                    });
                    worker.assign(item);
                }
            }

            if let Some(done) = worker.advance() {
                self.stats.completed += 1;
                events.push(PoolEvent::Completed {
                    worker_id: worker.id,
                    source: done.source,
                });
            }
        }
    }

    fn scale(&mut self, events: &mut Vec<PoolEvent>) -> ScaleDecision {
        if self.cooldown_counter > 0 {
            self.cooldown_counter -= 1;
            return ScaleDecision::Cooldown {
                remaining: self.cooldown_counter,
            };
        }

        let queue = self.queue.len();
        let servers = self.workers.len();
        match evaluate_scaling(
            queue,
            servers,
            self.settings.high_threshold,
            self.settings.low_threshold,
        ) {
            ScaleIntent::Grow => {
                let worker_id = self.add_worker();
                self.cooldown_counter = self.settings.cooldown;
                events.push(PoolEvent::ScaledUp {
                    worker_id,
                    servers: self.workers.len(),
                    queue,
                });
                ScaleDecision::Added { worker_id }
            }
            ScaleIntent::Shrink => match self.remove_idle_worker() {
                Some(worker_id) => {
                    self.cooldown_counter = self.settings.cooldown;
                    events.push(PoolEvent::ScaledDown {
                        worker_id,
                        servers: self.workers.len(),
                        queue,
                    });
                    ScaleDecision::Removed { worker_id }
                }
                None => {
                    self.stats.scale_down_misses += 1;
                    events.push(PoolEvent::ScaleDownSkipped { servers, queue });
                    ScaleDecision::NoIdleWorker
                }
            },
            ScaleIntent::Hold => ScaleDecision::Hold,
        }
    }

    fn add_worker(&mut self) -> u32 {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        self.workers.push(Worker::new(id));
        self.stats.scale_ups += 1;
        self.stats.observe_servers(self.workers.len());
        id
    }

    /// Remove the last idle worker, scanning from the end.
    fn remove_idle_worker(&mut self) -> Option<u32> {
        let idx = self.workers.iter().rposition(|w| w.is_idle())?;
        let worker = self.workers.remove(idx);
        self.stats.scale_downs += 1;
        Some(worker.id)
    }
}

impl fmt::Debug for PoolController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolController")
            .field("label", &self.label)
            .field("filter", &self.filter.name())
            .field("servers", &self.workers.len())
            .field("queue", &self.queue.len())
            .field("cooldown_counter", &self.cooldown_counter)
            .field("cycle", &self.clock.now())
            .finish()
    }
}
