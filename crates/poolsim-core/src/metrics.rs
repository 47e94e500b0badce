//! Counters and end-of-run summaries.
//!
//! A [`PoolStats`] collector lives inside every pool and is updated as the
//! pool admits, blocks, assigns and completes items. At the end of a run it
//! is folded into a [`PoolSummary`], and the summaries of all pools form a
//! [`SimulationReport`].

use serde::{Deserialize, Serialize};

/// Running counters for a single pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Items that entered the queue.
    pub admitted: u64,
    /// Items discarded by the block filter (at admission or distribution).
    pub blocked: u64,
    /// Items assigned to a worker.
    pub processed: u64,
    /// Items a worker finished serving.
    pub completed: u64,
    /// Workers added by the autoscaler.
    pub scale_ups: u64,
    /// Workers removed by the autoscaler.
    pub scale_downs: u64,
    /// Scale-down attempts that found no idle worker.
    pub scale_down_misses: u64,
    /// Shortest service duration seen.
    pub min_duration: Option<u32>,
    /// Longest service duration seen.
    pub max_duration: Option<u32>,
    /// Largest worker count reached.
    pub peak_servers: usize,
}

impl PoolStats {
    pub fn new(initial_servers: usize) -> Self {
        Self {
            peak_servers: initial_servers,
            ..Self::default()
        }
    }

    /// Fold an observed service duration into the running min/max.
    pub fn observe_duration(&mut self, duration: u32) {
        self.min_duration = Some(self.min_duration.map_or(duration, |m| m.min(duration)));
        self.max_duration = Some(self.max_duration.map_or(duration, |m| m.max(duration)));
    }

    pub fn observe_servers(&mut self, servers: usize) {
        self.peak_servers = self.peak_servers.max(servers);
    }
}

/// End-of-run summary for one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSummary {
    /// Pool name (`pool`, `stream` or `process`).
    pub label: String,
    /// Block filter in effect.
    pub filter: String,
    /// Cycles the pool ran.
    pub cycles: u64,
    pub admitted: u64,
    pub blocked: u64,
    pub processed: u64,
    pub completed: u64,
    pub initial_servers: usize,
    pub final_servers: usize,
    pub peak_servers: usize,
    pub final_queue: usize,
    pub busy_workers: usize,
    pub scale_ups: u64,
    pub scale_downs: u64,
    pub scale_down_misses: u64,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    /// processed / cycles, as a fraction.
    pub throughput: f64,
}

impl PoolSummary {
    /// Throughput as a percentage.
    pub fn throughput_pct(&self) -> f64 {
        self.throughput * 100.0
    }
}

/// processed / cycles; zero for an empty run.
pub fn throughput(processed: u64, cycles: u64) -> f64 {
    if cycles == 0 {
        return 0.0;
    }
    processed as f64 / cycles as f64
}

/// Summary of a whole run: one entry per pool, in pool order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Simulation name from the config.
    pub name: String,
    /// Seed the random source was built from.
    pub seed: u64,
    /// Cycles executed.
    pub cycles: u64,
    /// Arrivals generated by the driver (router mode) or the pool.
    pub arrivals: u64,
    pub pools: Vec<PoolSummary>,
}

impl SimulationReport {
    pub fn pool(&self, label: &str) -> Option<&PoolSummary> {
        self.pools.iter().find(|p| p.label == label)
    }

    pub fn total_processed(&self) -> u64 {
        self.pools.iter().map(|p| p.processed).sum()
    }

    pub fn total_blocked(&self) -> u64 {
        self.pools.iter().map(|p| p.blocked).sum()
    }
}

fn fmt_duration(d: Option<u32>) -> String {
    d.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Format a report as a pretty-printed table string.
pub fn format_table(report: &SimulationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  {} Results  ", report.name)
    ));
    out.push_str(&format!(
        "  Cycles: {} | Seed: {} | Arrivals: {}\n",
        report.cycles, report.seed, report.arrivals
    ));
    for pool in &report.pools {
        out.push_str(&format!(
            "{:-<70}\n",
            format!("  Pool: {} ({})  ", pool.label, pool.filter)
        ));
        out.push_str(&format!(
            "  Processed: {}  Completed: {}  Blocked (firewall): {}  Admitted: {}\n",
            pool.processed, pool.completed, pool.blocked, pool.admitted
        ));
        out.push_str(&format!(
            "  Servers: {} -> {} (peak {})  Scale ups: {}  Scale downs: {}\n",
            pool.initial_servers,
            pool.final_servers,
            pool.peak_servers,
            pool.scale_ups,
            pool.scale_downs
        ));
        out.push_str(&format!(
            "  Final queue: {}  Busy workers: {}\n",
            pool.final_queue, pool.busy_workers
        ));
        out.push_str(&format!(
            "  Service duration: min={} max={}  Throughput: {:.2}%\n",
            fmt_duration(pool.min_duration),
            fmt_duration(pool.max_duration),
            pool.throughput_pct()
        ));
    }
    out.push_str(&format!("{:=<70}\n", ""));
    out
}

/// Format a comparison table of several runs (e.g. a cooldown sweep).
pub fn format_comparison_table(reports: &[SimulationReport]) -> String {
    if reports.is_empty() {
        return String::from("No results to compare.\n");
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:=<90}\n", "  Run Comparison  "));
    out.push_str(&format!(
        "{:<24} {:<8} {:>10} {:>9} {:>8} {:>7} {:>7} {:>9}\n",
        "Run", "Pool", "Processed", "Blocked", "Servers", "Peak", "Queue", "Thruput"
    ));
    out.push_str(&format!("{:-<90}\n", ""));

    for report in reports {
        for pool in &report.pools {
            out.push_str(&format!(
                "{:<24} {:<8} {:>10} {:>9} {:>8} {:>7} {:>7} {:>8.2}%\n",
                report.name,
                pool.label,
                pool.processed,
                pool.blocked,
                pool.final_servers,
                pool.peak_servers,
                pool.final_queue,
                pool.throughput_pct(),
            ));
        }
    }
    out.push_str(&format!("{:=<90}\n", ""));
    out
}
