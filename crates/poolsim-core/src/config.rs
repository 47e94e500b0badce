//! TOML configuration parsing for PoolSim.
//!
//! Defines the configuration schema for a run: simulation length and seed,
//! work item distribution, the standalone pool, and the optional dual-pool
//! router.

use crate::generator::{GeneratorError, RequestGenerator};
use crate::pool::{Admission, PoolSettings, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD};
use crate::router::DEFAULT_ROUTER_ARRIVAL_PROBABILITY;
use poolsim_filters::{BlockFilter, FilterError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error("Invalid block filter: {0}")]
    Filter(#[from] FilterError),
    #[error("Invalid generator settings: {0}")]
    Generator(#[from] GeneratorError),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub pool: PoolSection,
    /// When present, the run uses two category pools behind a router and
    /// `[pool]` is ignored.
    #[serde(default)]
    pub router: Option<RouterSection>,
}

/// General simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this simulation.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of cycles to run.
    #[serde(default = "default_cycles")]
    pub cycles: u64,
}

fn default_sim_name() -> String {
    "simulation".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_cycles() -> u64 {
    10_000
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            name: default_sim_name(),
            seed: default_seed(),
            cycles: default_cycles(),
        }
    }
}

/// Work item distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_min_duration")]
    pub min_duration: u32,
    #[serde(default = "default_max_duration")]
    pub max_duration: u32,
    /// Share of processing jobs; the rest are streaming.
    #[serde(default = "default_process_probability")]
    pub process_probability: f64,
}

fn default_min_duration() -> u32 {
    1
}
fn default_max_duration() -> u32 {
    100
}
fn default_process_probability() -> f64 {
    0.6
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
            process_probability: default_process_probability(),
        }
    }
}

impl TryFrom<&GeneratorSection> for RequestGenerator {
    type Error = GeneratorError;

    fn try_from(s: &GeneratorSection) -> Result<Self, Self::Error> {
        RequestGenerator::new(s.min_duration, s.max_duration, s.process_probability)
    }
}

/// One pool's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSection {
    /// Workers at start.
    #[serde(default = "default_servers")]
    pub servers: u32,
    /// Cycles between scaling actions.
    #[serde(default = "default_cooldown")]
    pub cooldown: u32,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: u32,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: u32,
    /// Per-cycle arrival probability when the pool runs standalone.
    #[serde(default = "default_arrival_probability")]
    pub arrival_probability: f64,
    /// Items preloaded per initial server before the first cycle.
    #[serde(default = "default_initial_queue_per_server")]
    pub initial_queue_per_server: u32,
    /// Block filter name, see `poolsim_filters::filter_by_name`.
    #[serde(default = "default_block")]
    pub block: String,
    #[serde(default)]
    pub filter_at_admission: bool,
}

fn default_servers() -> u32 {
    10
}
fn default_cooldown() -> u32 {
    50
}
fn default_high_threshold() -> u32 {
    DEFAULT_HIGH_THRESHOLD
}
fn default_low_threshold() -> u32 {
    DEFAULT_LOW_THRESHOLD
}
fn default_arrival_probability() -> f64 {
    0.3
}
fn default_initial_queue_per_server() -> u32 {
    100
}
fn default_block() -> String {
    "private-192".to_string()
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            cooldown: default_cooldown(),
            high_threshold: default_high_threshold(),
            low_threshold: default_low_threshold(),
            arrival_probability: default_arrival_probability(),
            initial_queue_per_server: default_initial_queue_per_server(),
            block: default_block(),
            filter_at_admission: false,
        }
    }
}

impl PoolSection {
    /// Pool settings for a pool that generates its own arrivals.
    pub fn standalone_settings(&self) -> PoolSettings {
        PoolSettings {
            servers: self.servers,
            cooldown: self.cooldown,
            high_threshold: self.high_threshold,
            low_threshold: self.low_threshold,
            admission: Admission::Standalone {
                arrival_probability: self.arrival_probability,
            },
            filter_at_admission: self.filter_at_admission,
        }
    }

    pub fn block_filter(&self) -> Result<Box<dyn BlockFilter>, FilterError> {
        poolsim_filters::filter_by_name(&self.block)
    }

    /// Items to preload.
    pub fn initial_queue(&self) -> u64 {
        u64::from(self.initial_queue_per_server) * u64::from(self.servers)
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        validate_pool_shape(
            section,
            self.servers,
            self.low_threshold,
            self.high_threshold,
        )?;
        if !(0.0..=1.0).contains(&self.arrival_probability) {
            return Err(ConfigError::Validation(format!(
                "{}.arrival_probability must be within [0, 1]",
                section
            )));
        }
        self.block_filter()?;
        Ok(())
    }
}

fn validate_pool_shape(
    section: &str,
    servers: u32,
    low_threshold: u32,
    high_threshold: u32,
) -> Result<(), ConfigError> {
    if servers == 0 {
        return Err(ConfigError::Validation(format!(
            "{}.servers must be > 0",
            section
        )));
    }
    if low_threshold > high_threshold {
        return Err(ConfigError::Validation(format!(
            "{}.low_threshold ({}) must not exceed high_threshold ({})",
            section, low_threshold, high_threshold
        )));
    }
    Ok(())
}

/// A pool behind the router. Routed pools only take work the router hands
/// them, so there is no arrival probability and no preloaded queue; a
/// preloaded queue would mix categories. Missing keys fall back to
/// [`RoutedPoolSection::default`], not to the standalone pool defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutedPoolSection {
    /// Workers at start.
    pub servers: u32,
    /// Cycles between scaling actions.
    pub cooldown: u32,
    pub high_threshold: u32,
    pub low_threshold: u32,
    /// Block filter name, see `poolsim_filters::filter_by_name`.
    pub block: String,
    pub filter_at_admission: bool,
}

/// Routed pools wait longer between scaling actions than a standalone pool.
pub const DEFAULT_ROUTED_COOLDOWN: u32 = 200;

impl Default for RoutedPoolSection {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            cooldown: DEFAULT_ROUTED_COOLDOWN,
            high_threshold: default_high_threshold(),
            low_threshold: default_low_threshold(),
            block: default_block(),
            filter_at_admission: false,
        }
    }
}

impl RoutedPoolSection {
    /// Pool settings for a pool fed by the router.
    pub fn settings(&self) -> PoolSettings {
        PoolSettings {
            servers: self.servers,
            cooldown: self.cooldown,
            high_threshold: self.high_threshold,
            low_threshold: self.low_threshold,
            admission: Admission::External,
            filter_at_admission: self.filter_at_admission,
        }
    }

    pub fn block_filter(&self) -> Result<Box<dyn BlockFilter>, FilterError> {
        poolsim_filters::filter_by_name(&self.block)
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        validate_pool_shape(
            section,
            self.servers,
            self.low_threshold,
            self.high_threshold,
        )?;
        self.block_filter()?;
        Ok(())
    }
}

/// Dual-pool router configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSection {
    /// Per-cycle arrival probability at the router.
    #[serde(default = "default_router_arrival_probability")]
    pub arrival_probability: f64,
    #[serde(default)]
    pub stream: RoutedPoolSection,
    #[serde(default)]
    pub process: RoutedPoolSection,
}

fn default_router_arrival_probability() -> f64 {
    DEFAULT_ROUTER_ARRIVAL_PROBABILITY
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            arrival_probability: default_router_arrival_probability(),
            stream: RoutedPoolSection::default(),
            process: RoutedPoolSection::default(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationSection::default(),
            generator: GeneratorSection::default(),
            pool: PoolSection::default(),
            router: None,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.cycles == 0 {
            return Err(ConfigError::Validation("cycles must be > 0".to_string()));
        }
        self.request_generator()?;
        match &self.router {
            Some(router) => {
                if !(0.0..=1.0).contains(&router.arrival_probability) {
                    return Err(ConfigError::Validation(
                        "router.arrival_probability must be within [0, 1]".to_string(),
                    ));
                }
                router.stream.validate("router.stream")?;
                router.process.validate("router.process")?;
            }
            None => self.pool.validate("pool")?,
        }
        Ok(())
    }

    /// Whether the run uses the dual-pool router.
    pub fn is_routed(&self) -> bool {
        self.router.is_some()
    }

    /// Build the work item generator.
    pub fn request_generator(&self) -> Result<RequestGenerator, ConfigError> {
        Ok(RequestGenerator::try_from(&self.generator)?)
    }
}
