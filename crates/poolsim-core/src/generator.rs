//! Synthetic work item generator.
//!
//! The [`RequestGenerator`] holds only the distribution parameters. Every
//! draw takes the random source as an argument, so the same seed always
//! replays the same sequence of items.

use crate::request::{JobCategory, WorkItem};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GeneratorError {
    #[error("min_duration must be >= 1, got {0}")]
    ZeroDuration(u32),
    #[error("min_duration ({min}) must not exceed max_duration ({max})")]
    EmptyRange { min: u32, max: u32 },
    #[error("process_probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),
}

/// Distribution parameters for generated work items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestGenerator {
    /// Shortest service duration, inclusive.
    min_duration: u32,
    /// Longest service duration, inclusive.
    max_duration: u32,
    /// Probability that an item is a processing job; the rest are streaming.
    process_probability: f64,
}

impl RequestGenerator {
    pub fn new(
        min_duration: u32,
        max_duration: u32,
        process_probability: f64,
    ) -> Result<Self, GeneratorError> {
        if min_duration == 0 {
            return Err(GeneratorError::ZeroDuration(min_duration));
        }
        if min_duration > max_duration {
            return Err(GeneratorError::EmptyRange {
                min: min_duration,
                max: max_duration,
            });
        }
        if !(0.0..=1.0).contains(&process_probability) {
            return Err(GeneratorError::InvalidProbability(process_probability));
        }
        Ok(Self {
            min_duration,
            max_duration,
            process_probability,
        })
    }

    pub fn min_duration(&self) -> u32 {
        self.min_duration
    }

    pub fn max_duration(&self) -> u32 {
        self.max_duration
    }

    pub fn process_probability(&self) -> f64 {
        self.process_probability
    }

    /// Draw one work item.
    ///
    /// Draw order is fixed (source, destination, duration, category) so a
    /// seeded run is stable across releases.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> WorkItem {
        let source = random_ip(rng);
        let destination = random_ip(rng);
        let service_duration = rng.gen_range(self.min_duration..=self.max_duration);
        let category = if rng.gen_bool(self.process_probability) {
            JobCategory::Process
        } else {
            JobCategory::Stream
        };
        WorkItem {
            source,
            destination,
            service_duration,
            category,
        }
    }
}

impl Default for RequestGenerator {
    /// Durations in [1, 100] and a 60/40 processing/streaming split.
    fn default() -> Self {
        Self {
            min_duration: 1,
            max_duration: 100,
            process_probability: 0.6,
        }
    }
}

/// Four independent octets in [0, 255], dotted decimal.
pub fn random_ip<R: Rng + ?Sized>(rng: &mut R) -> String {
    let octets: [u8; 4] = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}
