//! Work item model for the pool simulation.
//!
//! Each [`WorkItem`] is a single synthetic request: where it came from, where
//! it goes, how many cycles a worker needs to serve it, and which job category
//! it belongs to. Items are immutable once created.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Unknown job category: {0:?} (expected one of S, P, stream, process)")]
    UnknownCategory(String),
}

/// Job classification used by the router to pick a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    /// Streaming job (`S`).
    Stream,
    /// Processing job (`P`).
    Process,
}

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::Stream => "stream",
            JobCategory::Process => "process",
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "S" | "s" | "stream" | "streaming" => Ok(JobCategory::Stream),
            "P" | "p" | "process" | "processing" => Ok(JobCategory::Process),
            other => Err(CategoryError::UnknownCategory(other.to_string())),
        }
    }
}

/// A single unit of simulated work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Source address, dotted decimal.
    pub source: String,
    /// Destination address, dotted decimal.
    pub destination: String,
    /// Cycles a worker needs to complete this item.
    pub service_duration: u32,
    /// Job category used for routing.
    pub category: JobCategory,
}

impl WorkItem {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        service_duration: u32,
        category: JobCategory,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            service_duration,
            category,
        }
    }
}
