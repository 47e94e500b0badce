//! Append-only event record.
//!
//! The simulation core never writes output itself. The driver turns each
//! cycle report into `(cycle, message)` pairs and hands them to an
//! [`EventSink`]. Sinks are write-only and are never consulted for control
//! decisions.
//!
//! File logs use one JSON object per line:
//!
//! ```text
//! {"cycle":12,"message":"[process] Server 4 added. Total servers: 5 (queue 401)"}
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("Failed to access event log: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse event at line {line}: {source}")]
    JsonParse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Failed to encode event: {0}")]
    Encode(serde_json::Error),
}

/// One line of the event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub cycle: u64,
    pub message: String,
}

/// Receiver for simulation events. Calls arrive in simulation order.
pub trait EventSink {
    fn log_event(&mut self, cycle: u64, message: &str) -> Result<(), EventLogError>;

    /// Flush buffered output. Called once at the end of a run.
    fn flush(&mut self) -> Result<(), EventLogError> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn log_event(&mut self, cycle: u64, message: &str) -> Result<(), EventLogError> {
        (**self).log_event(cycle, message)
    }

    fn flush(&mut self) -> Result<(), EventLogError> {
        (**self).flush()
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log_event(&mut self, _cycle: u64, _message: &str) -> Result<(), EventLogError> {
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    records: Vec<EventRecord>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Messages containing `needle`.
    pub fn matching<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a EventRecord> {
        self.records.iter().filter(move |r| r.message.contains(needle))
    }
}

impl EventSink for MemoryEventLog {
    fn log_event(&mut self, cycle: u64, message: &str) -> Result<(), EventLogError> {
        self.records.push(EventRecord {
            cycle,
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Appends JSONL records to a file.
#[derive(Debug)]
pub struct JsonlEventLog {
    writer: BufWriter<File>,
    written: u64,
}

impl JsonlEventLog {
    /// Truncate `path` and start a fresh log.
    pub fn create(path: &Path) -> Result<Self, EventLogError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Records written through this handle.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl EventSink for JsonlEventLog {
    fn log_event(&mut self, cycle: u64, message: &str) -> Result<(), EventLogError> {
        let record = EventRecord {
            cycle,
            message: message.to_string(),
        };
        serde_json::to_writer(&mut self.writer, &record).map_err(EventLogError::Encode)?;
        writeln!(self.writer)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EventLogError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards every event to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log_event(&mut self, cycle: u64, message: &str) -> Result<(), EventLogError> {
        tracing::debug!(cycle, "{}", message);
        Ok(())
    }
}

/// Sends each event to two sinks in turn.
#[derive(Debug)]
pub struct Tee<A, B> {
    pub first: A,
    pub second: B,
}

impl<A: EventSink, B: EventSink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn log_event(&mut self, cycle: u64, message: &str) -> Result<(), EventLogError> {
        self.first.log_event(cycle, message)?;
        self.second.log_event(cycle, message)
    }

    fn flush(&mut self) -> Result<(), EventLogError> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Load a JSONL event log.
pub fn load_event_log(path: &Path) -> Result<Vec<EventRecord>, EventLogError> {
    let file = File::open(path)?;
    parse_event_log(BufReader::new(file))
}

/// Parse JSONL events from any reader. Blank lines are skipped.
pub fn parse_event_log<R: Read>(reader: BufReader<R>) -> Result<Vec<EventRecord>, EventLogError> {
    let mut records = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: EventRecord =
            serde_json::from_str(trimmed).map_err(|e| EventLogError::JsonParse {
                line: line_num + 1,
                source: e,
            })?;
        records.push(record);
    }
    Ok(records)
}
