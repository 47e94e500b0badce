//! Simulated worker server.
//!
//! A [`Worker`] serves one [`WorkItem`] at a time. It is owned by exactly one
//! pool, which assigns items only to idle workers and advances every worker
//! once per cycle.

use crate::request::WorkItem;

/// A single-concurrency execution slot.
#[derive(Debug, Clone)]
pub struct Worker {
    /// Stable identifier, unique within the owning pool.
    pub id: u32,
    /// Cycles left on the current item; zero when idle.
    remaining: u32,
    /// Item being served.
    current: Option<WorkItem>,
}

impl Worker {
    /// Create an idle worker.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            remaining: 0,
            current: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }

    /// Cycles left on the current item.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Item being served, if any.
    pub fn current(&self) -> Option<&WorkItem> {
        self.current.as_ref()
    }

    /// Start serving `item`.
    ///
    /// # Panics
    ///
    /// Panics if the worker is busy or the item has a zero service duration.
    /// The pool checks idleness before assigning, so either case is a bug in
    /// the caller.
    pub fn assign(&mut self, item: WorkItem) {
        assert!(
            self.is_idle(),
            "worker {} assigned while busy ({} cycles remaining)",
            self.id,
            self.remaining,
        );
        assert!(
            item.service_duration > 0,
            "worker {} assigned an item with zero service duration",
            self.id,
        );
        self.remaining = item.service_duration;
        self.current = Some(item);
    }

    /// Serve one cycle. Returns the item if it completed this cycle.
    pub fn advance(&mut self) -> Option<WorkItem> {
        if self.current.is_none() {
            return None;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            return self.current.take();
        }
        None
    }
}
