//! Block filter trait definitions.
//!
//! A [`BlockFilter`] decides whether a work item must be discarded based on
//! its source address. Pools consult the filter lazily, at the moment an item
//! reaches the head of the queue, so a filter only ever sees addresses and
//! never the pool's internal state.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown block filter: {0}")]
    UnknownFilter(String),
    #[error("Block filter '{0}' requires at least one prefix")]
    EmptyPrefixList(String),
    #[error("Invalid address prefix '{0}': expected dotted-decimal octets")]
    InvalidPrefix(String),
}

/// The core block filter trait.
///
/// Implementations must be pure: the same address always yields the same
/// answer for the lifetime of the filter.
pub trait BlockFilter: Send + Sync {
    /// Returns `true` if an item from `source` must be dropped.
    fn is_blocked(&self, source: &str) -> bool;

    /// Human-readable name for reports.
    fn name(&self) -> &str;
}

impl<F: BlockFilter + ?Sized> BlockFilter for Box<F> {
    fn is_blocked(&self, source: &str) -> bool {
        (**self).is_blocked(source)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Check that `prefix` is a leading run of dotted-decimal octets, optionally
/// ending with a trailing dot (e.g. `"10."`, `"192.168.0."`, `"172.16"`).
pub fn validate_prefix(prefix: &str) -> Result<(), FilterError> {
    let body = prefix.strip_suffix('.').unwrap_or(prefix);
    if body.is_empty() {
        return Err(FilterError::InvalidPrefix(prefix.to_string()));
    }
    let octets: Vec<&str> = body.split('.').collect();
    if octets.len() > 4 {
        return Err(FilterError::InvalidPrefix(prefix.to_string()));
    }
    for octet in octets {
        if octet.is_empty() || octet.len() > 3 || octet.parse::<u8>().is_err() {
            return Err(FilterError::InvalidPrefix(prefix.to_string()));
        }
    }
    Ok(())
}
