//! Address-prefix block filter.
//!
//! Matches the dotted-decimal source address with a plain string prefix test,
//! so `"10."` blocks `10.0.0.5` but not `110.0.0.5`.

use crate::traits::*;

/// Blocks any source address that starts with one of the configured prefixes.
#[derive(Debug, Clone)]
pub struct PrefixBlock {
    prefixes: Vec<String>,
    name: String,
}

impl PrefixBlock {
    /// Build a filter from one or more prefixes.
    pub fn new<I, S>(prefixes: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        if prefixes.is_empty() {
            return Err(FilterError::EmptyPrefixList("prefix".to_string()));
        }
        for prefix in &prefixes {
            validate_prefix(prefix)?;
        }
        let name = format!("prefix:{}", prefixes.join(","));
        Ok(Self { prefixes, name })
    }

    /// The 192.168.0.0/24 private range.
    pub fn private_192() -> Self {
        Self {
            prefixes: vec!["192.168.0.".to_string()],
            name: "private-192".to_string(),
        }
    }

    /// The 10.0.0.0/8 private range.
    pub fn private_10() -> Self {
        Self {
            prefixes: vec!["10.".to_string()],
            name: "private-10".to_string(),
        }
    }
}

impl BlockFilter for PrefixBlock {
    fn is_blocked(&self, source: &str) -> bool {
        self.prefixes.iter().any(|p| source.starts_with(p.as_str()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
