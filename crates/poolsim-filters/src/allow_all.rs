//! Pass-through filter that never blocks.

use crate::traits::*;

/// Filter that admits every source address.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AllowAll {
    pub fn new() -> Self {
        Self
    }
}

impl BlockFilter for AllowAll {
    fn is_blocked(&self, _source: &str) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}
