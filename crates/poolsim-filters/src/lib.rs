//! Source-address block filters for PoolSim.
//!
//! This crate provides the [`BlockFilter`] trait and the built-in policies a
//! pool can apply to queued work before assigning it to a worker:
//!
//! | Name | Filter | Blocks |
//! |------|--------|--------|
//! | `none` | [`AllowAll`] | nothing |
//! | `private-192` | [`PrefixBlock`] | `192.168.0.*` |
//! | `private-10` | [`PrefixBlock`] | `10.*` |
//! | `prefix:<p>[,<p>...]` | [`PrefixBlock`] | any listed prefix |

pub mod allow_all;
pub mod prefix;
pub mod traits;

pub use allow_all::AllowAll;
pub use prefix::PrefixBlock;
pub use traits::*;

/// Create a block filter from its configured name.
pub fn filter_by_name(name: &str) -> Result<Box<dyn BlockFilter>, FilterError> {
    let name = name.trim();
    match name {
        "none" | "allow_all" => Ok(Box::new(AllowAll::new())),
        "private-192" => Ok(Box::new(PrefixBlock::private_192())),
        "private-10" => Ok(Box::new(PrefixBlock::private_10())),
        other => match other.strip_prefix("prefix:") {
            Some(list) => {
                let prefixes: Vec<&str> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                if prefixes.is_empty() {
                    return Err(FilterError::EmptyPrefixList(other.to_string()));
                }
                Ok(Box::new(PrefixBlock::new(prefixes)?))
            }
            None => Err(FilterError::UnknownFilter(other.to_string())),
        },
    }
}

/// List the built-in filter names.
pub fn available_filters() -> Vec<&'static str> {
    vec!["none", "private-192", "private-10", "prefix:<p>[,<p>...]"]
}
