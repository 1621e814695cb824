//! Rate limiting algorithm selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counting algorithm used to enforce a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    /// Counter reset at window boundaries. O(1) per request, permits boundary bursts.
    #[default]
    FixedWindow,
    /// Timestamped log over a trailing interval. Precise, O(log n) per request.
    SlidingWindow,
}

impl Algorithm {
    /// Short tag used in store keys.
    pub fn key_tag(&self) -> &'static str {
        match self {
            Algorithm::FixedWindow => "fw",
            Algorithm::SlidingWindow => "sw",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Algorithm::FixedWindow => "FIXED_WINDOW",
            Algorithm::SlidingWindow => "SLIDING_WINDOW",
        };
        write!(f, "{}", s)
    }
}
