//! Time source port.
//!
//! Limiters read time through this port so tests can drive window
//! boundaries with a controllable clock.

use crate::domain::foundation::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
