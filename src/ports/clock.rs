//! Time source for log probe events.

use chrono::{DateTime, Utc};

/// Supplies the instant stamped on a log probe event.
///
/// The live adapter reads the system clock; checker tests pin a fixed instant
/// so the written event can be asserted exactly.
pub trait Clock: Send + Sync {
    /// The current instant. Probe events carry it as epoch milliseconds.
    fn now(&self) -> DateTime<Utc>;
}
