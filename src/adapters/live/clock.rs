//! System clock adapter.

use chrono::{DateTime, Utc};

use crate::ports::Clock;

/// Reads the system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_track_wall_clock() {
        let before = Utc::now().timestamp_millis();
        let now = SystemClock.now().timestamp_millis();
        assert!(now >= before);
        assert!(now - before < 60_000);
    }
}
