// Wall-clock time derived from the tokio clock
//
// Deadlines are slept on with tokio timers but stored as `DateTime<Utc>`.
// Anchoring one to the other keeps both views consistent, including under
// paused time in tests.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor_wall: DateTime<Utc>,
    anchor_instant: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            anchor_wall: Utc::now(),
            anchor_instant: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.anchor_instant);
        match chrono::Duration::from_std(elapsed) {
            Ok(elapsed) => self.anchor_wall + elapsed,
            Err(_) => self.anchor_wall,
        }
    }

    /// Tokio instant at which `at` is reached; past timestamps map to now
    pub fn instant_at(&self, at: DateTime<Utc>) -> Instant {
        let now = Instant::now();
        match (at - self.now()).to_std() {
            Ok(remaining) => now + remaining,
            Err(_) => now,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
