//! Rate limiting for repetitive log lines.
//!
//! Discovery and open failures repeat every rescan while a board is
//! unplugged; the gate lets one line through per window and counts the rest.

use std::time::{Duration, Instant};

/// Allows at most one event per `interval`.
#[derive(Debug, Clone)]
pub struct LogGate {
    interval: Duration,
    last_emitted: Option<Instant>,
    suppressed: u64,
}

impl LogGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: None,
            suppressed: 0,
        }
    }

    /// Returns true if a line may be emitted at `now`.
    pub fn should_log(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_emitted
            && now.saturating_duration_since(last) < self.interval
        {
            self.suppressed = self.suppressed.saturating_add(1);
            return false;
        }
        self.last_emitted = Some(now);
        true
    }

    /// Returns and clears the number of suppressed events.
    pub fn take_suppressed(&mut self) -> u64 {
        std::mem::take(&mut self.suppressed)
    }

    /// Forgets the last emission so the next event logs immediately.
    pub fn reset(&mut self) {
        self.last_emitted = None;
        self.suppressed = 0;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
