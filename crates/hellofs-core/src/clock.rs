// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Time sources used to stamp inode timestamps
//!
//! The inode table reads the clock exactly once, while it is being built. Tests inject a
//! [`SimulatedClock`] so timestamps can be compared for exact equality.

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Source of wall-clock time
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Clock backed by the operating system
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug)]
pub struct SimulatedClock {
    time: Mutex<SystemTime>,
}

impl SimulatedClock {
    pub fn new(time: SystemTime) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    pub fn set_time(&self, time: SystemTime) {
        *self.lock() = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut time = self.lock();
        *time += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SystemTime> {
        // A poisoned guard still holds a valid SystemTime.
        self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> SystemTime {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_clock_holds_time_until_moved() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let clock = SimulatedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), start + Duration::from_millis(250));

        clock.set_time(SystemTime::UNIX_EPOCH);
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now() > SystemTime::UNIX_EPOCH);
    }
}
