use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock abstraction used to stamp buffered readings.
///
/// - now(): returns the current wall-clock time
/// - unix_ms(): helper returning milliseconds since the UNIX epoch
pub trait Clock {
    fn now(&self) -> SystemTime;

    /// Milliseconds since the UNIX epoch, saturating at 0 for pre-epoch times.
    fn unix_ms(&self) -> u64 {
        let dur = self
            .now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        dur.as_millis().min(u128::from(u64::MAX)) as u64
    }
}

/// Default clock backed by `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic clock whose time only moves when told to.
    ///
    /// now() = origin + offset
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        origin: SystemTime,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::at_unix_ms(0)
        }
    }

    impl ManualClock {
        /// Clock frozen at `ms` milliseconds after the UNIX epoch.
        pub fn at_unix_ms(ms: u64) -> Self {
            Self {
                origin: UNIX_EPOCH + Duration::from_millis(ms),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Set the absolute offset relative to origin.
        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::at_unix_ms(1_000);
        assert_eq!(clock.unix_ms(), 1_000);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.unix_ms(), 1_250);
        clock.set_offset(Duration::from_secs(2));
        assert_eq!(clock.unix_ms(), 3_000);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock::new().unix_ms() > 0);
    }
}
