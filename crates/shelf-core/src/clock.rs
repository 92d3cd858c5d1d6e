//! Time source abstraction.
//!
//! Token expiry is decided against a [`Clock`] rather than `Utc::now()` so
//! tests can move time forward without sleeping.
//!
//! Readings are truncated to whole microseconds, the precision timestamps are
//! persisted at, so a value handed out before a write compares equal to the
//! value read back after it.

use std::sync::Mutex;

use chrono::{DateTime, Duration, SubsecRound as _, Utc};

/// Sub-second digits kept by every clock reading.
pub const PRECISION_DIGITS: u16 = 6;

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now().trunc_subsecs(PRECISION_DIGITS) }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(start.trunc_subsecs(PRECISION_DIGITS)) }
  }

  pub fn set(&self, to: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to.trunc_subsecs(PRECISION_DIGITS);
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    *now = (*now + by).trunc_subsecs(PRECISION_DIGITS);
  }
}

impl Default for ManualClock {
  fn default() -> Self { Self::new(Utc::now()) }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use chrono::SubsecRound as _;

  use super::*;

  #[test]
  fn manual_clock_advances() {
    let start = Utc::now().trunc_subsecs(PRECISION_DIGITS);
    let clock = ManualClock::new(start);
    assert_eq!(clock.now(), start);

    clock.advance(Duration::hours(3));
    assert_eq!(clock.now(), start + Duration::hours(3));

    clock.set(start);
    assert_eq!(clock.now(), start);
  }

  #[test]
  fn readings_drop_sub_microsecond_digits() {
    let start = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.now().timestamp_subsec_nanos(), 123_456_000);

    clock.advance(Duration::nanoseconds(999));
    assert_eq!(clock.now().timestamp_subsec_nanos(), 123_456_000);

    assert_eq!(SystemClock.now().timestamp_subsec_nanos() % 1_000, 0);
  }
}
