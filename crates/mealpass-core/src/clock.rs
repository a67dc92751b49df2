//! Injectable time source.
//!
//! "Today" and the current time of day are always computed in the
//! deployment's civil time zone, never in the server's local zone.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{Error, Result, window::TimeOfDay};

/// A source of the current instant.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that reports whatever it was last set to.
#[derive(Debug)]
pub struct FixedClock {
  at: Mutex<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(at: DateTime<Utc>) -> Self { Self { at: Mutex::new(at) } }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.at.lock().unwrap_or_else(|e| e.into_inner()) = at;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.at.lock().unwrap_or_else(|e| e.into_inner())
  }
}

/// A clock bound to the operating time zone.
///
/// Cloning is cheap; the underlying clock is reference-counted.
#[derive(Clone)]
pub struct CivilClock {
  clock: Arc<dyn Clock>,
  tz:    Tz,
}

impl CivilClock {
  pub fn new(clock: Arc<dyn Clock>, tz: Tz) -> Self { Self { clock, tz } }

  /// Resolve an IANA zone name such as `America/Santiago`.
  pub fn with_zone_name(clock: Arc<dyn Clock>, zone: &str) -> Result<Self> {
    let tz = zone
      .parse::<Tz>()
      .map_err(|_| Error::UnknownTimeZone(zone.to_owned()))?;
    Ok(Self::new(clock, tz))
  }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  pub fn local(&self, at: DateTime<Utc>) -> DateTime<Tz> {
    at.with_timezone(&self.tz)
  }

  /// The civil calendar date right now.
  pub fn today(&self) -> NaiveDate { self.local(self.now()).date_naive() }

  /// The civil time of day right now, truncated to the minute.
  pub fn time_of_day(&self) -> TimeOfDay {
    TimeOfDay::from(self.local(self.now()).time())
  }
}

impl std::fmt::Debug for CivilClock {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CivilClock").field("tz", &self.tz).finish_non_exhaustive()
  }
}
