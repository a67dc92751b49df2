//! The daily access window and the configuration row it is read from.

use std::{fmt, str::FromStr};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Message shown when a registration is attempted outside the window and the
/// configuration does not provide one.
pub const DEFAULT_CLOSED_MESSAGE: &str =
  "outside the permitted hours for registering deliveries";

// ─── TimeOfDay ───────────────────────────────────────────────────────────────

/// A civil wall-clock time with minute precision, stored as minutes since
/// midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
  pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
    (hour < 24 && minute < 60).then(|| Self((hour * 60 + minute) as u16))
  }

  pub fn minutes(self) -> u16 { self.0 }
}

impl From<NaiveTime> for TimeOfDay {
  /// Truncates seconds.
  fn from(t: NaiveTime) -> Self { Self((t.hour() * 60 + t.minute()) as u16) }
}

impl FromStr for TimeOfDay {
  type Err = Error;

  /// Accepts exactly `HH:MM` with two digits on each side.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidTimeOfDay(s.to_owned());
    let trimmed = s.trim();
    let (hh, mm) = trimmed.split_once(':').ok_or_else(invalid)?;
    if hh.len() != 2
      || mm.len() != 2
      || !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit())
    {
      return Err(invalid());
    }
    let hour: u32 = hh.parse().map_err(|_| invalid())?;
    let minute: u32 = mm.parse().map_err(|_| invalid())?;
    Self::from_hm(hour, minute).ok_or_else(invalid)
  }
}

impl fmt::Display for TimeOfDay {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
  }
}

// ─── AccessWindow ────────────────────────────────────────────────────────────

/// An inclusive `[start, end]` range of civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindow {
  pub start: TimeOfDay,
  pub end:   TimeOfDay,
}

impl AccessWindow {
  pub fn contains(&self, now: TimeOfDay) -> bool {
    now >= self.start && now <= self.end
  }
}

// ─── AccessConfig ────────────────────────────────────────────────────────────

/// The externally-owned configuration row consulted on every registration.
///
/// Bounds are kept as the raw strings the administrator entered; they are
/// parsed on read, so a malformed value disables the window rather than
/// failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
  pub window_start:            Option<String>,
  pub window_end:              Option<String>,
  pub closed_message:          Option<String>,
  pub fallback_notify_address: Option<String>,
}

impl AccessConfig {
  /// The active window, present only when both bounds parse.
  pub fn window(&self) -> Option<AccessWindow> {
    let start = self.window_start.as_deref()?.parse().ok()?;
    let end = self.window_end.as_deref()?.parse().ok()?;
    Some(AccessWindow { start, end })
  }

  /// Whether registrations are allowed at `now`. No window means always open.
  pub fn is_open_at(&self, now: TimeOfDay) -> bool {
    self.window().is_none_or(|w| w.contains(now))
  }

  pub fn closed_message(&self) -> &str {
    self
      .closed_message
      .as_deref()
      .map(str::trim)
      .filter(|m| !m.is_empty())
      .unwrap_or(DEFAULT_CLOSED_MESSAGE)
  }

  pub fn fallback_address(&self) -> Option<&str> {
    self
      .fallback_notify_address
      .as_deref()
      .map(str::trim)
      .filter(|a| !a.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(s: &str) -> TimeOfDay { s.parse().unwrap() }

  fn config(start: &str, end: &str) -> AccessConfig {
    AccessConfig {
      window_start: Some(start.into()),
      window_end: Some(end.into()),
      ..Default::default()
    }
  }

  #[test]
  fn parses_and_displays_hh_mm() {
    assert_eq!(t("08:00").minutes(), 480);
    assert_eq!(t("23:59").minutes(), 23 * 60 + 59);
    assert_eq!(t("07:05").to_string(), "07:05");
  }

  #[test]
  fn rejects_malformed_times() {
    for bad in ["8:00", "24:00", "12:60", "12-00", "ab:cd", "", "12:000"] {
      assert!(bad.parse::<TimeOfDay>().is_err(), "{bad:?} should not parse");
    }
  }

  #[test]
  fn window_is_inclusive_at_both_ends() {
    let cfg = config("08:00", "14:00");
    assert!(cfg.is_open_at(t("08:00")));
    assert!(cfg.is_open_at(t("14:00")));
    assert!(!cfg.is_open_at(t("07:59")));
    assert!(!cfg.is_open_at(t("14:01")));
  }

  #[test]
  fn missing_or_malformed_bound_means_no_window() {
    let mut cfg = config("08:00", "14:00");
    cfg.window_end = None;
    assert!(cfg.window().is_none());
    assert!(cfg.is_open_at(t("23:00")));

    let cfg = config("8am", "14:00");
    assert!(cfg.window().is_none());
    assert!(cfg.is_open_at(t("03:00")));
  }

  #[test]
  fn blank_closed_message_falls_back_to_default() {
    let mut cfg = config("08:00", "14:00");
    assert_eq!(cfg.closed_message(), DEFAULT_CLOSED_MESSAGE);
    cfg.closed_message = Some("  ".into());
    assert_eq!(cfg.closed_message(), DEFAULT_CLOSED_MESSAGE);
    cfg.closed_message = Some("Kitchen closed".into());
    assert_eq!(cfg.closed_message(), "Kitchen closed");
  }
}
