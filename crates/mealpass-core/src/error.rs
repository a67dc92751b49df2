//! Error types for `mealpass-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid time of day {0:?}, expected HH:MM")]
  InvalidTimeOfDay(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("unknown person category: {0:?}")]
  UnknownCategory(String),

  #[error("unknown time zone: {0:?}")]
  UnknownTimeZone(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
