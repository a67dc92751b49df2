//! People who can receive a meal, and the eligibility rule the registrar
//! applies to them.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Error;

/// How a person relates to the institution serving the meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonCategory {
  Staff,
  Guest,
  Substitute,
}

impl PersonCategory {
  pub fn as_str(self) -> &'static str {
    match self {
      PersonCategory::Staff => "staff",
      PersonCategory::Guest => "guest",
      PersonCategory::Substitute => "substitute",
    }
  }
}

impl FromStr for PersonCategory {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "staff" => Ok(PersonCategory::Staff),
      "guest" => Ok(PersonCategory::Guest),
      "substitute" => Ok(PersonCategory::Substitute),
      other => Err(Error::UnknownCategory(other.to_owned())),
    }
  }
}

/// A person record. Owned by administration; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
  pub id:         i64,
  pub full_name:  String,
  pub email:      Option<String>,
  pub category:   PersonCategory,
  pub active:     bool,
  /// First day (inclusive) on which the person may be served.
  pub valid_from: Option<NaiveDate>,
  /// Last day (inclusive) on which the person may be served.
  pub valid_to:   Option<NaiveDate>,
}

/// The reason a person cannot be registered on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
  NotFound,
  Inactive,
  NotYetValid,
  Expired,
}

impl fmt::Display for Ineligibility {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Ineligibility::NotFound => "person not found",
      Ineligibility::Inactive => "person not active",
      Ineligibility::NotYetValid => "person not yet valid",
      Ineligibility::Expired => "person expired",
    })
  }
}

impl Person {
  /// Check the eligibility rule for `day`: active, and `day` inside the
  /// (inclusive, optionally open-ended) validity window.
  pub fn eligibility_on(&self, day: NaiveDate) -> Result<(), Ineligibility> {
    if !self.active {
      return Err(Ineligibility::Inactive);
    }
    if self.valid_from.is_some_and(|from| from > day) {
      return Err(Ineligibility::NotYetValid);
    }
    if self.valid_to.is_some_and(|to| to < day) {
      return Err(Ineligibility::Expired);
    }
    Ok(())
  }

  pub fn is_eligible_on(&self, day: NaiveDate) -> bool {
    self.eligibility_on(day).is_ok()
  }

  /// The person's own address, if one is recorded and non-blank.
  pub fn notify_address(&self) -> Option<&str> {
    self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
  }
}
