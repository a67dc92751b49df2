//! Delivery records: one per person per civil day, immutable once written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A committed delivery. Never updated or deleted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
  pub id:                 i64,
  pub person_id:          i64,
  /// The civil date the meal counts against.
  pub date:               NaiveDate,
  pub meal_type:          Option<String>,
  pub created_at:         DateTime<Utc>,
  pub created_by_user_id: i64,
}

/// Input to [`crate::store::DeliveryStore::insert_delivery`].
#[derive(Debug, Clone)]
pub struct NewDelivery {
  pub person_id:          i64,
  pub date:               NaiveDate,
  pub meal_type:          Option<String>,
  pub created_at:         DateTime<Utc>,
  pub created_by_user_id: i64,
}

/// Result of a conditional insert on `(person_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted(DeliveryRecord),
  /// The uniqueness constraint rejected the row: someone (possibly a
  /// concurrent request) already registered this person today. Carries the
  /// row that won.
  AlreadyRegistered(DeliveryRecord),
}

/// Normalise a free-text meal label: trimmed, with blank meaning unset.
pub fn normalize_meal_type(raw: Option<&str>) -> Option<String> {
  raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}
