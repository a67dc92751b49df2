//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, and
//! enums are their lowercase names.

use chrono::{DateTime, NaiveDate, Utc};
use mealpass_core::{
  delivery::DeliveryRecord,
  person::Person,
  user::UserAccount,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
  pub active:        bool,
  pub last_login_at: Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<UserAccount> {
    Ok(UserAccount {
      id:            self.id,
      username:      self.username,
      password_hash: self.password_hash,
      role:          self.role.parse()?,
      active:        self.active,
      last_login_at: self.last_login_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `persons` row.
pub struct RawPerson {
  pub id:         i64,
  pub full_name:  String,
  pub email:      Option<String>,
  pub category:   String,
  pub active:     bool,
  pub valid_from: Option<String>,
  pub valid_to:   Option<String>,
}

impl RawPerson {
  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:         self.id,
      full_name:  self.full_name,
      email:      self.email,
      category:   self.category.parse()?,
      active:     self.active,
      valid_from: self.valid_from.as_deref().map(decode_date).transpose()?,
      valid_to:   self.valid_to.as_deref().map(decode_date).transpose()?,
    })
  }
}

/// Raw values read directly from a `deliveries` row.
pub struct RawDelivery {
  pub id:                 i64,
  pub person_id:          i64,
  pub date:               String,
  pub meal_type:          Option<String>,
  pub created_at:         String,
  pub created_by_user_id: i64,
}

impl RawDelivery {
  pub fn into_record(self) -> Result<DeliveryRecord> {
    Ok(DeliveryRecord {
      id:                 self.id,
      person_id:          self.person_id,
      date:               decode_date(&self.date)?,
      meal_type:          self.meal_type,
      created_at:         decode_dt(&self.created_at)?,
      created_by_user_id: self.created_by_user_id,
    })
  }
}
