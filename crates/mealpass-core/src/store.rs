//! The `DeliveryStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `mealpass-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  delivery::{DeliveryRecord, InsertOutcome, NewDelivery},
  person::Person,
  user::UserAccount,
  window::AccessConfig,
};

/// Abstraction over the record store.
///
/// Persons, users and the access configuration are read-only from the point
/// of view of the registration workflow. The only write the workflow makes is
/// [`DeliveryStore::insert_delivery`], and the backend must make it atomic
/// with respect to the `(person_id, date)` uniqueness rule.
///
/// Every method returns a `Send` future, so handlers built on it can run on a
/// multi-threaded runtime.
pub trait DeliveryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Look up a staff account by exact username.
  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + 'a;

  /// Stamp the account's last successful login.
  fn record_login(
    &self,
    user_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Persons ───────────────────────────────────────────────────────────

  fn get_person(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn list_persons(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  // ── Configuration ─────────────────────────────────────────────────────

  /// Read the access configuration. Returns the default (no window) when the
  /// row has never been written.
  fn access_config(
    &self,
  ) -> impl Future<Output = Result<AccessConfig, Self::Error>> + Send + '_;

  // ── Deliveries ────────────────────────────────────────────────────────

  /// Attempt to insert a delivery. A uniqueness violation on
  /// `(person_id, date)` is reported as [`InsertOutcome::AlreadyRegistered`]
  /// together with the existing row, not as an error.
  fn insert_delivery(
    &self,
    input: NewDelivery,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// All deliveries recorded against `date`.
  fn deliveries_on(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DeliveryRecord>, Self::Error>> + Send + '_;
}
