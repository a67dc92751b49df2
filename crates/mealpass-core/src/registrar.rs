//! The delivery-registration workflow.
//!
//! Per person and civil day there are two states, `NotRegistered` and
//! `Registered`. The only transition is a successful insert. Every other
//! outcome is a query result: a [`Rejection`] leaves the state unchanged and
//! [`RegisterError::Conflict`] confirms it was already `Registered`.
//!
//! The check order is fixed because it decides which message the caller sees:
//! role, then access window, then the person's eligibility.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::{
  clock::CivilClock,
  delivery::{DeliveryRecord, InsertOutcome, NewDelivery, normalize_meal_type},
  notify::{DeliveryNotice, Notifier, NotifyError},
  person::{Ineligibility, Person},
  store::DeliveryStore,
  user::Role,
  window::{AccessConfig, TimeOfDay},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// The authenticated staff member performing a registration.
#[derive(Debug, Clone)]
pub struct Actor {
  pub user_id:      i64,
  pub display_name: String,
  pub role:         Role,
}

/// Deployment-level knobs for the workflow.
#[derive(Debug, Clone)]
pub struct RegistrarPolicy {
  /// Roles allowed to register deliveries.
  pub roles:          Vec<Role>,
  /// Upper bound on how long a notification attempt may hold the request.
  pub notify_timeout: Duration,
}

impl Default for RegistrarPolicy {
  fn default() -> Self {
    Self {
      roles:          Role::ALL.to_vec(),
      notify_timeout: Duration::from_secs(10),
    }
  }
}

impl RegistrarPolicy {
  pub fn permits(&self, role: Role) -> bool { self.roles.contains(&role) }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A registration refused before any write was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("role not permitted")]
  Forbidden,
  /// Carries the configured closed message.
  #[error("{0}")]
  OutsideWindow(String),
  #[error("{0}")]
  PersonIneligible(Ineligibility),
}

#[derive(Debug, Error)]
pub enum RegisterError<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  #[error(transparent)]
  Rejected(#[from] Rejection),

  /// The person already has a delivery for today. Not a server fault.
  /// Carries the existing record.
  #[error("already registered today")]
  Conflict(DeliveryRecord),

  #[error("store unavailable: {0}")]
  Store(#[source] E),
}

/// What happened to the notification that followed a registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
  pub sent:     bool,
  /// The notice went to the administrative fallback address.
  pub fallback: bool,
}

/// A committed registration.
#[derive(Debug, Clone)]
pub struct Registration {
  pub record:       DeliveryRecord,
  pub person:       Person,
  pub notification: NotificationOutcome,
}

// ─── Pure checks ─────────────────────────────────────────────────────────────

pub fn check_role(policy: &RegistrarPolicy, role: Role) -> Result<(), Rejection> {
  if policy.permits(role) { Ok(()) } else { Err(Rejection::Forbidden) }
}

pub fn check_window(config: &AccessConfig, now: TimeOfDay) -> Result<(), Rejection> {
  if config.is_open_at(now) {
    Ok(())
  } else {
    Err(Rejection::OutsideWindow(config.closed_message().to_owned()))
  }
}

/// Returns the person back when they may receive a meal on `today`.
pub fn check_person(
  person: Option<&Person>,
  today:  chrono::NaiveDate,
) -> Result<&Person, Rejection> {
  let person = person.ok_or(Rejection::PersonIneligible(Ineligibility::NotFound))?;
  person
    .eligibility_on(today)
    .map_err(Rejection::PersonIneligible)?;
  Ok(person)
}

/// The full decision sequence, short-circuiting at the first failure.
pub fn can_register(
  policy: &RegistrarPolicy,
  role:   Role,
  config: &AccessConfig,
  now:    TimeOfDay,
  person: Option<&Person>,
  today:  chrono::NaiveDate,
) -> Result<(), Rejection> {
  check_role(policy, role)?;
  check_window(config, now)?;
  check_person(person, today).map(|_| ())
}

// ─── Registrar ───────────────────────────────────────────────────────────────

/// Borrowed view over everything one registration needs. Built per request.
pub struct Registrar<'a, S, N> {
  store:    &'a S,
  notifier: &'a N,
  clock:    &'a CivilClock,
  policy:   &'a RegistrarPolicy,
}

impl<'a, S, N> Registrar<'a, S, N>
where
  S: DeliveryStore,
  N: Notifier,
{
  pub fn new(
    store:    &'a S,
    notifier: &'a N,
    clock:    &'a CivilClock,
    policy:   &'a RegistrarPolicy,
  ) -> Self {
    Self { store, notifier, clock, policy }
  }

  /// Role and window checks. Reads the access configuration fresh and hands
  /// it back so [`Registrar::register`] sees the same row.
  pub async fn admit(&self, actor: &Actor) -> Result<AccessConfig, RegisterError<S::Error>> {
    check_role(self.policy, actor.role)?;
    let config = self
      .store
      .access_config()
      .await
      .map_err(RegisterError::Store)?;
    check_window(&config, self.clock.time_of_day())?;
    Ok(config)
  }

  /// Check the person, insert, then notify.
  ///
  /// The insert is the only guard against double registration; there is no
  /// existence check beforehand.
  pub async fn register(
    &self,
    actor:     &Actor,
    config:    &AccessConfig,
    person_id: i64,
    meal_type: Option<&str>,
  ) -> Result<Registration, RegisterError<S::Error>> {
    let today = self.clock.today();

    let person = self
      .store
      .get_person(person_id)
      .await
      .map_err(RegisterError::Store)?;
    let person = check_person(person.as_ref(), today)?.clone();

    let outcome = self
      .store
      .insert_delivery(NewDelivery {
        person_id,
        date: today,
        meal_type: normalize_meal_type(meal_type),
        created_at: self.clock.now(),
        created_by_user_id: actor.user_id,
      })
      .await
      .map_err(RegisterError::Store)?;

    let record = match outcome {
      InsertOutcome::Inserted(record) => record,
      InsertOutcome::AlreadyRegistered(existing) => {
        tracing::info!(
          person_id,
          %today,
          user_id = actor.user_id,
          existing_id = existing.id,
          "delivery already registered today"
        );
        return Err(RegisterError::Conflict(existing));
      }
    };

    tracing::info!(
      delivery_id = record.id,
      person_id,
      %today,
      user_id = actor.user_id,
      "delivery registered"
    );

    let notification = self.send_notice(actor, &person, &record, config).await;

    Ok(Registration { record, person, notification })
  }

  /// Best-effort: failures are logged and folded into the outcome.
  async fn send_notice(
    &self,
    actor:  &Actor,
    person: &Person,
    record: &DeliveryRecord,
    config: &AccessConfig,
  ) -> NotificationOutcome {
    let (to, fallback) = match (person.notify_address(), config.fallback_address()) {
      (Some(own), _) => (own, false),
      (None, Some(admin)) => (admin, true),
      (None, None) => {
        tracing::warn!(delivery_id = record.id, "notification skipped: no destination");
        return NotificationOutcome::default();
      }
    };

    let notice = DeliveryNotice {
      to:            to.to_owned(),
      fallback,
      person_name:   person.full_name.clone(),
      delivered_at:  self.clock.local(record.created_at),
      registered_by: actor.display_name.clone(),
    };

    let result = tokio::time::timeout(self.policy.notify_timeout, self.notifier.notify(&notice))
      .await
      .unwrap_or(Err(NotifyError::TimedOut));

    match result {
      Ok(()) => NotificationOutcome { sent: true, fallback },
      Err(e) => {
        tracing::warn!(
          delivery_id = record.id,
          error = &e as &(dyn std::error::Error + 'static),
          "notification failed"
        );
        NotificationOutcome { sent: false, fallback }
      }
    }
  }
}
