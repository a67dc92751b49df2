//! `GET /queue`: today's check-in list.
//!
//! Every person eligible today, sorted by name, with the time of their
//! delivery if one has already been registered. Read-only.

use std::collections::HashMap;

use axum::{Json, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use mealpass_core::{
  notify::Notifier,
  person::PersonCategory,
  registrar::check_role,
  store::DeliveryStore,
};
use serde::Serialize;

use crate::{AppState, auth::Session, error::ApiError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowView {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end:            Option<String>,
  /// Present only while the window is closed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub closed_message: Option<String>,
  pub open:           bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
  pub id:           i64,
  pub full_name:    String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:        Option<String>,
  pub category:     PersonCategory,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
  pub date:   NaiveDate,
  pub window: WindowView,
  pub people: Vec<QueueEntry>,
}

pub async fn handler<S, N>(
  State(state): State<AppState<S, N>>,
  session: Session,
) -> Result<Json<QueueResponse>, ApiError>
where
  S: DeliveryStore + 'static,
  N: Notifier + 'static,
{
  check_role(&state.policy, session.0.role).map_err(|r| ApiError::Forbidden(r.to_string()))?;

  let today = state.clock.today();
  let config = state.store.access_config().await.map_err(ApiError::store)?;
  let open = config.is_open_at(state.clock.time_of_day());
  let bounds = config.window();

  let delivered: HashMap<i64, DateTime<Utc>> = state
    .store
    .deliveries_on(today)
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|d| (d.person_id, d.created_at))
    .collect();

  let people = state
    .store
    .list_persons()
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .filter(|p| p.is_eligible_on(today))
    .map(|p| QueueEntry {
      delivered_at: delivered.get(&p.id).copied(),
      id:           p.id,
      full_name:    p.full_name,
      email:        p.email,
      category:     p.category,
    })
    .collect();

  Ok(Json(QueueResponse {
    date: today,
    window: WindowView {
      start: bounds.map(|w| w.start.to_string()),
      end: bounds.map(|w| w.end.to_string()),
      closed_message: (!open).then(|| config.closed_message().to_owned()),
      open,
    },
    people,
  }))
}
