//! `POST /deliveries`: register today's meal for one person.
//!
//! Body: `{"personId": 7, "mealType": "lunch"}` (`mealType` optional).
//!
//! | Status | When |
//! |--------|------|
//! | `401`  | no valid session |
//! | `403`  | role not permitted, or outside the access window |
//! | `400`  | bad `personId`, or the person is not eligible today |
//! | `409`  | already registered today |
//! | `500`  | store failure |

use axum::{Json, body::Bytes, extract::State};
use chrono::{DateTime, Utc};
use mealpass_core::{notify::Notifier, registrar::Registrar, store::DeliveryStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, auth::Session, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
  person_id: Option<Value>,
  meal_type: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
  pub id:        i64,
  pub full_name: String,
  pub email:     Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
  pub delivery_id:    i64,
  pub created_at:     DateTime<Utc>,
  pub person:         PersonSummary,
  pub created_by:     String,
  pub email_sent:     bool,
  pub email_fallback: bool,
}

/// Accepts a positive whole number, either as a JSON number or a numeric
/// string. `7`, `7.0` and `"7"` all name person 7.
fn parse_person_id(value: Option<&Value>) -> Option<i64> {
  let id = match value? {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole))?,
    Value::String(s) => {
      let s = s.trim();
      s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole))?
    }
    _ => return None,
  };
  (id > 0).then_some(id)
}

fn whole(f: f64) -> Option<i64> {
  (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

pub async fn handler<S, N>(
  State(state): State<AppState<S, N>>,
  session: Session,
  body: Bytes,
) -> Result<Json<DeliveryResponse>, ApiError>
where
  S: DeliveryStore + 'static,
  N: Notifier + 'static,
{
  let actor = session.actor();
  let registrar = Registrar::new(&*state.store, &*state.notifier, &state.clock, &state.policy);

  // Role and window come before the body is even looked at.
  let config = registrar.admit(&actor).await?;

  let invalid_id = || ApiError::BadRequest("invalid person id".into());
  let body: RegisterBody = serde_json::from_slice(&body).map_err(|_| invalid_id())?;
  let person_id = parse_person_id(body.person_id.as_ref()).ok_or_else(invalid_id)?;
  let meal_type = body.meal_type.as_ref().and_then(Value::as_str);

  let registration = registrar
    .register(&actor, &config, person_id, meal_type)
    .await?;

  Ok(Json(DeliveryResponse {
    delivery_id:    registration.record.id,
    created_at:     registration.record.created_at,
    person:         PersonSummary {
      id:        registration.person.id,
      full_name: registration.person.full_name,
      email:     registration.person.email,
    },
    created_by:     actor.display_name,
    email_sent:     registration.notification.sent,
    email_fallback: registration.notification.fallback,
  }))
}
