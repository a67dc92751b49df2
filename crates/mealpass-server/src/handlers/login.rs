//! `POST /login`: exchange credentials for a session cookie.
//!
//! Body: `{"username": "...", "password": "..."}`. On success the response
//! sets the `session` cookie and returns `{"redirectTo": <landing path>}`.

use axum::{Json, body::Bytes, extract::State};
use axum_extra::extract::CookieJar;
use mealpass_core::{notify::Notifier, store::DeliveryStore};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{session_cookie, verify_password},
  error::ApiError,
  session::SessionClaims,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginBody {
  username: String,
  password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub redirect_to: &'static str,
}

pub async fn handler<S, N>(
  State(state): State<AppState<S, N>>,
  jar: CookieJar,
  body: Bytes,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError>
where
  S: DeliveryStore + 'static,
  N: Notifier + 'static,
{
  let body: LoginBody = serde_json::from_slice(&body)
    .map_err(|_| ApiError::BadRequest("invalid request body".into()))?;

  let username = body.username.trim();
  if username.is_empty() || body.password.is_empty() {
    return Err(ApiError::BadRequest("username and password are required".into()));
  }

  let user = state
    .store
    .find_user(username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidCredentials)?;

  if !verify_password(&body.password, &user.password_hash) {
    tracing::info!(username, "login rejected: bad password");
    return Err(ApiError::InvalidCredentials);
  }
  if !user.active {
    tracing::info!(user_id = user.id, "login rejected: account disabled");
    return Err(ApiError::Forbidden("account disabled".into()));
  }

  let now = state.clock.now();
  if let Err(e) = state.store.record_login(user.id, now).await {
    tracing::warn!(user_id = user.id, error = %e, "failed to record login time");
  }

  let ttl = state.config.session_ttl();
  let claims = SessionClaims::expiring(user.id, user.username.clone(), user.role, now, ttl);
  let token = state.sessions.issue(&claims)?;

  tracing::info!(user_id = user.id, role = %user.role, "signed in");

  let jar = jar.add(session_cookie(token, ttl, state.config.secure_cookies));
  Ok((jar, Json(LoginResponse { redirect_to: user.role.landing_path() })))
}
