//! `POST /logout`: clear the session cookie.

use axum::{
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use axum_extra::extract::CookieJar;

use crate::{AppState, auth::cleared_cookie};

const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// No session is required; the response always overwrites the cookie.
pub async fn handler<S, N>(
  State(state): State<AppState<S, N>>,
  jar: CookieJar,
) -> impl IntoResponse
where
  S: Send + Sync + 'static,
  N: Send + Sync + 'static,
{
  let jar = jar.add(cleared_cookie(state.config.secure_cookies));
  (StatusCode::NO_CONTENT, [(header::CACHE_CONTROL, NO_STORE)], jar)
}
