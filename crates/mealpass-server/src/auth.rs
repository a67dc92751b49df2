//! Session cookie extractor and cookie builders.

use std::time::Duration;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::{
  CookieJar,
  cookie::{Cookie, SameSite},
};
use mealpass_core::{notify::Notifier, registrar::Actor, store::DeliveryStore};

use crate::{AppState, error::ApiError, session::SessionClaims};

pub const SESSION_COOKIE: &str = "session";

/// A verified session. Extracting it rejects with 401 when the cookie is
/// absent, forged, malformed or expired.
#[derive(Debug, Clone)]
pub struct Session(pub SessionClaims);

impl Session {
  pub fn actor(&self) -> Actor {
    Actor {
      user_id:      self.0.subject_id,
      display_name: self.0.display_name.clone(),
      role:         self.0.role,
    }
  }
}

impl<S, N> FromRequestParts<AppState<S, N>> for Session
where
  S: DeliveryStore + 'static,
  N: Notifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, N>,
  ) -> Result<Self, Self::Rejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE).ok_or(ApiError::Unauthorized)?;
    state
      .sessions
      .verify(token.value(), state.clock.now())
      .map(Session)
      .ok_or(ApiError::Unauthorized)
  }
}

/// Check `password` against an argon2 PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(password_hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// The cookie set after a successful login.
pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
  let max_age = time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
  Cookie::build((SESSION_COOKIE, token))
    .http_only(true)
    .same_site(SameSite::Lax)
    .path("/")
    .max_age(max_age)
    .secure(secure)
    .build()
}

/// An empty, already-expired cookie that overwrites the session on logout.
pub fn cleared_cookie(secure: bool) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE, ""))
    .http_only(true)
    .same_site(SameSite::Lax)
    .path("/")
    .max_age(time::Duration::ZERO)
    .secure(secure)
    .build()
}
