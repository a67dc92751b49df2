//! HTTP layer for mealpass.
//!
//! Exposes an axum [`Router`] with cookie-based sessions and the delivery
//! registration endpoint, backed by any [`DeliveryStore`] and [`Notifier`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod session;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use mealpass_core::{
  clock::CivilClock,
  notify::Notifier,
  registrar::RegistrarPolicy,
  store::DeliveryStore,
  user::Role,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use mailer::SmtpConfig;
use session::SessionSigner;

// ─── Configuration ────────────────────────────────────────────────────────────

const DEFAULT_SMTP_FROM: &str = "mealpass@localhost";

/// Runtime server configuration, deserialised from `config.toml` and
/// `MEALPASS_*` environment variables.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// HMAC key for session tokens. Startup fails when empty.
  pub session_secret:      String,
  pub session_ttl_secs:    u64,
  /// Mark the session cookie `Secure`. Enable in production.
  pub secure_cookies:      bool,
  /// IANA zone used for "today" and the access window.
  pub time_zone:           String,
  pub registrar_roles:     Vec<Role>,
  pub notify_timeout_secs: u64,
  pub smtp_host:           Option<String>,
  pub smtp_port:           u16,
  pub smtp_from:           Option<String>,
  pub smtp_username:       Option<String>,
  pub smtp_password:       Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      store_path:          PathBuf::from("mealpass.db"),
      session_secret:      String::new(),
      session_ttl_secs:    12 * 60 * 60,
      secure_cookies:      false,
      time_zone:           "America/Santiago".to_string(),
      registrar_roles:     Role::ALL.to_vec(),
      notify_timeout_secs: 10,
      smtp_host:           None,
      smtp_port:           587,
      smtp_from:           None,
      smtp_username:       None,
      smtp_password:       None,
    }
  }
}

impl ServerConfig {
  pub fn session_ttl(&self) -> Duration { Duration::from_secs(self.session_ttl_secs) }

  pub fn policy(&self) -> RegistrarPolicy {
    RegistrarPolicy {
      roles:          self.registrar_roles.clone(),
      notify_timeout: Duration::from_secs(self.notify_timeout_secs),
    }
  }

  /// SMTP settings, or `None` when no relay host is configured.
  pub fn smtp(&self) -> Option<SmtpConfig> {
    let host = self.smtp_host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
    Some(SmtpConfig {
      host:     host.to_string(),
      port:     self.smtp_port,
      from:     self.smtp_from.clone().unwrap_or_else(|| DEFAULT_SMTP_FROM.to_string()),
      username: self.smtp_username.clone(),
      password: self.smtp_password.clone(),
    })
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. Nothing in here is
/// mutated after startup.
pub struct AppState<S, N> {
  pub store:    Arc<S>,
  pub notifier: Arc<N>,
  pub sessions: Arc<SessionSigner>,
  pub clock:    CivilClock,
  pub policy:   Arc<RegistrarPolicy>,
  pub config:   Arc<ServerConfig>,
}

impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: Arc::clone(&self.notifier),
      sessions: Arc::clone(&self.sessions),
      clock:    self.clock.clone(),
      policy:   Arc::clone(&self.policy),
      config:   Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the server.
pub fn router<S, N>(state: AppState<S, N>) -> Router
where
  S: DeliveryStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    .route("/login",      post(handlers::login::handler::<S, N>))
    .route("/logout",     post(handlers::logout::handler::<S, N>))
    .route("/session",    get(handlers::session::handler))
    .route("/deliveries", post(handlers::deliveries::handler::<S, N>))
    .route("/queue",      get(handlers::queue::handler::<S, N>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests;
