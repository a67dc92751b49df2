//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use mealpass_core::registrar::{RegisterError, Rejection};
use serde_json::json;
use thiserror::Error;

use crate::session::SessionError;

/// An error returned by a handler. Rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No valid session, whatever the reason.
  #[error("please sign in")]
  Unauthorized,

  #[error("invalid username or password")]
  InvalidCredentials,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  BadRequest(String),

  /// Rendered with the id of the delivery already on record.
  #[error("{message}")]
  Conflict { message: String, delivery_id: i64 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Session(#[from] SessionError),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }
}

impl<E> From<RegisterError<E>> for ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn from(e: RegisterError<E>) -> Self {
    let message = e.to_string();
    match e {
      RegisterError::Rejected(Rejection::Forbidden | Rejection::OutsideWindow(_)) => {
        ApiError::Forbidden(message)
      }
      RegisterError::Rejected(Rejection::PersonIneligible(_)) => ApiError::BadRequest(message),
      RegisterError::Conflict(existing) => ApiError::Conflict { message, delivery_id: existing.id },
      RegisterError::Store(source) => ApiError::store(source),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthorized | ApiError::InvalidCredentials => {
        (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict { message, delivery_id } => (
        StatusCode::CONFLICT,
        json!({ "error": message, "deliveryId": delivery_id }),
      ),
      ApiError::Store(_) | ApiError::Session(_) => {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
      }
    };
    (status, Json(body)).into_response()
  }
}
