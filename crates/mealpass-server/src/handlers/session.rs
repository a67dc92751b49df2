//! `GET /session`: the claims of the current session.

use axum::Json;

use crate::{auth::Session, session::SessionClaims};

pub async fn handler(Session(claims): Session) -> Json<SessionClaims> { Json(claims) }
