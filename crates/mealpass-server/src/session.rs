//! Stateless signed session tokens.
//!
//! A token is `base64url(json(claims)) + "." + base64url(hmac_sha256(encoded))`.
//! Nothing is stored server-side; the expiry travels inside the signed
//! payload. Verification collapses every failure (bad signature, malformed
//! payload, expiry) into "no session".

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use mealpass_core::user::Role;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// The identity carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
  pub subject_id:   i64,
  pub display_name: String,
  pub role:         Role,
  /// Unix seconds.
  pub expires_at:   i64,
}

impl SessionClaims {
  pub fn expiring(
    subject_id:   i64,
    display_name: impl Into<String>,
    role:         Role,
    now:          DateTime<Utc>,
    ttl:          Duration,
  ) -> Self {
    let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Self {
      subject_id,
      display_name: display_name.into(),
      role,
      expires_at: now.timestamp().saturating_add(ttl),
    }
  }
}

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("session secret is empty")]
  MissingSecret,

  #[error("failed to encode session claims: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Issues and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct SessionSigner {
  mac: HmacSha256,
}

impl std::fmt::Debug for SessionSigner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionSigner").finish_non_exhaustive()
  }
}

impl SessionSigner {
  /// Fails when `secret` is empty; a signer cannot exist without a key.
  pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SessionError> {
    let secret = secret.as_ref();
    if secret.is_empty() {
      return Err(SessionError::MissingSecret);
    }
    let mac =
      HmacSha256::new_from_slice(secret).map_err(|_| SessionError::MissingSecret)?;
    Ok(Self { mac })
  }

  fn sign(&self, encoded: &str) -> Vec<u8> {
    let mut mac = self.mac.clone();
    mac.update(encoded.as_bytes());
    mac.finalize().into_bytes().to_vec()
  }

  pub fn issue(&self, claims: &SessionClaims) -> Result<String, SessionError> {
    let encoded = B64.encode(serde_json::to_vec(claims)?);
    let signature = B64.encode(self.sign(&encoded));
    Ok(format!("{encoded}.{signature}"))
  }

  /// Returns the claims only if the signature matches and the token has not
  /// expired at `now`.
  pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
    let (encoded, signature) = token.split_once('.')?;
    if encoded.is_empty() || signature.is_empty() {
      return None;
    }

    let signature = B64.decode(signature).ok()?;
    let mut mac = self.mac.clone();
    mac.update(encoded.as_bytes());
    mac.verify_slice(&signature).ok()?;

    let payload = B64.decode(encoded).ok()?;
    let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;

    if claims.subject_id <= 0 || claims.expires_at < now.timestamp() {
      return None;
    }
    Some(claims)
  }
}
