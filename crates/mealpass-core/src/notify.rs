//! The notification side channel.
//!
//! A notice is sent after a delivery has been committed. Its outcome is
//! reported back to the caller for display, but it never affects whether the
//! registration succeeded.

use std::future::Future;

use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;

/// Everything a transport needs to tell someone a meal was handed out.
#[derive(Debug, Clone)]
pub struct DeliveryNotice {
  pub to:            String,
  /// `true` when `to` is the administrative fallback rather than the
  /// person's own address.
  pub fallback:      bool,
  pub person_name:   String,
  pub delivered_at:  DateTime<Tz>,
  pub registered_by: String,
}

impl DeliveryNotice {
  pub fn subject(&self) -> String {
    if self.fallback {
      format!("Delivery without email: {}", self.person_name)
    } else {
      "Meal delivery confirmation".to_owned()
    }
  }

  pub fn text_body(&self) -> String {
    let when = self.delivered_at.format("%Y-%m-%d %H:%M");
    if self.fallback {
      format!(
        "A meal was delivered to: {}\nDate/time: {when}\nRegistered by: {}\n\
         The person has no email address on file.\n",
        self.person_name, self.registered_by,
      )
    } else {
      format!(
        "Hello {},\n\nYour meal delivery was registered on {when}.\n\
         Registered by: {}.\n\nIf this was not you, please contact the \
         administration.\n",
        self.person_name, self.registered_by,
      )
    }
  }
}

/// A transport's own error, kept opaque so this crate stays transport-free.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("notifications are not configured")]
  NotConfigured,

  #[error("invalid address")]
  Address(#[source] BoxError),

  #[error("failed to build message")]
  Build(#[source] BoxError),

  #[error("transport error")]
  Transport(#[source] BoxError),

  #[error("timed out")]
  TimedOut,
}

/// A best-effort sender for delivery notices.
pub trait Notifier: Send + Sync {
  fn notify<'a>(
    &'a self,
    notice: &'a DeliveryNotice,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;
}

/// Used when no transport is configured. Every attempt fails with
/// [`NotifyError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
  async fn notify(&self, _notice: &DeliveryNotice) -> Result<(), NotifyError> {
    Err(NotifyError::NotConfigured)
  }
}
