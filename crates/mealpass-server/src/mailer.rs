//! SMTP delivery of delivery notices.
//!
//! [`SmtpNotifier`] wraps the `lettre` async SMTP transport. When no relay is
//! configured the server runs with [`DisabledNotifier`] instead, via
//! [`ConfiguredNotifier`].

use lettre::{
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};
use mealpass_core::notify::{DeliveryNotice, DisabledNotifier, Notifier, NotifyError};

use crate::ServerConfig;

/// Connection settings for the SMTP relay.
#[derive(Clone)]
pub struct SmtpConfig {
  pub host:     String,
  pub port:     u16,
  pub from:     String,
  pub username: Option<String>,
  pub password: Option<String>,
}

/// Sends plain-text notices through a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpNotifier {
  from:      Mailbox,
  transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
  pub fn new(config: SmtpConfig) -> Result<Self, NotifyError> {
    let from: Mailbox = config
      .from
      .parse()
      .map_err(|e: lettre::address::AddressError| NotifyError::Address(e.into()))?;

    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
      .map_err(|e| NotifyError::Transport(e.into()))?
      .port(config.port);

    if let (Some(user), Some(pass)) = (config.username, config.password) {
      builder = builder.credentials(Credentials::new(user, pass));
    }

    Ok(Self { from, transport: builder.build() })
  }

  fn message(&self, notice: &DeliveryNotice) -> Result<Message, NotifyError> {
    let to: Mailbox = notice
      .to
      .parse()
      .map_err(|e: lettre::address::AddressError| NotifyError::Address(e.into()))?;

    Message::builder()
      .from(self.from.clone())
      .to(to)
      .subject(notice.subject())
      .header(ContentType::TEXT_PLAIN)
      .body(notice.text_body())
      .map_err(|e| NotifyError::Build(e.into()))
  }
}

impl Notifier for SmtpNotifier {
  async fn notify(&self, notice: &DeliveryNotice) -> Result<(), NotifyError> {
    let message = self.message(notice)?;
    self
      .transport
      .send(message)
      .await
      .map_err(|e| NotifyError::Transport(e.into()))?;

    tracing::info!(to = %notice.to, fallback = notice.fallback, "delivery notice sent");
    Ok(())
  }
}

/// The notifier chosen at startup from [`ServerConfig`].
#[derive(Clone)]
pub enum ConfiguredNotifier {
  Smtp(SmtpNotifier),
  Disabled(DisabledNotifier),
}

impl ConfiguredNotifier {
  pub fn from_config(config: &ServerConfig) -> Result<Self, NotifyError> {
    match config.smtp() {
      Some(smtp) => Ok(Self::Smtp(SmtpNotifier::new(smtp)?)),
      None => Ok(Self::Disabled(DisabledNotifier)),
    }
  }

  pub fn is_enabled(&self) -> bool { matches!(self, Self::Smtp(_)) }
}

impl Notifier for ConfiguredNotifier {
  async fn notify(&self, notice: &DeliveryNotice) -> Result<(), NotifyError> {
    match self {
      Self::Smtp(smtp) => smtp.notify(notice).await,
      Self::Disabled(disabled) => disabled.notify(notice).await,
    }
  }
}
