//! Mailer trait and delivery result types.
//!
//! `#[async_trait]` is used instead of native async traits because the
//! [`Dispatcher`](crate::Dispatcher) holds its transport as `Arc<dyn Mailer>`,
//! selected at runtime by [`mailer_from_env`](crate::config::mailer_from_env).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::error::MailError;

/// Result of a successful email delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the provider
    pub message_id: String,
}

impl DeliveryResult {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// Trait for email delivery providers.
///
/// # Example
///
/// ```ignore
/// use bulkmail::{Email, Mailer};
/// use bulkmail::providers::SmtpMailer;
///
/// let mailer = SmtpMailer::new("smtp.example.com", 587)
///     .credentials("user", "pass")
///     .build();
///
/// let result = mailer.deliver(&email).await?;
/// ```
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single email.
    ///
    /// Errors for which [`MailError::is_transport`] holds concern this message
    /// only; any other error means the mailer cannot send at all.
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError>;

    /// Get the provider name (for logging/debugging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}

#[async_trait]
impl<M: Mailer + ?Sized> Mailer for std::sync::Arc<M> {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        (**self).deliver(email).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

/// Check an email has the fields every provider needs.
pub fn validate(email: &Email) -> Result<(), MailError> {
    if email.from.is_none() {
        return Err(MailError::MissingField("from"));
    }
    if email.to.is_empty() {
        return Err(MailError::MissingField("to"));
    }
    Ok(())
}
