//! Logger mailer that only logs emails.
//!
//! Useful for dry runs: every envelope is rendered and logged as sent without
//! anything leaving the process.

use async_trait::async_trait;

use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{validate, DeliveryResult, Mailer};

/// Logger mailer that emits tracing events for emails.
pub struct LoggerMailer {
    /// If true, also log the rendered body.
    log_full: bool,
}

impl LoggerMailer {
    /// Log recipient and subject only.
    pub fn new() -> Self {
        Self { log_full: false }
    }

    /// Also log headers and body.
    pub fn full() -> Self {
        Self { log_full: true }
    }
}

impl Default for LoggerMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LoggerMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        validate(email)?;
        let message_id = uuid::Uuid::new_v4().to_string();

        tracing::info!(
            message_id = %message_id,
            from = ?email.from.as_ref().map(|a| a.formatted()),
            to = ?email.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
            subject = %email.subject,
            subtype = %email.subtype,
            "Email logged"
        );
        if self.log_full {
            tracing::debug!(headers = ?email.headers, body = %email.body, "Email body");
        }

        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "logger"
    }
}
