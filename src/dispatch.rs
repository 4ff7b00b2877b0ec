//! The batch send loop.
//!
//! A batch walks every envelope of one template in creation order. For each
//! envelope it resolves the recipient, skips it when the send log already
//! covers that recipient, and otherwise renders, sends and logs the message
//! in one [`LogTransaction`](crate::store::LogTransaction).
//!
//! Re-running the same batch only mails what is still pending: envelopes
//! never attempted, envelopes whose last attempt failed (unless
//! `retry_errors` is off) and envelopes whose recipient address changed.
//!
//! ```rust,ignore
//! use bulkmail::{Dispatcher, MailingConfig, SendOptions};
//! use bulkmail::links::SiteLinks;
//!
//! let dispatcher = Dispatcher::builder()
//!     .store(store)
//!     .mailer(bulkmail::config::mailer_from_env()?)
//!     .params(my_params)
//!     .config(MailingConfig::from_env()?)
//!     .build()?;
//!
//! let options = SendOptions::new()
//!     .link_resolver(SiteLinks::new("example.com", "/acces/{token}"))
//!     .max_count(500);
//!
//! let report = dispatcher.send("welcome", "noreply@example.com", &options).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::address::{Address, ToAddress};
use crate::config::{MailingConfig, SendOptions};
use crate::email::Email;
use crate::error::DispatchError;
use crate::mailer::Mailer;
use crate::model::{Envelope, NewLogEntry, Template};
use crate::params::EnvelopeParams;
use crate::render;
use crate::store::MailingStore;

/// Counts from one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages delivered.
    pub sent: usize,
    /// Messages whose delivery failed and was logged with an error.
    pub failed: usize,
    /// Envelopes already covered by the send log.
    pub skipped: usize,
}

impl DispatchReport {
    /// Envelopes a send was attempted for.
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Runs send batches against a store, a mailer and a parameters provider.
pub struct Dispatcher {
    store: Arc<dyn MailingStore>,
    mailer: Arc<dyn Mailer>,
    params: Arc<dyn EnvelopeParams>,
    config: MailingConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn config(&self) -> &MailingConfig {
        &self.config
    }

    /// Send every pending envelope of the template `template_code` from `from`.
    ///
    /// The sender is checked before any envelope is touched. Delivery
    /// failures are logged and the batch continues. Any other error stops the
    /// batch; envelopes logged before it stay logged.
    pub async fn send(
        &self,
        template_code: &str,
        from: impl ToAddress,
        options: &SendOptions,
    ) -> Result<DispatchReport, DispatchError> {
        let from = from.to_address();
        let span = tracing::info_span!(
            "bulkmail.send",
            template = template_code,
            provider = self.mailer.provider_name(),
            from = %from.email,
        );

        async {
            let result = self.run(template_code, &from, options).await;
            match &result {
                Ok(report) => tracing::info!(
                    sent = report.sent,
                    failed = report.failed,
                    skipped = report.skipped,
                    "Batch finished"
                ),
                Err(e) => tracing::error!(error = %e, "Batch aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        template_code: &str,
        from: &Address,
        options: &SendOptions,
    ) -> Result<DispatchReport, DispatchError> {
        Address::parse(&from.email)
            .map_err(|e| DispatchError::Configuration(format!("sender: {}", e)))?;

        let template = self
            .store
            .template_by_code(template_code)
            .await?
            .ok_or_else(|| DispatchError::UnknownTemplate(template_code.to_string()))?;
        let envelopes = self.store.envelopes_for(template.id).await?;
        let pacing = options.pacing.unwrap_or(self.config.pacing);

        tracing::debug!(envelopes = envelopes.len(), "Starting batch");

        let mut report = DispatchReport::default();
        for envelope in &envelopes {
            if options.max_count.is_some_and(|max| report.sent >= max) {
                tracing::info!(sent = report.sent, "Send limit reached");
                break;
            }

            let address = self.params.address(envelope).await?;

            if self
                .store
                .is_satisfied(envelope.id, &address, options.retry_errors)
                .await?
            {
                tracing::debug!(envelope = %envelope.id, address = %address, "Already sent, skipping");
                report.skipped += 1;
                #[cfg(feature = "metrics")]
                metrics::counter!("bulkmail_skipped_total").increment(1);
                continue;
            }

            let email = self
                .compose(&template, envelope, from, &address, options)
                .await?;

            match self.deliver_and_log(envelope, &address, &email).await? {
                None => {
                    report.sent += 1;
                    pause(pacing).await;
                }
                Some(_) => report.failed += 1,
            }
        }

        Ok(report)
    }

    /// Render the envelope's message.
    async fn compose(
        &self,
        template: &Template,
        envelope: &Envelope,
        from: &Address,
        address: &str,
        options: &SendOptions,
    ) -> Result<Email, DispatchError> {
        let mut context = self.params.context(envelope).await?;
        render::inject_url(&mut context, options.link_resolver.as_deref());
        let body = render::render_body(&template.body, template.is_html, &context)?;
        Ok(render::build_email(template, body, from, address))
    }

    /// Send one message and log the attempt in a single unit of work.
    ///
    /// Returns the logged error, `None` on success.
    async fn deliver_and_log(
        &self,
        envelope: &Envelope,
        address: &str,
        email: &Email,
    ) -> Result<Option<String>, DispatchError> {
        let mut tx = self.store.begin().await?;

        let error = match self.mailer.deliver(email).await {
            Ok(result) => {
                tracing::info!(
                    envelope = %envelope.id,
                    address = %address,
                    message_id = %result.message_id,
                    "Email sent"
                );
                None
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(envelope = %envelope.id, address = %address, error = %e, "Email delivery failed");
                Some(e.to_string())
            }
            // `tx` is dropped uncommitted
            Err(e) => return Err(e.into()),
        };

        #[cfg(feature = "metrics")]
        {
            let status = if error.is_none() { "success" } else { "error" };
            metrics::counter!("bulkmail_messages_total", "status" => status).increment(1);
        }

        tx.append(NewLogEntry::new(envelope.id, address, error.clone()))
            .await?;
        tx.commit().await?;

        Ok(error)
    }
}

async fn pause(pacing: Duration) {
    if !pacing.is_zero() {
        tokio::time::sleep(pacing).await;
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    store: Option<Arc<dyn MailingStore>>,
    mailer: Option<Arc<dyn Mailer>>,
    params: Option<Arc<dyn EnvelopeParams>>,
    config: MailingConfig,
}

impl DispatcherBuilder {
    pub fn store(mut self, store: impl MailingStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn mailer(mut self, mailer: impl Mailer + 'static) -> Self {
        self.mailer = Some(Arc::new(mailer));
        self
    }

    pub fn params(mut self, params: impl EnvelopeParams + 'static) -> Self {
        self.params = Some(Arc::new(params));
        self
    }

    pub fn config(mut self, config: MailingConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails when the store, mailer or parameters provider is missing.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        Ok(Dispatcher {
            store: self
                .store
                .ok_or_else(|| DispatchError::Configuration("no mailing store configured".into()))?,
            mailer: self
                .mailer
                .ok_or_else(|| DispatchError::Configuration("no mailer configured".into()))?,
            params: self.params.ok_or_else(|| {
                DispatchError::Configuration("no envelope parameters provider configured".into())
            })?,
            config: self.config,
        })
    }
}
