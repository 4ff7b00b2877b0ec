//! Batch configuration and environment-driven setup.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MAILING_PACING_SECONDS` | Delay after each successful send (default: 2) |
//! | `EMAIL_PROVIDER` | `smtp`, `local`, `logger`, `logger_full` |
//! | `SMTP_HOST` | SMTP server host |
//! | `SMTP_PORT` | SMTP server port (default: 587) |
//! | `SMTP_USERNAME` | SMTP username |
//! | `SMTP_PASSWORD` | SMTP password |

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::MailError;
use crate::links::LinkResolver;
use crate::mailer::Mailer;
use crate::providers;

/// Default delay after each successful send.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

/// Settings shared by every batch a [`Dispatcher`](crate::Dispatcher) runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MailingConfig {
    /// Delay after each successful send.
    pub pacing: Duration,
}

impl Default for MailingConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
        }
    }
}

impl MailingConfig {
    /// Read `MAILING_PACING_SECONDS`, falling back to the default when unset.
    pub fn from_env() -> Result<Self, MailError> {
        match env::var("MAILING_PACING_SECONDS") {
            Ok(value) => Ok(Self {
                pacing: parse_pacing(&value)?,
            }),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Set the pacing delay.
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

fn parse_pacing(value: &str) -> Result<Duration, MailError> {
    let seconds: f64 = value.trim().parse().map_err(|_| {
        MailError::Configuration(format!("MAILING_PACING_SECONDS is not a number: {}", value))
    })?;
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        MailError::Configuration(format!("MAILING_PACING_SECONDS out of range: {}", value))
    })
}

/// Per-batch options for [`Dispatcher::send`](crate::Dispatcher::send).
#[derive(Clone)]
pub struct SendOptions {
    /// Builds the `url` variable from the context's `token`.
    pub link_resolver: Option<Arc<dyn LinkResolver>>,
    /// Stop once this many messages were sent; `Some(0)` sends nothing.
    ///
    /// Failed sends do not count. Combined with `retry_errors`, envelopes that
    /// keep failing are attempted again on every run before the cap is
    /// reached, so each run logs one more error entry for each of them while
    /// still sending up to `max_count` other messages.
    pub max_count: Option<usize>,
    /// Retry envelopes whose last attempt for the current address failed.
    pub retry_errors: bool,
    /// Overrides [`MailingConfig::pacing`] for this batch.
    pub pacing: Option<Duration>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            link_resolver: None,
            max_count: None,
            retry_errors: true,
            pacing: None,
        }
    }
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("link_resolver", &self.link_resolver.is_some())
            .field("max_count", &self.max_count)
            .field("retry_errors", &self.retry_errors)
            .field("pacing", &self.pacing)
            .finish()
    }
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_resolver(mut self, resolver: impl LinkResolver + 'static) -> Self {
        self.link_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn max_count(mut self, max: usize) -> Self {
        self.max_count = Some(max);
        self
    }

    pub fn retry_errors(mut self, retry: bool) -> Self {
        self.retry_errors = retry;
        self
    }

    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }
}

/// Create a mailer from `EMAIL_PROVIDER` and the provider's variables.
///
/// Defaults to `smtp` when `SMTP_HOST` is set, otherwise fails: a batch job
/// should never silently fall back to a mailer that sends nothing.
pub fn mailer_from_env() -> Result<Arc<dyn Mailer>, MailError> {
    let provider = match env::var("EMAIL_PROVIDER") {
        Ok(p) => p.to_lowercase(),
        Err(_) if env::var("SMTP_HOST").is_ok() => {
            tracing::debug!(provider = "smtp", "Auto-detected email provider");
            "smtp".to_string()
        }
        Err(_) => return Err(MailError::NotConfigured),
    };

    match provider.as_str() {
        #[cfg(feature = "smtp")]
        "smtp" => {
            let host = env::var("SMTP_HOST")
                .map_err(|_| MailError::Configuration("SMTP_HOST not set".into()))?;
            let port: u16 = match env::var("SMTP_PORT") {
                Ok(port) => port
                    .parse()
                    .map_err(|_| MailError::Configuration(format!("Invalid SMTP_PORT: {}", port)))?,
                Err(_) => 587,
            };
            let mut builder = providers::SmtpMailer::new(&host, port);
            if let Ok(username) = env::var("SMTP_USERNAME") {
                let password = env::var("SMTP_PASSWORD").unwrap_or_default();
                builder = builder.credentials(&username, &password);
            }
            Ok(Arc::new(builder.build()))
        }
        #[cfg(not(feature = "smtp"))]
        "smtp" => Err(MailError::Configuration(
            "EMAIL_PROVIDER=smtp but 'smtp' feature is not enabled. \
            Add `features = [\"smtp\"]` to Cargo.toml"
                .into(),
        )),

        "local" => Ok(Arc::new(providers::LocalMailer::new())),
        "logger" => Ok(Arc::new(providers::LoggerMailer::new())),
        "logger_full" => Ok(Arc::new(providers::LoggerMailer::full())),

        _ => Err(MailError::Configuration(format!(
            "Unknown EMAIL_PROVIDER: {}. Valid providers are: smtp, local, logger, logger_full",
            provider
        ))),
    }
}
