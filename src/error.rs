//! Error types for bulkmail.

use thiserror::Error;

use crate::model::EnvelopeId;

/// Errors raised by a [`Mailer`](crate::Mailer) while building or sending a message.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// Email provider is not configured.
    #[error("Email provider not configured")]
    NotConfigured,

    /// Configuration error (missing env var, invalid value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing required field (e.g., from address).
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Error building the email message.
    #[error("Build error: {0}")]
    BuildError(String),

    /// Error sending the email (connection refused, timeout, ...).
    #[error("Send error: {0}")]
    SendError(String),

    /// The remote server rejected the message.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: &'static str,
        message: String,
        /// SMTP reply code, when the server gave one.
        code: Option<u16>,
    },
}

impl MailError {
    /// Create a provider rejection.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            code: None,
        }
    }

    /// Create a provider rejection carrying the server's reply code.
    pub fn provider_with_code(provider: &'static str, message: impl Into<String>, code: u16) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            code: Some(code),
        }
    }

    /// Whether this is a transport-level failure for a single message.
    ///
    /// Transport failures are recorded in the send log and the batch moves on.
    /// Everything else means the mailer itself is unusable and aborts the batch.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::SendError(_) | Self::ProviderError { .. } | Self::InvalidAddress(_)
        )
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::BuildError(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        match err.status() {
            Some(code) => Self::provider_with_code("smtp", err.to_string(), code_to_u16(code)),
            None => Self::SendError(err.to_string()),
        }
    }
}

#[cfg(feature = "smtp")]
fn code_to_u16(code: lettre::transport::smtp::response::Code) -> u16 {
    code.to_string().parse().unwrap_or(0)
}

#[cfg(feature = "smtp")]
impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

/// Errors from a [`MailingStore`](crate::store::MailingStore) backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A unique key already exists (template code).
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// A referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record failed validation before reaching the backend.
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// The backend refused or failed the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            sqlx::Error::RowNotFound => Self::NotFound("no rows returned".into()),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Errors from an [`EnvelopeParams`](crate::params::EnvelopeParams) provider.
#[derive(Debug, Clone, Error)]
pub enum ParamsError {
    /// No parameters record exists for the envelope.
    #[error("Parameters unavailable for envelope {0}")]
    Unavailable(EnvelopeId),
}

/// Errors that abort a [`Dispatcher::send`](crate::Dispatcher::send) batch.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No template with the requested code.
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// The dispatcher was built without a required collaborator.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An envelope's address or context could not be resolved.
    #[error(transparent)]
    Params(#[from] ParamsError),

    /// Reading templates/envelopes or writing the send log failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The template body failed to parse or render.
    #[error("Template error: {0}")]
    Template(String),

    /// The mailer failed for a reason other than delivering one message.
    #[error(transparent)]
    Mail(#[from] MailError),
}

impl From<minijinja::Error> for DispatchError {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}
