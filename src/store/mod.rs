//! Persistence of templates, envelopes and the send log.
//!
//! The [`Dispatcher`](crate::Dispatcher) reads templates and envelopes and
//! appends to the send log; nothing else is part of the store contract.
//! Each append happens inside a [`LogTransaction`] covering one envelope's
//! send: the entry becomes durable on [`LogTransaction::commit`], and a
//! transaction dropped before commit is rolled back.
//!
//! Backends:
//!
//! - [`MemoryStore`]: in-process, for tests and dry runs
//! - [`SqliteStore`]: SQLite through sqlx (feature `sqlite`)

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Envelope, EnvelopeId, LogEntry, NewLogEntry, Template, TemplateId};

/// Storage backend used by the dispatcher.
#[async_trait]
pub trait MailingStore: Send + Sync {
    /// Look up a template by its unique code.
    async fn template_by_code(&self, code: &str) -> Result<Option<Template>, StoreError>;

    /// Envelopes of a template, in creation order.
    async fn envelopes_for(&self, template: TemplateId) -> Result<Vec<Envelope>, StoreError>;

    /// Whether the log already covers `(envelope, address)`.
    ///
    /// With `retry_errors`, only a successful entry counts; without it, any
    /// entry does.
    async fn is_satisfied(
        &self,
        envelope: EnvelopeId,
        address: &str,
        retry_errors: bool,
    ) -> Result<bool, StoreError>;

    /// Log entries of an envelope, oldest first.
    async fn log_entries(&self, envelope: EnvelopeId) -> Result<Vec<LogEntry>, StoreError>;

    /// Open the unit of work for one send.
    async fn begin(&self) -> Result<Box<dyn LogTransaction>, StoreError>;
}

/// Scoped unit of work around one send and its log entry.
#[async_trait]
pub trait LogTransaction: Send {
    /// Append an entry, visible to others once committed.
    async fn append(&mut self, entry: NewLogEntry) -> Result<LogEntry, StoreError>;

    /// Make the appended entries durable.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: MailingStore + ?Sized> MailingStore for std::sync::Arc<S> {
    async fn template_by_code(&self, code: &str) -> Result<Option<Template>, StoreError> {
        (**self).template_by_code(code).await
    }

    async fn envelopes_for(&self, template: TemplateId) -> Result<Vec<Envelope>, StoreError> {
        (**self).envelopes_for(template).await
    }

    async fn is_satisfied(
        &self,
        envelope: EnvelopeId,
        address: &str,
        retry_errors: bool,
    ) -> Result<bool, StoreError> {
        (**self).is_satisfied(envelope, address, retry_errors).await
    }

    async fn log_entries(&self, envelope: EnvelopeId) -> Result<Vec<LogEntry>, StoreError> {
        (**self).log_entries(envelope).await
    }

    async fn begin(&self) -> Result<Box<dyn LogTransaction>, StoreError> {
        (**self).begin().await
    }
}
