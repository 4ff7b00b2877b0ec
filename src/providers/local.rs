//! Local mailer for development and testing.
//!
//! Captures emails in memory instead of sending them, so a batch run can be
//! inspected afterwards.
//!
//! ```rust,ignore
//! use bulkmail::providers::LocalMailer;
//! use bulkmail::testing::*;
//!
//! let mailer = LocalMailer::new();
//! // ... run a batch with a dispatcher built on `mailer.clone()` ...
//! assert_email_count(&mailer, 1);
//! assert_email_to(&mailer, "dest1@test.org");
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{validate, DeliveryResult, Mailer};
use crate::storage::{MemoryStorage, StoredEmail};

/// Local mailer that stores emails in memory.
///
/// Clones share the same outbox and failure settings.
#[derive(Clone)]
pub struct LocalMailer {
    storage: Arc<MemoryStorage>,
    failures: Arc<RwLock<Failures>>,
}

#[derive(Default)]
struct Failures {
    /// Returned for every delivery.
    all: Option<MailError>,
    /// Returned for deliveries to one address, keyed lowercase.
    by_address: HashMap<String, MailError>,
}

impl LocalMailer {
    /// Create a new local mailer with fresh storage.
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::shared())
    }

    /// Create a local mailer with existing storage.
    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            failures: Arc::new(RwLock::new(Failures::default())),
        }
    }

    /// Get a reference to the underlying storage.
    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    // =========================================================================
    // Failure Simulation (for testing)
    // =========================================================================

    /// Fail every delivery with a transport error.
    ///
    /// ```rust,ignore
    /// mailer.set_failure("SMTP connection refused");
    /// ```
    pub fn set_failure(&self, message: impl Into<String>) {
        self.set_error(MailError::SendError(message.into()));
    }

    /// Fail every delivery with the given error.
    pub fn set_error(&self, error: MailError) {
        self.failures.write().all = Some(error);
    }

    /// Reject deliveries to one address, as a server refusing the recipient.
    pub fn reject_address(&self, address: &str, message: impl Into<String>) {
        self.failures.write().by_address.insert(
            address.to_ascii_lowercase(),
            MailError::provider("local", message),
        );
    }

    /// Clear all failure settings.
    pub fn clear_failure(&self) {
        let mut failures = self.failures.write();
        failures.all = None;
        failures.by_address.clear();
    }

    fn failure_for(&self, email: &Email) -> Option<MailError> {
        let failures = self.failures.read();
        if let Some(ref err) = failures.all {
            return Some(err.clone());
        }
        email
            .to
            .iter()
            .find_map(|addr| failures.by_address.get(&addr.email.to_ascii_lowercase()))
            .cloned()
    }

    // =========================================================================
    // Email Access (for testing assertions)
    // =========================================================================

    /// All captured emails, oldest first.
    pub fn emails(&self) -> Vec<StoredEmail> {
        self.storage.all()
    }

    /// The most recently sent email.
    pub fn last_email(&self) -> Option<StoredEmail> {
        self.storage.last()
    }

    pub fn email_count(&self) -> usize {
        self.storage.count()
    }

    pub fn has_emails(&self) -> bool {
        self.storage.count() > 0
    }

    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Remove and return all captured emails.
    pub fn flush(&self) -> Vec<StoredEmail> {
        self.storage.flush()
    }

    /// Check if an email was sent to a specific address.
    pub fn sent_to(&self, email: &str) -> bool {
        self.storage.all().iter().any(|stored| {
            stored
                .email
                .to
                .iter()
                .any(|addr| addr.email.eq_ignore_ascii_case(email))
        })
    }

    /// Find emails matching a predicate.
    pub fn find_emails<F>(&self, predicate: F) -> Vec<StoredEmail>
    where
        F: Fn(&Email) -> bool,
    {
        self.storage
            .all()
            .into_iter()
            .filter(|stored| predicate(&stored.email))
            .collect()
    }
}

impl Default for LocalMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        validate(email)?;
        if let Some(err) = self.failure_for(email) {
            return Err(err);
        }

        let message_id = self.storage.push(email.clone());
        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
