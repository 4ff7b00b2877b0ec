//! In-memory outbox backing [`LocalMailer`](crate::providers::LocalMailer).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::email::Email;

/// A captured email with metadata.
#[derive(Debug, Clone)]
pub struct StoredEmail {
    /// Unique identifier, returned as the delivery's message id.
    pub id: String,
    pub email: Email,
    /// When the email was captured.
    pub sent_at: DateTime<Utc>,
}

/// Thread-safe outbox, kept in send order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    emails: RwLock<Vec<StoredEmail>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage wrapped in an Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Capture an email and return its ID.
    pub fn push(&self, email: Email) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.emails.write().push(StoredEmail {
            id: id.clone(),
            email,
            sent_at: Utc::now(),
        });
        id
    }

    pub fn get(&self, id: &str) -> Option<StoredEmail> {
        self.emails.read().iter().find(|e| e.id == id).cloned()
    }

    /// All captured emails, oldest first.
    pub fn all(&self) -> Vec<StoredEmail> {
        self.emails.read().clone()
    }

    /// The most recently captured email.
    pub fn last(&self) -> Option<StoredEmail> {
        self.emails.read().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.emails.read().len()
    }

    pub fn clear(&self) {
        self.emails.write().clear();
    }

    /// Remove and return all captured emails, oldest first.
    pub fn flush(&self) -> Vec<StoredEmail> {
        std::mem::take(&mut *self.emails.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_order() {
        let storage = MemoryStorage::new();
        storage.push(Email::new().subject("First"));
        let id = storage.push(Email::new().subject("Second"));

        let all = storage.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email.subject, "First");
        assert_eq!(all[1].email.subject, "Second");
        assert_eq!(storage.last().unwrap().id, id);
        assert_eq!(storage.get(&id).unwrap().email.subject, "Second");
    }

    #[test]
    fn test_flush_empties() {
        let storage = MemoryStorage::new();
        storage.push(Email::new().subject("One"));
        storage.push(Email::new().subject("Two"));

        let flushed = storage.flush();
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].email.subject, "One");
        assert_eq!(storage.count(), 0);
        assert!(storage.flush().is_empty());
    }
}
