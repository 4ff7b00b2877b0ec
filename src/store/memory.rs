//! In-process mailing store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{LogTransaction, MailingStore};
use crate::error::StoreError;
use crate::model::{
    Envelope, EnvelopeId, LogEntry, LogEntryId, NewLogEntry, NewTemplate, Template, TemplateId,
};

#[derive(Debug, Default)]
struct Tables {
    templates: Vec<Template>,
    envelopes: Vec<Envelope>,
    log: Vec<LogEntry>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Thread-safe in-memory store.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a template; the code must be unique.
    pub fn create_template(&self, new: NewTemplate) -> Result<Template, StoreError> {
        new.validate()?;
        let mut tables = self.tables.write();
        if tables.templates.iter().any(|t| t.code == new.code) {
            return Err(StoreError::Duplicate(format!("template code {}", new.code)));
        }
        let template = Template {
            id: TemplateId(tables.next_id()),
            code: new.code,
            subject: new.subject,
            body: new.body,
            is_html: new.is_html,
        };
        tables.templates.push(template.clone());
        Ok(template)
    }

    /// Create an envelope for an existing template.
    pub fn create_envelope(&self, template: TemplateId) -> Result<Envelope, StoreError> {
        let mut tables = self.tables.write();
        if !tables.templates.iter().any(|t| t.id == template) {
            return Err(StoreError::NotFound(format!("template {}", template)));
        }
        let envelope = Envelope {
            id: EnvelopeId(tables.next_id()),
            template,
        };
        tables.envelopes.push(envelope);
        Ok(envelope)
    }

    // =========================================================================
    // Fixtures (for testing)
    // =========================================================================

    /// Every committed log entry, oldest first.
    pub fn all_log_entries(&self) -> Vec<LogEntry> {
        self.tables.read().log.clone()
    }

    /// Overwrite an entry's error, as if its send had failed.
    pub fn mark_failed(&self, id: LogEntryId, error: impl Into<String>) -> bool {
        match self.tables.write().log.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.error = Some(error.into());
                true
            }
            None => false,
        }
    }

    /// Remove an entry, as if the log had been partially reset.
    pub fn delete_log_entry(&self, id: LogEntryId) -> bool {
        let mut tables = self.tables.write();
        let before = tables.log.len();
        tables.log.retain(|e| e.id != id);
        tables.log.len() != before
    }

    /// Make every log append fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MailingStore for MemoryStore {
    async fn template_by_code(&self, code: &str) -> Result<Option<Template>, StoreError> {
        Ok(self
            .tables
            .read()
            .templates
            .iter()
            .find(|t| t.code == code)
            .cloned())
    }

    async fn envelopes_for(&self, template: TemplateId) -> Result<Vec<Envelope>, StoreError> {
        Ok(self
            .tables
            .read()
            .envelopes
            .iter()
            .filter(|e| e.template == template)
            .copied()
            .collect())
    }

    async fn is_satisfied(
        &self,
        envelope: EnvelopeId,
        address: &str,
        retry_errors: bool,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .read()
            .log
            .iter()
            .any(|e| e.satisfies(envelope, address, retry_errors)))
    }

    async fn log_entries(&self, envelope: EnvelopeId) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .tables
            .read()
            .log
            .iter()
            .filter(|e| e.envelope == envelope)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn LogTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            pending: Vec::new(),
        }))
    }
}

/// Buffers appended entries until commit.
struct MemoryTransaction {
    store: MemoryStore,
    pending: Vec<LogEntry>,
}

#[async_trait]
impl LogTransaction for MemoryTransaction {
    async fn append(&mut self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        if self.store.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("log writes disabled".into()));
        }
        let mut tables = self.store.tables.write();
        if !tables.envelopes.iter().any(|e| e.id == entry.envelope) {
            return Err(StoreError::NotFound(format!("envelope {}", entry.envelope)));
        }
        let entry = LogEntry {
            id: LogEntryId(tables.next_id()),
            envelope: entry.envelope,
            address: entry.address,
            sent_at: entry.sent_at,
            error: entry.error,
        };
        self.pending.push(entry.clone());
        Ok(entry)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { store, pending } = *self;
        store.tables.write().log.extend(pending);
        Ok(())
    }
}
