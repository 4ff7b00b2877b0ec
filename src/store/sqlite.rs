//! SQLite mailing store on sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;

use super::{LogTransaction, MailingStore};
use crate::error::StoreError;
use crate::model::{
    Envelope, EnvelopeId, LogEntry, LogEntryId, NewLogEntry, NewTemplate, Template, TemplateId,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS mailing_template (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        is_html INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS mailing_envelope (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id INTEGER NOT NULL REFERENCES mailing_template (id)
    )",
    "CREATE INDEX IF NOT EXISTS mailing_envelope_template
        ON mailing_envelope (template_id)",
    "CREATE TABLE IF NOT EXISTS mailing_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        envelope_id INTEGER NOT NULL REFERENCES mailing_envelope (id),
        address TEXT NOT NULL,
        sent_at TEXT NOT NULL,
        error TEXT
    )",
    "CREATE INDEX IF NOT EXISTS mailing_log_envelope_address
        ON mailing_log (envelope_id, address)",
];

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) a database and ensure the schema exists.
    #[tracing::instrument(skip_all)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::try_new(pool).await
    }

    /// A private in-memory database.
    ///
    /// Limited to one connection that is never recycled, since every SQLite
    /// connection to `:memory:` opens a separate database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::try_new(pool).await
    }

    /// Wrap an existing pool and ensure the schema exists.
    pub async fn try_new(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the mailing tables if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.iter().copied() {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a template; the code must be unique.
    pub async fn create_template(&self, new: NewTemplate) -> Result<Template, StoreError> {
        new.validate()?;
        let id = sqlx::query(
            "INSERT INTO mailing_template (code, subject, body, is_html) VALUES (?, ?, ?, ?)",
        )
        .bind(&new.code)
        .bind(&new.subject)
        .bind(&new.body)
        .bind(new.is_html as i64)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Template {
            id: TemplateId(id),
            code: new.code,
            subject: new.subject,
            body: new.body,
            is_html: new.is_html,
        })
    }

    /// Create an envelope for an existing template.
    pub async fn create_envelope(&self, template: TemplateId) -> Result<Envelope, StoreError> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mailing_template WHERE id = ?")
            .bind(template.0)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(StoreError::NotFound(format!("template {}", template)));
        }

        let id = sqlx::query("INSERT INTO mailing_envelope (template_id) VALUES (?)")
            .bind(template.0)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Envelope {
            id: EnvelopeId(id),
            template,
        })
    }
}

fn template_from_row(row: &SqliteRow) -> Result<Template, StoreError> {
    let is_html: i64 = row.try_get("is_html")?;
    Ok(Template {
        id: TemplateId(row.try_get("id")?),
        code: row.try_get("code")?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        is_html: is_html != 0,
    })
}

fn log_entry_from_row(row: &SqliteRow) -> Result<LogEntry, StoreError> {
    let sent_at: String = row.try_get("sent_at")?;
    let sent_at = DateTime::parse_from_rfc3339(&sent_at)
        .map_err(|e| StoreError::Backend(format!("invalid sent_at {:?}: {}", sent_at, e)))?
        .with_timezone(&Utc);
    Ok(LogEntry {
        id: LogEntryId(row.try_get("id")?),
        envelope: EnvelopeId(row.try_get("envelope_id")?),
        address: row.try_get("address")?,
        sent_at,
        error: row.try_get("error")?,
    })
}

#[async_trait]
impl MailingStore for SqliteStore {
    async fn template_by_code(&self, code: &str) -> Result<Option<Template>, StoreError> {
        let row = sqlx::query(
            "SELECT id, code, subject, body, is_html FROM mailing_template WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(template_from_row).transpose()
    }

    async fn envelopes_for(&self, template: TemplateId) -> Result<Vec<Envelope>, StoreError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM mailing_envelope WHERE template_id = ? ORDER BY id")
                .bind(template.0)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids
            .into_iter()
            .map(|id| Envelope {
                id: EnvelopeId(id),
                template,
            })
            .collect())
    }

    async fn is_satisfied(
        &self,
        envelope: EnvelopeId,
        address: &str,
        retry_errors: bool,
    ) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mailing_log
             WHERE envelope_id = ? AND address = ? AND (? = 0 OR error IS NULL)",
        )
        .bind(envelope.0)
        .bind(address)
        .bind(retry_errors as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn log_entries(&self, envelope: EnvelopeId) -> Result<Vec<LogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, envelope_id, address, sent_at, error FROM mailing_log
             WHERE envelope_id = ? ORDER BY id",
        )
        .bind(envelope.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(log_entry_from_row).collect()
    }

    async fn begin(&self) -> Result<Box<dyn LogTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// A database transaction; rolled back by sqlx when dropped uncommitted.
struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LogTransaction for SqliteTransaction {
    async fn append(&mut self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        let id = sqlx::query(
            "INSERT INTO mailing_log (envelope_id, address, sent_at, error) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.envelope.0)
        .bind(&entry.address)
        .bind(entry.sent_at.to_rfc3339())
        .bind(&entry.error)
        .execute(&mut *self.tx)
        .await?
        .last_insert_rowid();

        Ok(LogEntry {
            id: LogEntryId(id),
            envelope: entry.envelope,
            address: entry.address,
            sent_at: entry.sent_at,
            error: entry.error,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
