//! # bulkmail
//!
//! Template-driven bulk mailing with a send log that makes batches safe to
//! re-run.
//!
//! A [`Template`] holds a subject and a body template. Each [`Envelope`] is one
//! message to send with that template; its recipient and render variables come
//! from the embedding application through [`EnvelopeParams`]. The
//! [`Dispatcher`] renders and sends every envelope and appends one
//! [`LogEntry`] per attempt. Running the same batch again only sends what is
//! still pending:
//!
//! - envelopes never attempted
//! - envelopes whose last attempt failed (unless `retry_errors` is off)
//! - envelopes whose recipient address changed since it was mailed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulkmail::prelude::*;
//! use bulkmail::links::SiteLinks;
//!
//! let store = MemoryStore::new();
//! let template = store.create_template(NewTemplate::new(
//!     "welcome",
//!     "Welcome!",
//!     "Hello {{ name }}, your link: {{ url }}",
//! ))?;
//!
//! let params = MapParams::new();
//! let envelope = store.create_envelope(template.id)?;
//! params.insert(envelope.id, Params::new("user@example.com").var("name", "Alice").with_token());
//!
//! let dispatcher = Dispatcher::builder()
//!     .store(store)
//!     .mailer(bulkmail::config::mailer_from_env()?)
//!     .params(params)
//!     .config(MailingConfig::from_env()?)
//!     .build()?;
//!
//! let options = SendOptions::new().link_resolver(SiteLinks::new("example.com", "/access/{token}"));
//! dispatcher.send("welcome", "noreply@example.com", &options).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `smtp` - SMTP provider via lettre
//! - `sqlite` - SQLite store via sqlx
//! - `local` - assertion helpers for [`LocalMailer`](providers::LocalMailer) (default)
//! - `metrics` - Prometheus-style metrics (counters)
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `bulkmail_messages_total` | Counter | status | Send attempts |
//! | `bulkmail_skipped_total` | Counter | | Envelopes already covered by the send log |

/// The version of the bulkmail crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod dispatch;
mod email;
mod error;
mod mailer;
mod storage;

pub mod config;
pub mod links;
pub mod model;
pub mod params;
pub mod providers;
pub mod render;
pub mod store;

#[cfg(feature = "local")]
pub mod testing;

// Re-exports
pub use address::{Address, ToAddress};
pub use config::{MailingConfig, SendOptions};
pub use dispatch::{DispatchReport, Dispatcher, DispatcherBuilder};
pub use email::{ContentSubtype, Email, PRECEDENCE_HEADER};
pub use error::{DispatchError, MailError, ParamsError, StoreError};
pub use mailer::{DeliveryResult, Mailer};
pub use model::{Envelope, EnvelopeId, LogEntry, LogEntryId, NewTemplate, Template, TemplateId};
pub use params::{Context, EnvelopeParams};
pub use storage::{MemoryStorage, StoredEmail};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::params::{MapParams, Params};
    pub use crate::providers::LocalMailer;
    pub use crate::store::{MailingStore, MemoryStore};
    pub use crate::{
        Address, DispatchError, DispatchReport, Dispatcher, Email, EnvelopeParams, MailError,
        Mailer, MailingConfig, NewTemplate, SendOptions,
    };
}
