//! Email provider implementations.
//!
//! Each provider implements the [`Mailer`](crate::Mailer) trait.
//!
//! | Provider | Feature Flag | Description |
//! |----------|-------------|-------------|
//! | [`SmtpMailer`] | `smtp` | SMTP via lettre |
//! | [`LocalMailer`] | (none) | In-memory outbox for dev/testing |
//! | [`LoggerMailer`] | (none) | Logs emails without storing |

#[cfg(feature = "smtp")]
mod smtp;
#[cfg(feature = "smtp")]
pub use smtp::{SmtpBuilder, SmtpMailer, TlsMode};

mod local;
pub use local::LocalMailer;

mod logger;
pub use logger::LoggerMailer;
