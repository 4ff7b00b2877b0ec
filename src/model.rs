//! Mailing records: templates, envelopes and send log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;
use crate::render;

/// Maximum length of a template code.
pub const TEMPLATE_CODE_MAX_LEN: usize = 8;

/// Identifier of a [`Template`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub i64);

/// Identifier of an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvelopeId(pub i64);

/// Identifier of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogEntryId(pub i64);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reusable email template.
///
/// The body is a template source rendered once per envelope; the subject is
/// sent as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    /// Unique short code used to select the template for a batch.
    pub code: String,
    pub subject: String,
    /// Template source of the body.
    pub body: String,
    /// Send the rendered body as `text/html` instead of `text/plain`.
    pub is_html: bool,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.code, self.subject)
    }
}

/// Fields for creating a [`Template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub code: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

impl NewTemplate {
    /// A plain-text template.
    pub fn new(code: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            subject: subject.into(),
            body: body.into(),
            is_html: false,
        }
    }

    /// Mark the body as HTML.
    pub fn html(mut self, is_html: bool) -> Self {
        self.is_html = is_html;
        self
    }

    /// Check the code and that the body parses as a template.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.code.is_empty() || self.code.chars().count() > TEMPLATE_CODE_MAX_LEN {
            return Err(StoreError::Invalid(format!(
                "template code must be 1 to {} characters: {:?}",
                TEMPLATE_CODE_MAX_LEN, self.code
            )));
        }
        render::validate_body(&self.body)
            .map_err(|e| StoreError::Invalid(format!("template {}: {}", self.code, e)))
    }
}

/// One message to send, tied to a template.
///
/// The recipient and render context live in a parameters record owned by the
/// embedding application, see [`EnvelopeParams`](crate::params::EnvelopeParams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub template: TemplateId,
}

/// One send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub envelope: EnvelopeId,
    /// Address the message was sent to.
    pub address: String,
    pub sent_at: DateTime<Utc>,
    /// Transport error, `None` on success.
    pub error: Option<String>,
}

impl LogEntry {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether this entry means `(envelope, address)` needs no further send.
    pub fn satisfies(&self, envelope: EnvelopeId, address: &str, retry_errors: bool) -> bool {
        self.envelope == envelope && self.address == address && (!retry_errors || self.is_success())
    }
}

/// A log entry not yet written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub envelope: EnvelopeId,
    pub address: String,
    pub sent_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl NewLogEntry {
    /// Entry for an attempt made now.
    pub fn new(envelope: EnvelopeId, address: impl Into<String>, error: Option<String>) -> Self {
        Self {
            envelope,
            address: address.into(),
            sent_at: Utc::now(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(error: Option<&str>) -> LogEntry {
        LogEntry {
            id: LogEntryId(1),
            envelope: EnvelopeId(3),
            address: "dest1@test.org".into(),
            sent_at: Utc::now(),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_successful_entry_satisfies_both_policies() {
        let ok = entry(None);
        assert!(ok.satisfies(EnvelopeId(3), "dest1@test.org", true));
        assert!(ok.satisfies(EnvelopeId(3), "dest1@test.org", false));
    }

    #[test]
    fn test_failed_entry_satisfies_only_without_retry() {
        let failed = entry(Some("connection refused"));
        assert!(!failed.satisfies(EnvelopeId(3), "dest1@test.org", true));
        assert!(failed.satisfies(EnvelopeId(3), "dest1@test.org", false));
    }

    #[test]
    fn test_address_and_envelope_are_part_of_the_key() {
        let ok = entry(None);
        assert!(!ok.satisfies(EnvelopeId(3), "other@test.org", true));
        assert!(!ok.satisfies(EnvelopeId(4), "dest1@test.org", false));
    }

    #[test]
    fn test_new_template_validation() {
        assert!(NewTemplate::new("mod_test", "s", "{{ nom_destinataire }}").validate().is_ok());
        assert!(NewTemplate::new("", "s", "").validate().is_err());
        assert!(NewTemplate::new("too_long_code", "s", "").validate().is_err());
        assert!(NewTemplate::new("mod_test", "s", "{{ broken").validate().is_err());
    }

    #[test]
    fn test_template_display() {
        let template = Template {
            id: TemplateId(1),
            code: "mod_test".into(),
            subject: "sujet_modele".into(),
            body: String::new(),
            is_html: false,
        };
        assert_eq!(template.to_string(), "mod_test / sujet_modele");
    }
}
