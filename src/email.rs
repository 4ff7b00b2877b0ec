//! Outgoing message with builder pattern.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::address::{Address, ToAddress};

/// Header marking a message as bulk mail.
pub const PRECEDENCE_HEADER: &str = "Precedence";

/// `MIME` subtype of the body, under `text/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSubtype {
    #[default]
    Plain,
    Html,
}

impl ContentSubtype {
    /// `html` when the template body is HTML, `plain` otherwise.
    pub fn from_html_flag(is_html: bool) -> Self {
        if is_html {
            Self::Html
        } else {
            Self::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Html => "html",
        }
    }

    /// Full `Content-Type` value.
    pub fn content_type(&self) -> String {
        format!("text/{}; charset=utf-8", self.as_str())
    }
}

impl fmt::Display for ContentSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An email message.
///
/// ```
/// use bulkmail::{ContentSubtype, Email};
///
/// let email = Email::new()
///     .from("expediteur@test.org")
///     .to("dest1@test.org")
///     .subject("Hello!")
///     .body("<p>Hi</p>")
///     .subtype(ContentSubtype::Html)
///     .bulk();
///
/// assert_eq!(email.headers.get("Precedence").map(String::as_str), Some("bulk"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Sender address
    pub from: Option<Address>,
    /// Recipients
    pub to: Vec<Address>,
    pub subject: String,
    pub body: String,
    /// How `body` is labelled on the wire.
    pub subtype: ContentSubtype,
    /// Custom headers
    pub headers: BTreeMap<String, String>,
}

impl Email {
    /// Create a new empty email.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender address.
    pub fn from(mut self, addr: impl ToAddress) -> Self {
        self.from = Some(addr.to_address());
        self
    }

    /// Add a recipient.
    pub fn to(mut self, addr: impl ToAddress) -> Self {
        self.to.push(addr.to_address());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the body's content subtype.
    pub fn subtype(mut self, subtype: ContentSubtype) -> Self {
        self.subtype = subtype;
        self
    }

    /// Add a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Mark as bulk mail (`Precedence: bulk`).
    pub fn bulk(self) -> Self {
        self.header(PRECEDENCE_HEADER, "bulk")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let email = Email::new()
            .from("sender@example.com")
            .to("recipient@example.com")
            .subject("Test")
            .body("Hello");

        assert_eq!(email.from.unwrap().email, "sender@example.com");
        assert_eq!(email.to.len(), 1);
        assert_eq!(email.to[0].email, "recipient@example.com");
        assert_eq!(email.subject, "Test");
        assert_eq!(email.body, "Hello");
        assert_eq!(email.subtype, ContentSubtype::Plain);
    }

    #[test]
    fn test_subtype_from_flag() {
        assert_eq!(ContentSubtype::from_html_flag(true), ContentSubtype::Html);
        assert_eq!(ContentSubtype::from_html_flag(false), ContentSubtype::Plain);
        assert_eq!(ContentSubtype::Html.content_type(), "text/html; charset=utf-8");
    }

    #[test]
    fn test_bulk_header() {
        let email = Email::new().bulk();
        assert_eq!(email.headers.get(PRECEDENCE_HEADER), Some(&"bulk".to_string()));
    }
}
