//! Email address type with optional display name.

use crate::error::MailError;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An email address with an optional display name.
///
/// ```
/// use bulkmail::Address;
///
/// let addr: Address = "dest1@test.org".into();
/// assert_eq!(addr.email, "dest1@test.org");
///
/// let addr: Address = ("Mailing", "noreply@test.org").into();
/// assert_eq!(addr.formatted(), "Mailing <noreply@test.org>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Optional display name.
    pub name: Option<String>,
    /// Bare address.
    pub email: String,
}

impl Address {
    /// Create an address without validating it.
    ///
    /// Addresses resolved from parameters records are taken as-is; a bad one
    /// surfaces as a transport error that is written to the send log.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        if email.is_empty() || !email.contains('@') {
            tracing::warn!(email = %email, "Creating address with potentially invalid email");
        }
        Self { name: None, email }
    }

    /// Create an address with a display name.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(email)
        }
    }

    /// Parse and validate an address (RFC 5322).
    pub fn parse(email: &str) -> Result<Self, MailError> {
        if !EmailAddress::is_valid(email) {
            return Err(MailError::InvalidAddress(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        Ok(Self {
            name: None,
            email: email.to_string(),
        })
    }

    /// `Name <email>` or just `email`.
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

impl From<&String> for Address {
    fn from(email: &String) -> Self {
        Self::new(email.as_str())
    }
}

impl<N: Into<String>, E: Into<String>> From<(N, E)> for Address {
    fn from((name, email): (N, E)) -> Self {
        Self::with_name(name, email)
    }
}

/// Conversion into an [`Address`], for use with [`Email`](crate::Email) builders.
pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl ToAddress for Address {
    fn to_address(&self) -> Address {
        self.clone()
    }
}

impl ToAddress for &Address {
    fn to_address(&self) -> Address {
        (*self).clone()
    }
}

impl ToAddress for &str {
    fn to_address(&self) -> Address {
        Address::new(*self)
    }
}

impl ToAddress for String {
    fn to_address(&self) -> Address {
        Address::new(self.as_str())
    }
}

impl ToAddress for &String {
    fn to_address(&self) -> Address {
        Address::new(self.as_str())
    }
}

impl<N: AsRef<str>, E: AsRef<str>> ToAddress for (N, E) {
    fn to_address(&self) -> Address {
        Address::with_name(self.0.as_ref(), self.1.as_ref())
    }
}
