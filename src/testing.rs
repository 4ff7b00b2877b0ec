//! Testing utilities and assertion helpers.
//!
//! Assertions run against a [`LocalMailer`] the dispatcher under test sends
//! through. "Last email" means the most recently sent one.
//!
//! ```rust,ignore
//! use bulkmail::providers::LocalMailer;
//! use bulkmail::testing::*;
//!
//! let mailer = LocalMailer::new();
//! // ... run a batch ...
//! assert_email_count(&mailer, 1);
//! assert_email_to(&mailer, "dest1@test.org");
//! assert_email_body_matches(&mailer, r"^nom dest1http://example\.com/acces/\w{32}$");
//! assert_bulk_header(&mailer);
//! ```

use regex::Regex;

use crate::email::{ContentSubtype, PRECEDENCE_HEADER};
use crate::providers::LocalMailer;
use crate::storage::StoredEmail;

// ============================================================================
// Helper Functions
// ============================================================================

/// Format a list of emails for error messages.
fn format_email_summary(emails: &[StoredEmail]) -> String {
    if emails.is_empty() {
        return "  (no emails sent)".to_string();
    }

    emails
        .iter()
        .enumerate()
        .map(|(i, stored)| {
            let e = &stored.email;
            let to = e
                .to
                .iter()
                .map(|a| a.email.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {}. To: [{}], Subject: \"{}\"", i + 1, to, e.subject)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn last_sent(mailer: &LocalMailer) -> StoredEmail {
    mailer
        .last_email()
        .expect("Expected at least one email to be sent, but none were sent")
}

// ============================================================================
// Counts
// ============================================================================

/// Assert that no emails were sent.
///
/// # Panics
///
/// Panics if any email was sent.
pub fn assert_no_emails_sent(mailer: &LocalMailer) {
    let emails = mailer.emails();
    assert!(
        emails.is_empty(),
        "Expected no emails to be sent, but {} were sent.\n\nEmails sent:\n{}",
        emails.len(),
        format_email_summary(&emails)
    );
}

/// Assert that exactly N emails were sent.
///
/// # Panics
///
/// Panics if the count doesn't match.
pub fn assert_email_count(mailer: &LocalMailer, expected: usize) {
    let actual = mailer.email_count();
    assert!(
        actual == expected,
        "Expected {} email(s) to be sent, but {} were sent.\n\nEmails sent:\n{}",
        expected,
        actual,
        format_email_summary(&mailer.emails())
    );
}

/// Assert that exactly N emails were sent to an address.
pub fn assert_email_count_to(mailer: &LocalMailer, email: &str, expected: usize) {
    let actual = get_emails_to(mailer, email).len();
    assert!(
        actual == expected,
        "Expected {} email(s) to {}, but {} were sent.\n\nEmails sent:\n{}",
        expected,
        email,
        actual,
        format_email_summary(&mailer.emails())
    );
}

// ============================================================================
// Recipients
// ============================================================================

/// Assert that an email was sent to a specific address.
///
/// # Panics
///
/// Panics if no email was sent to the address.
pub fn assert_email_to(mailer: &LocalMailer, email: &str) {
    assert!(
        mailer.sent_to(email),
        "Expected an email to {}, but none was sent.\n\nEmails sent:\n{}",
        email,
        format_email_summary(&mailer.emails())
    );
}

/// Assert that no email was sent to a specific address.
pub fn refute_email_to(mailer: &LocalMailer, email: &str) {
    let matching = get_emails_to(mailer, email);
    assert!(
        matching.is_empty(),
        "Expected no email to {}, but {} were sent.\n\nMatching emails:\n{}",
        email,
        matching.len(),
        format_email_summary(&matching)
    );
}

/// All emails sent to an address, oldest first.
pub fn get_emails_to(mailer: &LocalMailer, email: &str) -> Vec<StoredEmail> {
    mailer.find_emails(|e| e.to.iter().any(|a| a.email.eq_ignore_ascii_case(email)))
}

// ============================================================================
// Last Email
// ============================================================================

/// Assert the last email's body equals `expected`.
pub fn assert_email_body(mailer: &LocalMailer, expected: &str) {
    let last = last_sent(mailer);
    assert!(
        last.email.body == expected,
        "Expected body {:?}, but was {:?}.\n\nLast email:\n{}",
        expected,
        last.email.body,
        format_email_summary(&[last.clone()])
    );
}

/// Assert the last email's body matches a regex pattern.
///
/// # Panics
///
/// Panics if no email was sent, the pattern is invalid or the body doesn't match.
pub fn assert_email_body_matches(mailer: &LocalMailer, pattern: &str) {
    let last = last_sent(mailer);
    let re = Regex::new(pattern).expect("Invalid regex pattern");
    let body = &last.email.body;

    assert!(
        re.is_match(body),
        "Expected body to match pattern '{}', but it didn't.\n\nLast email:\n{}\n\nBody (first 500 chars):\n{}",
        pattern,
        format_email_summary(&[last.clone()]),
        body.chars().take(500).collect::<String>()
    );
}

/// Assert the last email was sent as `text/<subtype>`.
pub fn assert_email_subtype(mailer: &LocalMailer, subtype: ContentSubtype) {
    let last = last_sent(mailer);
    assert!(
        last.email.subtype == subtype,
        "Expected content subtype {}, but was {}",
        subtype,
        last.email.subtype
    );
}

/// Assert the last email carries the `Precedence: bulk` header.
pub fn assert_bulk_header(mailer: &LocalMailer) {
    let last = last_sent(mailer);
    let value = last.email.headers.get(PRECEDENCE_HEADER);
    assert!(
        value.map(String::as_str) == Some("bulk"),
        "Expected header {}: bulk, but was {:?}",
        PRECEDENCE_HEADER,
        value
    );
}

/// Remove and return all sent emails, for multi-phase tests.
pub fn flush_emails(mailer: &LocalMailer) -> Vec<StoredEmail> {
    mailer.flush()
}
