//! Parsed message type.

use chrono::{DateTime, SecondsFormat, Utc};

/// Structured fields extracted from one message.
///
/// Every field is optional; absent fields render as empty text.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ParsedMessage {
    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: Option<String>,

    /// Sender(s) as display text, e.g. `"Alice <alice@example.com>"`.
    pub from: Option<String>,

    /// Primary recipients as display text, joined with `", "`.
    pub to: Option<String>,

    /// Date from the `Date:` header.
    pub date: Option<DateTime<Utc>>,

    /// Plain-text body (from `text/plain`, or stripped from HTML).
    pub body_text: Option<String>,

    /// `true` when the structural parser gave up and only the
    /// best-effort fallback produced these fields.
    pub degraded: bool,
}

impl ParsedMessage {
    /// Subject, or `""` when absent.
    pub fn display_subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// Sender, or `""` when absent.
    pub fn display_from(&self) -> &str {
        self.from.as_deref().unwrap_or("")
    }

    /// Recipients, or `""` when absent.
    pub fn display_to(&self) -> &str {
        self.to.as_deref().unwrap_or("")
    }

    /// Date as ISO-8601 in UTC with millisecond precision
    /// (`2024-03-15T12:00:00.000Z`), or `""` when absent.
    pub fn display_date(&self) -> String {
        self.date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default()
    }

    /// Body text, or `""` when absent.
    pub fn body(&self) -> &str {
        self.body_text.as_deref().unwrap_or("")
    }
}
