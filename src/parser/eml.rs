//! Parser for individual `.eml` files (RFC 5322 messages without MBOX framing).

use std::path::Path;

use mail_parser::{Address, MessageParser};
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};
use crate::model::message::ParsedMessage;
use crate::parser::{header, mime};

/// Read and parse a single `.eml` file.
///
/// Only reading can fail; unparseable content degrades to a best-effort
/// [`ParsedMessage`].
pub fn read_message(path: impl AsRef<Path>) -> Result<ParsedMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| ConvertError::read(path, e))?;
    let msg = parse_message(&data);
    if msg.degraded {
        warn!(path = %path.display(), "Message could not be fully parsed, using fallback");
    }
    Ok(msg)
}

/// Parse raw message bytes into a [`ParsedMessage`]. Never fails.
pub fn parse_message(raw: &[u8]) -> ParsedMessage {
    let data = mime::skip_from_line(raw);

    let Some(msg) = MessageParser::default().parse(data) else {
        debug!(len = data.len(), "mail-parser rejected message");
        return parse_fallback(data);
    };

    let date = msg
        .date()
        .and_then(|d| chrono::DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
        .map(|d| d.with_timezone(&chrono::Utc))
        .or_else(|| msg.header_raw("Date").and_then(header::parse_date));

    ParsedMessage {
        subject: non_empty(msg.subject()),
        from: msg.from().and_then(address_text),
        to: msg.to().and_then(address_text),
        date,
        body_text: mime::extract_body_text(&msg).filter(|b| !b.is_empty()),
        degraded: false,
    }
}

/// Return the subject of a message file, for display before conversion.
pub fn prefetch_subject(path: impl AsRef<Path>) -> Result<Option<String>> {
    Ok(read_message(path)?.subject)
}

/// Best-effort parse: hand-decoded headers and the raw text after the first
/// blank line.
fn parse_fallback(data: &[u8]) -> ParsedMessage {
    let (headers, body) = mime::split_header_body(data);
    let fields = header::parse_header_fields(headers);

    let body = String::from_utf8_lossy(body);
    let is_html = header::raw_header_value(headers, "Content-Type")
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
    let body_text = if is_html {
        mime::html_to_text(&body)
    } else {
        body.into_owned()
    };

    ParsedMessage {
        subject: fields.subject,
        from: fields.from,
        to: fields.to,
        date: fields.date,
        body_text: Some(body_text).filter(|b| !b.trim().is_empty()),
        degraded: true,
    }
}

/// Collapse an address header into one display string:
/// `Name <addr>` entries joined with `", "`.
fn address_text(address: &Address<'_>) -> Option<String> {
    let parts: Vec<String> = address
        .iter()
        .filter_map(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(email)) => Some(email.to_string()),
            (None, None) => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"From: Alice Example <alice@example.com>\r\n\
To: Bob <bob@example.com>, carol@example.com\r\n\
Subject: Quarterly report\r\n\
Date: Fri, 15 Mar 2024 12:00:00 +0000\r\n\
\r\n\
Hello Bob,\r\n\
\r\n\
Numbers attached.\r\n";

    #[test]
    fn test_parse_simple_message() {
        let msg = parse_message(SIMPLE);
        assert!(!msg.degraded);
        assert_eq!(msg.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(msg.from.as_deref(), Some("Alice Example <alice@example.com>"));
        assert_eq!(
            msg.to.as_deref(),
            Some("Bob <bob@example.com>, carol@example.com")
        );
        assert_eq!(msg.display_date(), "2024-03-15T12:00:00.000Z");
        assert!(msg.body().contains("Numbers attached."));
    }

    #[test]
    fn test_encoded_subject_is_decoded() {
        let raw = b"Subject: =?UTF-8?Q?Caf=C3=A9_con_le=C3=B1a?=\n\nbody\n";
        assert_eq!(parse_message(raw).subject.as_deref(), Some("Café con leña"));
    }

    #[test]
    fn test_html_only_body_has_no_markup() {
        let raw = b"Subject: html\nContent-Type: text/html; charset=utf-8\n\n<html><body><p>Hello <b>there</b></p></body></html>\n";
        let msg = parse_message(raw);
        let body = msg.body();
        assert!(body.contains("Hello"), "body was {body:?}");
        assert!(!body.contains('<'), "body was {body:?}");
    }

    #[test]
    fn test_html_only_body_drops_script_text() {
        let raw = b"Subject: html\nContent-Type: text/html; charset=utf-8\n\n<html><head><style>p { color: red; }</style></head><body><script>var x = 1;</script><p>Hello&nbsp;there</p></body></html>\n";
        let msg = parse_message(raw);
        assert!(!msg.degraded);
        assert_eq!(msg.body(), "Hello there");
    }

    #[test]
    fn test_multipart_prefers_plain_text() {
        let raw = b"Subject: alt\nMIME-Version: 1.0\nContent-Type: multipart/alternative; boundary=\"b1\"\n\n--b1\nContent-Type: text/plain\n\nplain version\n--b1\nContent-Type: text/html\n\n<p>html version</p>\n--b1--\n";
        let msg = parse_message(raw);
        assert!(msg.body().contains("plain version"));
        assert!(!msg.body().contains("html version"));
    }

    #[test]
    fn test_missing_headers_are_none() {
        let msg = parse_message(b"Subject: only subject\n\n");
        assert!(msg.from.is_none());
        assert!(msg.to.is_none());
        assert!(msg.date.is_none());
        assert!(msg.body_text.is_none());
    }

    #[test]
    fn test_binary_garbage_does_not_panic() {
        let raw: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let msg = parse_message(&raw);
        // Whatever was recovered, every field is displayable
        let _ = msg.display_subject();
        let _ = msg.body();
    }

    #[test]
    fn test_empty_input() {
        let msg = parse_message(b"");
        assert!(msg.subject.is_none());
        assert!(msg.body_text.is_none());
    }

    #[test]
    fn test_fallback_parse() {
        let msg = parse_fallback(b"Subject: =?UTF-8?B?SG9sYQ==?=\nDate: 16-JUL-2025 03:01:03\n\nbody text\n");
        assert!(msg.degraded);
        assert_eq!(msg.subject.as_deref(), Some("Hola"));
        assert_eq!(
            msg.date.map(|d| d.format("%Y-%m").to_string()),
            Some("2025-07".to_string())
        );
        assert_eq!(msg.body(), "body text\n");
    }

    #[test]
    fn test_fallback_parse_html_body() {
        let msg = parse_fallback(b"Content-Type: text/html\n\n<p>Hi &amp; bye</p>");
        assert_eq!(msg.body(), "Hi & bye");
    }

    #[test]
    fn test_read_message_missing_file() {
        let err = read_message("/definitely/not/here.eml").unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound(_)));
    }
}
