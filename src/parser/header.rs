//! RFC 5322 header parsing: folding, encoded-words (RFC 2047), and date parsing.
//!
//! This is the lenient path used when `mail-parser` cannot structure a
//! message, and for `Date:` values it does not understand.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Header fields recovered without a structural parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHeaderFields {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Extract display fields from a raw header block.
///
/// Address headers are kept as decoded text; they are only displayed, never
/// split into mailboxes.
pub fn parse_header_fields(raw_headers: &[u8]) -> RawHeaderFields {
    let block = HeaderBlock::parse(&header_text(raw_headers));
    let text_field = |name: &str| {
        block
            .get(name)
            .map(|v| decode_encoded_words(v).trim().to_string())
            .filter(|v| !v.is_empty())
    };

    RawHeaderFields {
        subject: text_field("subject"),
        from: text_field("from"),
        to: text_field("to"),
        date: block.get("date").and_then(parse_date),
    }
}

/// Return the raw (undecoded) value of the first header called `name`.
pub fn raw_header_value(raw_headers: &[u8], name: &str) -> Option<String> {
    HeaderBlock::parse(&header_text(raw_headers))
        .get(name)
        .map(str::to_string)
}

/// Header bytes as text: UTF-8 when valid, Windows-1252 otherwise.
fn header_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0,
    }
}

/// Unfolded header fields in message order, names lowercased.
struct HeaderBlock {
    fields: Vec<(String, String)>,
}

impl HeaderBlock {
    fn parse(text: &str) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();
        for line in text.lines() {
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
            } else if let Some((name, value)) = line.split_once(':') {
                fields.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }
        Self { fields }
    }

    /// First value of `name` (case-insensitive).
    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` becomes `"Hola mundo"`.
/// Tokens that fail to decode are kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    // Whitespace between two adjacent encoded-words is dropped (RFC 2047 section 6.2)
    let mut after_word = false;

    while let Some((plain, tail)) = rest.split_once("=?") {
        if !(after_word && plain.trim().is_empty()) {
            out.push_str(plain);
        }
        if let Some((text, used)) = decode_one_word(tail) {
            out.push_str(&text);
            rest = &tail[used..];
            after_word = true;
        } else {
            out.push_str("=?");
            rest = tail;
            after_word = false;
        }
    }

    out.push_str(rest);
    out
}

/// Decode `charset?encoding?text?=` and return the text plus the number of
/// bytes consumed after the leading `=?`.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let encoded_text = &rest[..end];

    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_base64(encoded_text)?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Decode standard base64, ignoring whitespace and tolerating missing padding.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    fn value(c: u8) -> Option<u32> {
        match c {
            b'A'..=b'Z' => Some(u32::from(c - b'A')),
            b'a'..=b'z' => Some(u32::from(c - b'a') + 26),
            b'0'..=b'9' => Some(u32::from(c - b'0') + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &c in input.as_bytes() {
        if c == b'=' {
            break;
        }
        if c.is_ascii_whitespace() {
            continue;
        }
        acc = (acc << 6) | value(c)?;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    Some(out)
}

/// Q-encoding: `_` is a space and `=XX` a hex byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = bytes.clone().next().and_then(|c| (c as char).to_digit(16));
                let lo = bytes.clone().nth(1).and_then(|c| (c as char).to_digit(16));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi * 16 + lo) as u8);
                        bytes.nth(1);
                    }
                    _ => out.push(b'='),
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Decode bytes using a named charset.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split('*').next().unwrap_or(charset);
    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Layouts tried after the RFC 2822 and RFC 3339 parsers give up.
const DATE_FORMATS: [&str; 9] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Abbreviated zones seen in the wild, with their offsets.
const NAMED_ZONES: [(&str, &str); 13] = [
    ("CEST", "+0200"),
    ("CET", "+0100"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("JST", "+0900"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
];

/// Parse a `Date:` value that `mail-parser` could not, in UTC.
///
/// Accepts RFC 2822 and RFC 3339 dates plus the loose variants mail clients
/// produce: no weekday, IMAP `16-JUL-2025` dates, zone names instead of
/// offsets, and naive timestamps (taken as UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let strict = DateTime::parse_from_rfc2822(value).or_else(|_| DateTime::parse_from_rfc3339(value));
    if let Ok(dt) = strict {
        return Some(dt.with_timezone(&Utc));
    }

    let loose = normalize_date(value);
    let parsed = DATE_FORMATS.iter().find_map(|fmt| {
        DateTime::parse_from_str(&loose, fmt)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(&loose, fmt).map(|n| Utc.from_utc_datetime(&n)))
            .ok()
    });
    if parsed.is_none() {
        warn!(date = value, "Could not parse date");
    }
    parsed
}

/// Drop a leading weekday, turn `16-JUL-2025` into `16 Jul 2025`, and
/// replace a trailing zone name with its offset.
fn normalize_date(value: &str) -> String {
    const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let mut text = value;
    if let Some(rest) = WEEKDAYS.iter().find_map(|d| text.strip_prefix(d)) {
        if rest.starts_with([',', ' ']) {
            text = rest.trim_start_matches(',').trim_start();
        }
    }

    let mut words: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let parts: Vec<&str> = word.split('-').collect();
        match parts.as_slice() {
            [day, month, year] if day.len() <= 2 && year.len() == 4 => {
                let month = MONTHS
                    .iter()
                    .find(|m| m.eq_ignore_ascii_case(month))
                    .map_or(*month, |m| *m);
                words.extend([day.to_string(), month.to_string(), year.to_string()]);
            }
            _ => words.push(word.to_string()),
        }
    }

    if let Some(last) = words.last_mut() {
        if let Some((_, offset)) = NAMED_ZONES.iter().find(|(name, _)| *name == last.as_str()) {
            *last = offset.to_string();
        }
    }
    words.join(" ")
}
