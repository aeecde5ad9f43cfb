//! MIME body handling: plain-text body selection and HTML-to-text conversion.

use mail_parser::Message;

/// Tags whose opening or closing form starts a new line in the text output.
const BLOCK_TAGS: [&str; 16] = [
    "br", "p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6", "table", "ul", "ol",
    "blockquote", "hr",
];

/// Pick the plain-text body of a parsed message.
///
/// A real `text/plain` part is used as is. Otherwise the HTML body goes
/// through [`html_to_text`]; mail-parser's own conversion keeps script text.
pub fn extract_body_text(msg: &Message<'_>) -> Option<String> {
    match msg.text_part(0) {
        Some(part) if !part.is_text_html() => msg.body_text(0).map(|s| s.into_owned()),
        _ => msg.body_html(0).map(|html| html_to_text(&html)),
    }
}

/// Skip a leading UTF-8 BOM and a leading mbox `From ` separator line.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Split raw message bytes into the header block and the body at the first
/// blank line. Without a blank line everything is treated as headers.
pub fn split_header_body(data: &[u8]) -> (&[u8], &[u8]) {
    for i in 0..data.len() {
        if data[i..].starts_with(b"\r\n\r\n") {
            return (&data[..i], &data[i + 4..]);
        }
        if data[i..].starts_with(b"\n\n") {
            return (&data[..i], &data[i + 2..]);
        }
    }
    (data, &[])
}

/// Convert HTML to plain text.
///
/// - `<br>`, `<p>`, `<div>` and other block tags become line breaks
/// - `<li>` becomes `"- item"`
/// - `<script>` and `<style>` blocks are removed
/// - remaining tags are stripped and common entities decoded
/// - runs of blank lines collapse into one
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");
    text = remove_tag_block(&text, "head");

    let mut result = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(start) = rest.find('<') {
        result.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            // Unterminated tag: drop the remainder
            rest = "";
            break;
        };
        let tag = &rest[start + 1..start + end];
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_lowercase();
        if name == "li" {
            if !tag.starts_with('/') {
                result.push_str("\n- ");
            }
        } else if BLOCK_TAGS.contains(&name.as_str()) {
            result.push('\n');
        }
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);

    let decoded = decode_entities(&result);

    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(decoded.len());
    for line in decoded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Decode named and numeric character references.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "euro" => Some('€'),
        _ => None,
    }
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open).map(|s| s + pos) {
        // `<header` must not match `<head`
        let next = lower.as_bytes().get(start + open.len()).copied();
        if !matches!(next, Some(b'>' | b'/') | None) && !next.is_some_and(|b| b.is_ascii_whitespace()) {
            result.push_str(&html[pos..start + open.len()]);
            pos = start + open.len();
            continue;
        }
        result.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => {
                // No closing tag: drop the rest
                pos = html.len();
                break;
            }
        }
    }
    result.push_str(&html[pos..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_skip_bom_and_from_line() {
        let data = b"\xEF\xBB\xBFFrom x Thu Jan 01\nSubject: Test\n\nBody\n";
        assert!(skip_from_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_split_header_body() {
        let (h, b) = split_header_body(b"Subject: Hi\nFrom: a@b.c\n\nBody\n");
        assert_eq!(h, b"Subject: Hi\nFrom: a@b.c");
        assert_eq!(b, b"Body\n");

        let (h, b) = split_header_body(b"Subject: Hi\r\n\r\nBody");
        assert_eq!(h, b"Subject: Hi");
        assert_eq!(b, b"Body");

        let (h, b) = split_header_body(b"no blank line");
        assert_eq!(h, b"no blank line");
        assert!(b.is_empty());
    }

    #[test]
    fn test_html_to_text_basic() {
        let text = html_to_text("<p>Hello <b>world</b></p><P>Second paragraph</P>");
        assert_eq!(text, "Hello world\n\nSecond paragraph");
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("Tom &amp; Jerry &lt;3&gt; &#233;&#x21;"), "Tom & Jerry <3> é!");
        assert_eq!(html_to_text("fish & chips"), "fish & chips");
    }

    #[test]
    fn test_html_to_text_removes_scripts_and_styles() {
        let html = "<html><head><title>t</title></head><body>Before<SCRIPT>alert('x')</SCRIPT><style>p{}</style>After</body></html>";
        assert_eq!(html_to_text(html), "BeforeAfter");
    }

    #[test]
    fn test_header_element_is_not_head_block() {
        assert_eq!(html_to_text("<header>Title</header>"), "Title");
    }

    #[test]
    fn test_html_to_text_list_items() {
        let text = html_to_text("<ul><li>one</li><li>two</li></ul>");
        assert_eq!(text, "- one\n- two");
    }

    #[test]
    fn test_html_to_text_has_no_markup() {
        let text = html_to_text("<div class=\"x\"><a href=\"https://e.com\">link</a><br/>next</div>");
        assert!(!text.contains('<') && !text.contains('>'));
        assert!(text.contains("link"));
        assert!(text.contains("next"));
    }
}
