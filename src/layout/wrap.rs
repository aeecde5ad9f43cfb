//! Greedy word-wrap against measured text width.

use super::font::FontMetrics;

/// Replace tabs with four spaces and drop other control characters,
/// keeping line breaks.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str("    "),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Split text into paragraphs at explicit line breaks (`\n` or `\r\n`).
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|p| p.strip_suffix('\r').unwrap_or(p))
}

/// Wrap one paragraph into lines no wider than `max_width` at `size`.
///
/// Words are split on single spaces and accumulated greedily. A word that
/// alone exceeds `max_width` still gets its own line; words are never
/// broken.
pub fn wrap_paragraph(
    paragraph: &str,
    font: &dyn FontMetrics,
    size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in paragraph.split(' ') {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if font.text_width(&candidate, size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font::Helvetica;

    /// Every character is 500 units wide: 6 points at size 12.
    struct Mono;

    impl FontMetrics for Mono {
        fn char_width(&self, _c: char) -> Option<f32> {
            Some(500.0)
        }
    }

    #[test]
    fn test_short_paragraph_is_one_line() {
        assert_eq!(wrap_paragraph("hello world", &Mono, 12.0, 100.0), vec!["hello world"]);
    }

    #[test]
    fn test_wraps_at_width() {
        // 10 chars fit in 60pt
        let lines = wrap_paragraph("aaaa bbbb cccc dddd", &Mono, 12.0, 60.0);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_exact_fit_is_not_wrapped() {
        // "aaaa bbbb" = 9 chars = 54pt
        assert_eq!(wrap_paragraph("aaaa bbbb", &Mono, 12.0, 54.0), vec!["aaaa bbbb"]);
    }

    #[test]
    fn test_long_word_gets_own_line_unbroken() {
        let long = "x".repeat(40);
        let text = format!("a {long} b");
        let lines = wrap_paragraph(&text, &Mono, 12.0, 60.0);
        assert_eq!(lines, vec!["a".to_string(), long, "b".to_string()]);
    }

    #[test]
    fn test_leading_long_word_emits_no_empty_line() {
        let long = "y".repeat(40);
        let lines = wrap_paragraph(&long, &Mono, 12.0, 60.0);
        assert_eq!(lines, vec![long]);
    }

    #[test]
    fn test_rewrap_is_idempotent() {
        let text = "The quick brown fox jumps over the lazy dog while the \
                    supercalifragilisticexpialidocious cat watches from afar, \
                    unimpressed by any of it.";
        let first = wrap_paragraph(text, &Helvetica, 12.0, 120.0);
        assert!(first.len() > 1);
        let second: Vec<String> = first
            .iter()
            .flat_map(|line| wrap_paragraph(line, &Helvetica, 12.0, 120.0))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lines_fit_unless_single_word() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor";
        for line in wrap_paragraph(text, &Helvetica, 12.0, 100.0) {
            assert!(Helvetica.text_width(&line, 12.0) <= 100.0 || !line.contains(' '));
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("a\tb\u{7}c\r\nd"), "a    bc\nd");
    }

    #[test]
    fn test_paragraphs_strip_cr() {
        let p: Vec<&str> = paragraphs("one\r\n\r\ntwo\nthree").collect();
        assert_eq!(p, vec!["one", "", "two", "three"]);
    }
}
