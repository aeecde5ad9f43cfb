//! Line placement and page breaking.
//!
//! The vertical cursor lives in an explicit [`LayoutState`] that every
//! placement call takes and returns.

use tracing::debug;

use crate::config::LayoutConfig;

use super::font::FontMetrics;
use super::wrap::{normalize_text, paragraphs, wrap_paragraph};

/// Text drawn instead of a line the font cannot render.
pub const UNSUPPORTED_PLACEHOLDER: &str = "[unsupported character]";

/// One line of text placed on a page. `y` is the baseline, measured from
/// the bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

/// Lines placed on one page, top to bottom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<LayoutLine>,
}

/// Position of the layout cursor: index of the current page and the
/// baseline of the next line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    pub page: usize,
    pub cursor_y: f32,
}

impl LayoutState {
    /// Cursor at the top of the first page.
    pub fn start(geometry: &LayoutConfig) -> Self {
        Self {
            page: 0,
            cursor_y: top_of_page(geometry),
        }
    }

    /// Move the cursor down without placing anything.
    #[must_use]
    pub fn advance(self, amount: f32) -> Self {
        Self {
            cursor_y: self.cursor_y - amount,
            ..self
        }
    }
}

/// Baseline of the first line on a page.
fn top_of_page(geometry: &LayoutConfig) -> f32 {
    geometry.page_height - geometry.margin_top
}

/// Vertical distance between consecutive baselines.
pub fn line_height(geometry: &LayoutConfig) -> f32 {
    geometry.font_size + geometry.line_gap
}

/// Width available for text between the left and right margins.
pub fn usable_width(geometry: &LayoutConfig) -> f32 {
    geometry.page_width - 2.0 * geometry.margin_x
}

/// Place one line at the cursor, starting a new page first if the cursor
/// is below the bottom margin. Returns the state for the next line.
///
/// A line containing a character the font cannot render is replaced by
/// [`UNSUPPORTED_PLACEHOLDER`].
pub fn place_line(
    pages: &mut Vec<Page>,
    state: LayoutState,
    text: &str,
    font: &dyn FontMetrics,
    geometry: &LayoutConfig,
) -> LayoutState {
    if pages.is_empty() {
        pages.push(Page::default());
    }

    let state = if state.cursor_y < geometry.margin_bottom {
        pages.push(Page::default());
        LayoutState {
            page: pages.len() - 1,
            cursor_y: top_of_page(geometry),
        }
    } else {
        state
    };

    let text = if text.chars().all(|c| font.supports(c)) {
        text.to_string()
    } else {
        debug!(line = text, "Line has characters the font cannot render");
        UNSUPPORTED_PLACEHOLDER.to_string()
    };

    pages[state.page].lines.push(LayoutLine {
        text,
        x: geometry.margin_x,
        y: state.cursor_y,
        font_size: geometry.font_size,
    });

    state.advance(line_height(geometry))
}

/// Lay out a message body below the cursor: paragraphs are word-wrapped to
/// the usable width and blank paragraphs leave one empty line.
pub fn layout_body(
    pages: &mut Vec<Page>,
    mut state: LayoutState,
    body: &str,
    font: &dyn FontMetrics,
    geometry: &LayoutConfig,
) -> LayoutState {
    let body = normalize_text(body);
    let max_width = usable_width(geometry);

    for paragraph in paragraphs(&body) {
        if paragraph.trim().is_empty() {
            state = state.advance(line_height(geometry));
            continue;
        }
        for line in wrap_paragraph(paragraph, font, geometry.font_size, max_width) {
            state = place_line(pages, state, &line, font, geometry);
        }
    }
    state
}
