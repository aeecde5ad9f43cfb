//! Turn a [`ParsedMessage`] into laid-out pages and PDF bytes.

use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::layout::font::{DocumentFont, FontMetrics};
use crate::layout::paginate::{layout_body, place_line, LayoutState, Page};
use crate::model::message::ParsedMessage;

use super::pdf::render_pdf;

/// The four header lines, in output order.
pub fn header_lines(msg: &ParsedMessage) -> [String; 4] {
    [
        format!("Subject: {}", msg.display_subject()),
        format!("From: {}", msg.display_from()),
        format!("To: {}", msg.display_to()),
        format!("Date: {}", msg.display_date()),
    ]
}

/// Lay out the header block followed by the body.
///
/// Always returns at least one page.
pub fn lay_out_message(
    msg: &ParsedMessage,
    font: &dyn FontMetrics,
    geometry: &LayoutConfig,
) -> Vec<Page> {
    let mut pages = vec![Page::default()];
    let mut state = LayoutState::start(geometry);

    for line in header_lines(msg) {
        state = place_line(&mut pages, state, &line, font, geometry);
    }
    state = state.advance(geometry.header_gap);

    layout_body(&mut pages, state, msg.body(), font, geometry);
    pages
}

/// Build the complete PDF for one message.
///
/// `font` is embedded once and shared by every page.
pub fn build_document(
    msg: &ParsedMessage,
    font: &DocumentFont,
    geometry: &LayoutConfig,
) -> Result<Vec<u8>> {
    let pages = lay_out_message(msg, font, geometry);
    let bytes = render_pdf(&pages, font, geometry, msg.display_subject())?;
    debug!(pages = pages.len(), bytes = bytes.len(), "Built document");
    Ok(bytes)
}
