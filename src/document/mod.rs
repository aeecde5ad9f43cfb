//! Document building: header block and body layout, serialized as PDF.

pub mod builder;
pub mod pdf;

pub use builder::{build_document, header_lines, lay_out_message};
