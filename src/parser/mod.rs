//! Message parsing: `.eml` files, header decoding, and MIME body extraction.

pub mod eml;
pub mod header;
pub mod mime;
