//! Output location resolution and document writing.

pub mod filename;
pub mod write;

pub use filename::{resolve_target, sanitize_subject, OutputTarget};
pub use write::write_document;
