//! `emlpdf`: convert `.eml` email messages into paginated PDF documents.
//!
//! This crate provides the conversion pipeline: parsing messages, laying out
//! header and body text across fixed-size pages, building the PDF, resolving
//! collision-free output paths, and driving batches of messages through it.

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod i18n;
pub mod layout;
pub mod model;
pub mod output;
pub mod parser;
