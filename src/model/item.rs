//! Batch work items and their outcomes.

use std::path::{Path, PathBuf};

use crate::parser::eml;

/// Display subject used when a message has no subject.
pub const UNTITLED: &str = "Untitled";

/// Display subject used when a message cannot be read during pre-fetch.
pub const UNREADABLE_SUBJECT: &str = "Error reading subject";

/// One message to convert.
///
/// The display subject is fetched once when the item is created and is what
/// the output filename is derived from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchItem {
    /// Input `.eml` file.
    pub source_path: PathBuf,
    /// Subject shown to the user and used for the output filename.
    pub display_subject: String,
}

impl BatchItem {
    /// Create an item with an already known display subject.
    pub fn new(source_path: impl Into<PathBuf>, display_subject: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            display_subject: display_subject.into(),
        }
    }

    /// Create an item, pre-fetching its subject from the file.
    ///
    /// Never fails: a missing subject becomes [`UNTITLED`] and an unreadable
    /// file becomes [`UNREADABLE_SUBJECT`] (the conversion itself will then
    /// report the real error).
    pub fn from_path(source_path: impl AsRef<Path>) -> Self {
        let source_path = source_path.as_ref();
        let display_subject = match eml::prefetch_subject(source_path) {
            Ok(Some(subject)) => subject,
            Ok(None) => UNTITLED.to_string(),
            Err(e) => {
                tracing::warn!(
                    path = %source_path.display(),
                    error = %e,
                    "Could not read subject"
                );
                UNREADABLE_SUBJECT.to_string()
            }
        };
        Self::new(source_path, display_subject)
    }
}

/// Final state of one [`BatchItem`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The document was written to `path`.
    Converted { source: PathBuf, path: PathBuf },
    /// The item was skipped.
    Failed { source: PathBuf, message: String },
}

impl ItemOutcome {
    /// Whether the item produced a document.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }
}

/// Running counters and outcome log of a batch.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BatchReport {
    /// Number of items converted so far.
    pub processed: usize,
    /// Number of items in the batch.
    pub total: usize,
    /// One entry per finished item, in input order.
    pub outcomes: Vec<ItemOutcome>,
    /// `true` if the batch stopped early on request.
    pub cancelled: bool,
}

impl BatchReport {
    /// Number of failed items so far.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Paths of all written documents.
    pub fn written_paths(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(|o| match o {
            ItemOutcome::Converted { path, .. } => Some(path.as_path()),
            ItemOutcome::Failed { .. } => None,
        })
    }
}
