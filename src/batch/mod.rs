//! Sequential batch conversion.
//!
//! A [`BatchRun`] is an iterator of [`BatchEvent`]s: every call to `next`
//! converts exactly one item (read, parse, build, resolve, write) and
//! reports its outcome, and a final [`BatchEvent::Complete`] summarizes the
//! run. Nothing happens between calls, so the caller observes progress as it
//! occurs and decides the pace.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LayoutConfig;
use crate::document::build_document;
use crate::error::{ConvertError, Result};
use crate::layout::font::FontSource;
use crate::model::item::{BatchItem, BatchReport, ItemOutcome};
use crate::output::{resolve_target, write_document, OutputTarget};
use crate::parser::eml;

/// One notification produced by a [`BatchRun`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    /// An item was converted.
    Progress {
        /// Items converted so far, this one included.
        processed: usize,
        total: usize,
        /// File name of the written document.
        filename: String,
        /// Full path of the written document.
        path: PathBuf,
    },
    /// An item failed and was skipped.
    Error { item: BatchItem, message: String },
    /// The run is over. Emitted exactly once, last.
    Complete {
        converted: usize,
        total: usize,
        /// `true` if items were left unprocessed on request.
        cancelled: bool,
    },
}

/// Per-run conversion settings.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Sort documents into `YYYY-MM` folders by message date.
    pub categorize: bool,
    /// Font used for every document.
    pub font: FontSource,
    /// Page geometry.
    pub layout: LayoutConfig,
}

/// Shared flag for stopping a run between items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop before its next item.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A batch of messages being converted one at a time, in input order.
#[derive(Debug)]
pub struct BatchRun {
    items: Vec<BatchItem>,
    next_index: usize,
    output_dir: PathBuf,
    options: BatchOptions,
    cancel: CancelFlag,
    report: BatchReport,
    finished: bool,
}

impl BatchRun {
    /// Validate the input and prepare a run. No item is touched yet.
    ///
    /// Fails with [`ConvertError::InvalidBatchInput`] when `items` is empty
    /// or no output directory was chosen.
    pub fn new(
        items: Vec<BatchItem>,
        output_dir: Option<PathBuf>,
        options: BatchOptions,
    ) -> Result<Self> {
        if items.is_empty() {
            return Err(ConvertError::InvalidBatchInput("no input files".into()));
        }
        let Some(output_dir) = output_dir else {
            return Err(ConvertError::InvalidBatchInput(
                "no output directory".into(),
            ));
        };

        let report = BatchReport {
            total: items.len(),
            ..Default::default()
        };
        info!(
            total = items.len(),
            output = %output_dir.display(),
            categorize = options.categorize,
            "Starting batch"
        );
        Ok(Self {
            items,
            next_index: 0,
            output_dir,
            options,
            cancel: CancelFlag::new(),
            report,
            finished: false,
        })
    }

    /// Use `flag` to cancel this run from elsewhere.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Handle for cancelling this run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Counters and outcomes so far.
    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    /// Drain the run, passing every event to `observer`, and return the
    /// final report.
    pub fn run_to_completion(mut self, mut observer: impl FnMut(&BatchEvent)) -> BatchReport {
        for event in self.by_ref() {
            observer(&event);
        }
        self.report
    }

    fn process(&mut self, item: BatchItem) -> BatchEvent {
        debug!(path = %item.source_path.display(), subject = %item.display_subject, "Converting");

        match convert_one(&item, &self.output_dir, &self.options) {
            Ok(target) => {
                let path = target.path();
                info!(
                    source = %item.source_path.display(),
                    output = %path.display(),
                    "Converted"
                );
                self.report.processed += 1;
                self.report.outcomes.push(ItemOutcome::Converted {
                    source: item.source_path,
                    path: path.clone(),
                });
                BatchEvent::Progress {
                    processed: self.report.processed,
                    total: self.report.total,
                    filename: target.filename,
                    path,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(source = %item.source_path.display(), error = %message, "Conversion failed");
                self.report.outcomes.push(ItemOutcome::Failed {
                    source: item.source_path.clone(),
                    message: message.clone(),
                });
                BatchEvent::Error { item, message }
            }
        }
    }

    fn complete(&mut self) -> BatchEvent {
        self.finished = true;
        self.report.cancelled = self.next_index < self.items.len();
        if self.report.cancelled {
            info!(
                skipped = self.items.len() - self.next_index,
                "Batch cancelled"
            );
        }
        info!(
            converted = self.report.processed,
            failed = self.report.failed(),
            total = self.report.total,
            "Batch complete"
        );
        BatchEvent::Complete {
            converted: self.report.processed,
            total: self.report.total,
            cancelled: self.report.cancelled,
        }
    }
}

impl Iterator for BatchRun {
    type Item = BatchEvent;

    fn next(&mut self) -> Option<BatchEvent> {
        if self.finished {
            return None;
        }
        if self.next_index >= self.items.len() || self.cancel.is_cancelled() {
            return Some(self.complete());
        }

        let item = self.items[self.next_index].clone();
        self.next_index += 1;
        Some(self.process(item))
    }
}

/// Convert one message and write it under `output_dir`.
///
/// The output name comes from the item's display subject; the folder (when
/// categorizing) from the parsed message date.
pub fn convert_one(
    item: &BatchItem,
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<OutputTarget> {
    let msg = eml::read_message(&item.source_path)?;
    let font = options.font.load()?;
    let bytes = build_document(&msg, &font, &options.layout)?;

    let target = resolve_target(
        output_dir,
        &item.display_subject,
        options.categorize,
        msg.date.as_ref(),
    )?;
    write_document(&target.path(), &bytes)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_eml(dir: &Path, name: &str, subject: &str) -> PathBuf {
        let path = dir.join(name);
        let raw = format!(
            "From: a@example.com\nTo: b@example.com\nSubject: {subject}\nDate: Fri, 15 Mar 2024 12:00:00 +0000\n\nBody of {subject}\n"
        );
        std::fs::write(&path, raw).unwrap();
        path
    }

    #[test]
    fn test_empty_items_is_invalid() {
        let err = BatchRun::new(vec![], Some(PathBuf::from("/out")), BatchOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidBatchInput(_)));
    }

    #[test]
    fn test_missing_output_dir_is_invalid() {
        let items = vec![BatchItem::new("a.eml", "A")];
        let err = BatchRun::new(items, None, BatchOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidBatchInput(_)));
    }

    #[test]
    fn test_events_in_order() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items: Vec<BatchItem> = ["one", "two", "three"]
            .iter()
            .map(|s| BatchItem::from_path(write_eml(input.path(), &format!("{s}.eml"), s)))
            .collect();

        let run = BatchRun::new(items, Some(out.path().to_path_buf()), BatchOptions::default())
            .unwrap();
        let events: Vec<BatchEvent> = run.collect();
        assert_eq!(events.len(), 4);
        for (i, event) in events[..3].iter().enumerate() {
            match event {
                BatchEvent::Progress {
                    processed, total, ..
                } => {
                    assert_eq!(*processed, i + 1);
                    assert_eq!(*total, 3);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(
            events[3],
            BatchEvent::Complete {
                converted: 3,
                total: 3,
                cancelled: false
            }
        );
    }

    #[test]
    fn test_failed_item_does_not_abort() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let missing = BatchItem::new(input.path().join("gone.eml"), "Gone");
        let good = BatchItem::from_path(write_eml(input.path(), "ok.eml", "Fine"));

        let run = BatchRun::new(
            vec![missing.clone(), good],
            Some(out.path().to_path_buf()),
            BatchOptions::default(),
        )
        .unwrap();
        let report_events: Vec<BatchEvent> = run.collect();

        assert!(matches!(&report_events[0], BatchEvent::Error { item, .. } if *item == missing));
        assert!(matches!(
            &report_events[1],
            BatchEvent::Progress { processed: 1, total: 2, filename, .. } if filename == "Fine.pdf"
        ));
        assert_eq!(
            report_events[2],
            BatchEvent::Complete {
                converted: 1,
                total: 2,
                cancelled: false
            }
        );
    }

    #[test]
    fn test_iterator_is_fused_after_complete() {
        let out = tempfile::tempdir().unwrap();
        let mut run = BatchRun::new(
            vec![BatchItem::new(out.path().join("nope.eml"), "x")],
            Some(out.path().to_path_buf()),
            BatchOptions::default(),
        )
        .unwrap();
        assert!(matches!(run.next(), Some(BatchEvent::Error { .. })));
        assert!(matches!(run.next(), Some(BatchEvent::Complete { .. })));
        assert!(run.next().is_none());
        assert!(run.next().is_none());
    }

    #[test]
    fn test_cancel_between_items() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items = vec![
            BatchItem::from_path(write_eml(input.path(), "a.eml", "A")),
            BatchItem::from_path(write_eml(input.path(), "b.eml", "B")),
        ];
        let mut run =
            BatchRun::new(items, Some(out.path().to_path_buf()), BatchOptions::default()).unwrap();
        let flag = run.cancel_flag();

        assert!(matches!(run.next(), Some(BatchEvent::Progress { .. })));
        flag.cancel();
        assert_eq!(
            run.next(),
            Some(BatchEvent::Complete {
                converted: 1,
                total: 2,
                cancelled: true
            })
        );
        assert!(run.report().cancelled);
        assert!(!out.path().join("B.pdf").exists());
    }

    #[test]
    fn test_shared_flag_cancelled_before_start() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let flag = CancelFlag::new();
        flag.cancel();
        let items = vec![BatchItem::from_path(write_eml(input.path(), "a.eml", "A"))];
        let events: Vec<BatchEvent> =
            BatchRun::new(items, Some(out.path().to_path_buf()), BatchOptions::default())
                .unwrap()
                .with_cancel_flag(flag)
                .collect();
        assert_eq!(
            events,
            vec![BatchEvent::Complete {
                converted: 0,
                total: 1,
                cancelled: true
            }]
        );
        assert!(!out.path().join("A.pdf").exists());
    }

    #[test]
    fn test_font_error_fails_only_that_item() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let options = BatchOptions {
            font: FontSource::File(input.path().join("missing.ttf")),
            ..Default::default()
        };
        let items = vec![BatchItem::from_path(write_eml(input.path(), "a.eml", "A"))];
        let report = BatchRun::new(items, Some(out.path().to_path_buf()), options)
            .unwrap()
            .run_to_completion(|_| {});
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed(), 1);
        match &report.outcomes[0] {
            ItemOutcome::Failed { message, .. } => assert!(message.contains("Font error")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_run_to_completion_reports_paths() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items = vec![
            BatchItem::from_path(write_eml(input.path(), "a.eml", "Same")),
            BatchItem::from_path(write_eml(input.path(), "b.eml", "Same")),
        ];
        let mut seen = 0;
        let report = BatchRun::new(items, Some(out.path().to_path_buf()), BatchOptions::default())
            .unwrap()
            .run_to_completion(|_| seen += 1);
        assert_eq!(seen, 3);
        let paths: Vec<PathBuf> = report.written_paths().map(Path::to_path_buf).collect();
        assert_eq!(
            paths,
            vec![out.path().join("Same.pdf"), out.path().join("Same (1).pdf")]
        );
    }
}
