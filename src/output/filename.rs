//! Output filename resolution.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use crate::error::{ConvertError, Result};
use crate::model::item::UNTITLED;

/// Characters that may not appear in an output filename.
pub const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Maximum length of the filename stem, in characters.
pub const MAX_STEM_CHARS: usize = 150;

/// Maximum length of the filename stem, in bytes. Leaves room for a
/// `" (n).pdf"` suffix within the usual 255-byte file name limit.
pub const MAX_STEM_BYTES: usize = 240;

/// Extension of every output document.
pub const EXTENSION: &str = "pdf";

/// Where one document will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Output root, or its `YYYY-MM` subfolder when categorizing.
    pub directory: PathBuf,
    /// File name including the extension.
    pub filename: String,
}

impl OutputTarget {
    /// Full path of the document.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Make a subject usable as a filename stem.
///
/// Forbidden characters (and control characters) become `-`, the result is
/// cut to [`MAX_STEM_CHARS`] characters and then to [`MAX_STEM_BYTES`] bytes
/// on a character boundary, and an empty result becomes [`UNTITLED`].
pub fn sanitize_subject(subject: &str) -> String {
    let mut sanitized: String = subject
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();
    if sanitized.len() > MAX_STEM_BYTES {
        let cut = (0..=MAX_STEM_BYTES)
            .rev()
            .find(|&i| sanitized.is_char_boundary(i))
            .unwrap_or(0);
        sanitized.truncate(cut);
    }

    if sanitized.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        sanitized
    }
}

/// `YYYY-MM` folder name for a message date, in the local time zone.
pub fn month_folder(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m").to_string()
}

/// Resolve the output location for a message.
///
/// With `categorize` and a known date the directory is `root/YYYY-MM`, which
/// is created if missing. The filename never names an existing file: a
/// `" (n)"` suffix with the smallest free `n` is added when needed.
pub fn resolve_target(
    root: &Path,
    subject: &str,
    categorize: bool,
    date: Option<&DateTime<Utc>>,
) -> Result<OutputTarget> {
    let directory = match date {
        Some(date) if categorize => {
            let dir = root.join(month_folder(date));
            std::fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;
            dir
        }
        _ => root.to_path_buf(),
    };

    let stem = sanitize_subject(subject);
    let filename = unique_filename(&directory, &stem, EXTENSION);
    Ok(OutputTarget {
        directory,
        filename,
    })
}

/// First of `stem.ext`, `stem (1).ext`, `stem (2).ext`, … not present in `dir`.
pub fn unique_filename(dir: &Path, stem: &str, ext: &str) -> String {
    let proposed = format!("{stem}.{ext}");
    if !dir.join(&proposed).exists() {
        return proposed;
    }

    let mut n: u64 = 1;
    loop {
        let candidate = format!("{stem} ({n}).{ext}");
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}
