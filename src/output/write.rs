//! Atomic document writes.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{ConvertError, Result};

/// Write `bytes` to `path` without ever replacing an existing file.
///
/// The data goes to a temporary file in the same directory, which is then
/// linked into place. A file that appeared at `path` since resolution yields
/// [`ConvertError::OutputExists`]; a partial document is never left behind.
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ConvertError::io(path, e))?;

    tmp.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            ConvertError::OutputExists(path.to_path_buf())
        } else {
            ConvertError::io(path, e.error)
        }
    })?;
    Ok(())
}
