//! Output directory maintenance

use std::fs;
use std::io;
use std::path::Path;

/// Remove every entry directly inside `dir`, keeping `dir` itself.
///
/// A missing path or a path that is not a directory is left alone.
pub fn empty_dir(dir: &Path) -> io::Result<usize> {
    if !dir.is_dir() {
        tracing::debug!("Output directory {} does not exist; nothing to empty", dir.display());
        return Ok(0);
    }

    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }

    tracing::debug!("Removed {} entries from {}", removed, dir.display());
    Ok(removed)
}
