//! Atomic file replacement with a single bounded retry.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::warn;

/// Write `contents` to a temporary file beside `path`, then rename it over
/// `path`. Readers see either the old file or the new one, never a prefix.
pub fn replace(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Run `op`; on failure wait `delay` and run it exactly once more.
pub fn with_retry<T, F>(path: &Path, delay: Duration, mut op: F) -> io::Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    match op() {
        Ok(v) => Ok(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, delay_ms = delay.as_millis() as u64, "save failed; retrying once");
            thread::sleep(delay);
            op()
        }
    }
}

/// [`replace`] with one retry.
pub fn replace_with_retry(path: &Path, contents: &str, delay: Duration) -> io::Result<()> {
    with_retry(path, delay, || replace(path, contents))
}
