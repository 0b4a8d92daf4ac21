//! Backing-file path resolution.

use std::path::{Path, PathBuf};

use tracing::debug;

use profline_codec::Format;
use profline_core::Profile;

use crate::error::PersistResult;
use crate::options::StoreOptions;
use crate::reserved::PROFILE_PATH;

/// The file next to `exe`, named after it, with the format's extension.
pub fn default_path(exe: &Path, format: Format) -> PathBuf {
    exe.with_extension(format.extension())
}

/// Pick the backing file: `-ProfilePath` from the command line, then the
/// configured path, then the executable-adjacent default.
pub fn resolve(options: &StoreOptions, command_line: &Profile, format: Format) -> PersistResult<PathBuf> {
    if let Some(value) = command_line.get(PROFILE_PATH) {
        let path = PathBuf::from(value.text().trim());
        debug!(path = %path.display(), "profile path from command line");
        return Ok(path);
    }
    if let Some(path) = &options.path {
        return Ok(path.clone());
    }
    let exe = std::env::current_exe()?;
    Ok(default_path(&exe, format))
}

/// The sidecar file whose lock guards `target`.
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}
