//! Cross-process exclusivity for a backing file.
//!
//! The lock lives on a `.lock` sidecar: saving replaces the profile file, so
//! a lock on its handle would not survive the first save. Acquisition never
//! blocks; a held lock is reported as [`PersistError::LockContention`].

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PersistError, PersistResult};
use crate::location::lock_path;

/// An exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Lock the sidecar of `target`, failing fast if another handle holds it.
    pub fn acquire(target: &Path) -> PersistResult<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                warn!(path = %target.display(), "profile is locked by another instance");
                return Err(PersistError::LockContention {
                    path: target.to_path_buf(),
                });
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        // Owner pid, for whoever finds the sidecar.
        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;

        debug!(lock = %path.display(), "profile lock acquired");
        Ok(Self { file, path })
    }

    /// Path of the sidecar lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = %self.path.display(), error = %e, "failed to release profile lock");
        } else {
            debug!(lock = %self.path.display(), "profile lock released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.txt");

        let first = FileLock::acquire(&target).unwrap();
        assert!(first.path().exists());
        let err = FileLock::acquire(&target).unwrap_err();
        assert!(matches!(err, PersistError::LockContention { ref path } if *path == target));

        drop(first);
        assert!(FileLock::acquire(&target).is_ok());
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/deeper/app.txt");
        let lock = FileLock::acquire(&target).unwrap();
        assert!(lock.path().ends_with("app.txt.lock"));
        // the profile itself is not created by locking
        assert!(!target.exists());
    }
}
