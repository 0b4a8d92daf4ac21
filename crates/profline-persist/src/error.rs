use std::io;
use std::path::PathBuf;

use profline_codec::CodecError;
use profline_core::ProfileError;

/// Errors produced while binding, loading, or saving a profile file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Another live instance holds the lock on this profile.
    #[error("profile {path} is already in use by another process")]
    LockContention { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// The file is readable by neither codec.
    #[error("profile {path} is corrupt: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    /// The operation needs a bound backing file.
    #[error("profile store is not bound to a file")]
    NotBound,
}

pub type PersistResult<T> = std::result::Result<T, PersistError>;
