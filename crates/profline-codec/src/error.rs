use profline_core::ProfileError;

/// Errors from encoding or decoding a profile.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The line codec rejected the text.
    #[error("line format: {0}")]
    Line(#[from] ProfileError),

    /// The structured text is malformed or not a profile document.
    #[error("structured format: {0}")]
    Structured(String),

    /// Text that neither codec accepts.
    #[error("unreadable profile text (as {preferred}: {first}; as {fallback}: {second})")]
    Unreadable {
        preferred: &'static str,
        first: String,
        fallback: &'static str,
        second: String,
    },

    /// Unknown format name.
    #[error("unknown profile format: {0:?}")]
    UnknownFormat(String),

    /// The transport envelope is truncated or inconsistent.
    #[error("invalid transport envelope: {0}")]
    Envelope(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;
