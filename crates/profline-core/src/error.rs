//! Error types for the profile core.

/// Errors produced by profile operations and the line codec.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Attempted to add something that is not a key/value pair.
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// A stored value could not be interpreted as the requested type.
    #[error("cannot read {key} as {target}: {value:?}")]
    Conversion {
        key: String,
        target: &'static str,
        value: String,
    },

    /// The text could not be parsed.
    #[error("parse error at byte {position}: {reason}")]
    Parse { position: usize, reason: String },

    /// A `-Key=[` block start without a matching `-Key=]`.
    #[error("block {key}=[ has no matching {key}=]")]
    UnterminatedBlock { key: String },

    /// A block value the line codec cannot write so that it reads back,
    /// such as one holding an unbalanced `-Key=[` or `-Key=]` of its own key.
    #[error("value of {key} cannot be written as a {key}=[ ... {key}=] block")]
    Unrepresentable { key: String },

    /// Text that is neither a switch nor a continuation of a value.
    #[error("unexpected token {token:?} at byte {position}")]
    UnexpectedToken { position: usize, token: String },
}

/// Convenience alias for profile results.
pub type ProfileResult<T> = Result<T, ProfileError>;
