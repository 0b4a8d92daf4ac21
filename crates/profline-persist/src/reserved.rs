//! Option keys the store itself interprets.

/// Alternate backing file. Replaces the default file entirely.
pub const PROFILE_PATH: &str = "-ProfilePath";

/// Codec name (`Line` or `Structured`) overriding the configured format.
pub const PROFILE_FORMAT: &str = "-ProfileFormat";

/// Suppresses every automatic save.
pub const NO_SAVE: &str = "-NoSave";

/// Persists command-line overrides along with everything else.
pub const SAVE_COMMAND_LINE: &str = "-SaveCommandLine";
