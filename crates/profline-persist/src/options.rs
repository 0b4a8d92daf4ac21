use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use profline_codec::Format;

/// What to do when the backing file does not exist yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatePolicy {
    /// Create it, pre-populated with the registered defaults.
    #[default]
    Always,
    /// Never create it; the store stays unsaved until an explicit `save_as`.
    Never,
    /// Ask the [`CreatePrompt`] supplied to `open`. No prompt means no.
    Prompt,
}

/// Decides whether a missing profile file should be created.
///
/// Implemented by the caller's user-facing layer; the store never prompts on
/// its own.
pub trait CreatePrompt {
    fn confirm_create(&self, path: &Path) -> bool;
}

impl<F> CreatePrompt for F
where
    F: Fn(&Path) -> bool,
{
    fn confirm_create(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Configuration for a [`ProfileStore`](crate::ProfileStore).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Explicit backing file. Without it the file sits next to the
    /// executable.
    pub path: Option<PathBuf>,
    /// Codec used for saving, and tried first when loading.
    pub format: Format,
    /// First-run behaviour.
    pub create: CreatePolicy,
    /// Keep command-line overrides out of the saved file.
    pub save_sans_command_line: bool,
    /// Pause before the single retry of a failed save.
    pub retry_delay: Duration,
    /// Compare keys verbatim instead of as patterns.
    pub literal_keys: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            path: None,
            format: Format::Line,
            create: CreatePolicy::Always,
            save_sans_command_line: true,
            retry_delay: Duration::from_millis(250),
            literal_keys: false,
        }
    }
}

impl StoreOptions {
    /// Options bound to an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_create(mut self, create: CreatePolicy) -> Self {
        self.create = create;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}
