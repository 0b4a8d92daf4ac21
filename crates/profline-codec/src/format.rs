//! On-disk format selection and fallback decoding.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use profline_core::{line, Profile};

use crate::error::{CodecError, CodecResult};
use crate::structured::{from_structured, to_structured};

/// The two interchangeable text encodings of a profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Command-block text, one entry per line.
    #[default]
    Line,
    /// Tagged elements under `configuration/appSettings`.
    Structured,
}

impl Format {
    /// Default file extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Format::Line => "txt",
            Format::Structured => "config",
        }
    }

    /// The other format.
    pub fn other(self) -> Format {
        match self {
            Format::Line => Format::Structured,
            Format::Structured => Format::Line,
        }
    }

    /// Guess a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Format> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "txt" => Some(Format::Line),
            "config" | "xml" => Some(Format::Structured),
            _ => None,
        }
    }

    /// Parse text in this format.
    pub fn parse(self, text: &str) -> CodecResult<Profile> {
        match self {
            Format::Line => Ok(Profile::parse(text)?),
            Format::Structured => from_structured(text),
        }
    }

    /// Render a profile in this format.
    pub fn render(self, profile: &Profile) -> CodecResult<String> {
        match self {
            Format::Line => {
                line::check_profile(profile)?;
                let mut text = profile.to_command_block();
                text.push('\n');
                Ok(text)
            }
            Format::Structured => to_structured(profile),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Format::Line => "line",
            Format::Structured => "structured",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" | "text" | "txt" => Ok(Format::Line),
            "structured" | "xml" | "config" => Ok(Format::Structured),
            _ => Err(CodecError::UnknownFormat(s.to_string())),
        }
    }
}

/// A profile together with the format it was actually read in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub profile: Profile,
    pub format: Format,
}

/// Parse `text` with `preferred`, falling back to the other format.
pub fn parse_any(text: &str, preferred: Format) -> CodecResult<Decoded> {
    let first = match preferred.parse(text) {
        Ok(profile) => return Ok(Decoded { profile, format: preferred }),
        Err(e) => e,
    };

    let fallback = preferred.other();
    match fallback.parse(text) {
        Ok(profile) => {
            warn!(%preferred, %fallback, error = %first, "profile text is not in the configured format");
            Ok(Decoded { profile, format: fallback })
        }
        Err(second) => Err(CodecError::Unreadable {
            preferred: preferred.name(),
            first: first.to_string(),
            fallback: fallback.name(),
            second: second.to_string(),
        }),
    }
}
