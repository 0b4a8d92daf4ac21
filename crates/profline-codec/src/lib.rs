//! Alternate encodings for profline profiles.
//!
//! The line codec lives in `profline-core`. This crate adds the structured
//! (XML) document form, format selection with fallback decoding, and a
//! compact transport envelope for sending a profile between processes.
//!
//! # Transport Envelope
//!
//! ```text
//! [u32 LE uncompressed length][gzip(command block)]
//! ```

pub mod error;
pub mod format;
pub mod structured;
pub mod transport;

pub use error::{CodecError, CodecResult};
pub use format::{parse_any, Decoded, Format};
pub use structured::{from_structured, to_structured};
pub use transport::{compress, decompress, ProfileTransport, LENGTH_PREFIX};
