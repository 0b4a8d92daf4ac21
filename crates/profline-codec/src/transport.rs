//! Compressed transport envelope.
//!
//! ```text
//! [4 bytes: uncompressed length (little-endian u32)]
//! [N bytes: gzip stream of the UTF-8 command-block text]
//! ```
//!
//! The receiver sizes its output buffer from the prefix before inflating,
//! stops inflating one byte past it, and rejects payloads whose inflated
//! length disagrees with it.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use profline_core::{line, Profile};

use crate::error::{CodecError, CodecResult};

/// Size of the length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Upper bound on the buffer reserved up front from an untrusted prefix.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Compress a profile into a transport envelope.
pub fn compress(profile: &Profile) -> CodecResult<Bytes> {
    line::check_profile(profile)?;
    let text = profile.to_command_block();
    let raw = text.as_bytes();
    let length = u32::try_from(raw.len()).map_err(|_| {
        CodecError::Envelope(format!("{} bytes do not fit the length prefix", raw.len()))
    })?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    let compressed = encoder.finish()?;

    let mut out = BytesMut::with_capacity(LENGTH_PREFIX + compressed.len());
    out.put_u32_le(length);
    out.put_slice(&compressed);

    debug!(raw = raw.len(), compressed = compressed.len(), "profile compressed");
    Ok(out.freeze())
}

/// Decompress a transport envelope back into a profile.
pub fn decompress(data: &[u8]) -> CodecResult<Profile> {
    if data.len() < LENGTH_PREFIX {
        return Err(CodecError::Envelope(format!(
            "need at least {LENGTH_PREFIX} bytes, have {}",
            data.len()
        )));
    }

    let mut header = &data[..LENGTH_PREFIX];
    let expected = header.get_u32_le() as usize;

    let mut raw = Vec::with_capacity(expected.min(MAX_PREALLOC));
    GzDecoder::new(&data[LENGTH_PREFIX..])
        .take(expected as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(|e| CodecError::Decompression(e.to_string()))?;

    if raw.len() > expected {
        return Err(CodecError::Envelope(format!(
            "payload inflates past the {expected}-byte length prefix"
        )));
    }
    if raw.len() != expected {
        return Err(CodecError::Envelope(format!(
            "length prefix says {expected} bytes, payload inflated to {}",
            raw.len()
        )));
    }

    let text = String::from_utf8(raw)?;
    Ok(Profile::parse(&text)?)
}

/// Transport encoding as methods on [`Profile`].
pub trait ProfileTransport: Sized {
    fn compress(&self) -> CodecResult<Bytes>;
    fn decompress(data: &[u8]) -> CodecResult<Self>;
}

impl ProfileTransport for Profile {
    fn compress(&self) -> CodecResult<Bytes> {
        compress(self)
    }

    fn decompress(data: &[u8]) -> CodecResult<Self> {
        decompress(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        let mut p = Profile::new();
        p.push("-Name", "Alice Smith");
        p.push("-Task", "renew");
        p.push("-Task", "notify");
        p.push("-Notes", "line1\nline2");
        p
    }

    #[test]
    fn envelope_carries_uncompressed_length() {
        let p = sample();
        let packed = p.compress().unwrap();
        let expected = p.to_command_block().len() as u32;
        assert_eq!(&packed[..4], &expected.to_le_bytes());
        // gzip magic follows the prefix
        assert_eq!(&packed[4..6], &[0x1f, 0x8b]);
    }

    #[test]
    fn roundtrip() {
        let p = sample();
        let back = Profile::decompress(&p.compress().unwrap()).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn empty_profile_roundtrips() {
        let packed = compress(&Profile::new()).unwrap();
        assert_eq!(&packed[..4], &[0, 0, 0, 0]);
        assert!(decompress(&packed).unwrap().is_empty());
    }

    #[test]
    fn rejects_short_envelope() {
        assert!(matches!(decompress(&[1, 0]).unwrap_err(), CodecError::Envelope(_)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut packed = compress(&sample()).unwrap().to_vec();
        packed[0] = packed[0].wrapping_add(1);
        assert!(matches!(decompress(&packed).unwrap_err(), CodecError::Envelope(_)));
    }

    #[test]
    fn stops_inflating_past_the_prefix() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&vec![b'a'; 8 * 1024 * 1024]).unwrap();
        let payload = encoder.finish().unwrap();

        let mut packed = 1u32.to_le_bytes().to_vec();
        packed.extend_from_slice(&payload);
        match decompress(&packed).unwrap_err() {
            CodecError::Envelope(msg) => assert!(msg.contains("inflates past"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_corrupt_payload() {
        let mut packed = compress(&sample()).unwrap().to_vec();
        packed.truncate(8);
        assert!(matches!(
            decompress(&packed).unwrap_err(),
            CodecError::Decompression(_)
        ));
    }
}
