//! Length-prefixed framing for `tokio_util::codec`.
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ len: u32 BE  │ payload: len bytes UTF-8 │
//! └──────────────┴──────────────────────────┘
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FramingError;

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Upper bound on a single payload. Real messages are a few hundred bytes;
/// this only guards allocation against a corrupt prefix.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Codec turning a byte stream into UTF-8 text frames and back.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Codec with a custom payload ceiling.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    fn declared_len(src: &BytesMut) -> Option<usize> {
        let prefix: [u8; LENGTH_PREFIX] = src.get(..LENGTH_PREFIX)?.try_into().ok()?;
        Some(u32::from_be_bytes(prefix) as usize)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(len) = Self::declared_len(src) else {
            return Ok(None);
        };
        if len > self.max_frame_len {
            return Err(FramingError::FrameTooLarge {
                size: len,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_PREFIX + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let payload = src.split_to(len);
        Ok(Some(String::from_utf8(payload.to_vec())?))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let expected = match Self::declared_len(src) {
            Some(len) => LENGTH_PREFIX + len,
            None => LENGTH_PREFIX,
        };
        Err(FramingError::Truncated {
            expected,
            actual: src.len(),
        })
    }
}

impl Encoder<String> for FrameCodec {
    type Error = FramingError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.as_bytes();
        if payload.len() > self.max_frame_len {
            return Err(FramingError::FrameTooLarge {
                size: payload.len(),
                max: self.max_frame_len,
            });
        }
        dst.reserve(LENGTH_PREFIX + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.extend_from_slice(payload);
        Ok(())
    }
}

/// Encode a single payload into its wire form.
pub fn encode_frame(payload: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(payload.as_bytes());
    buf.freeze()
}

// ── Tests ────────────────────────────────────────────────────────
