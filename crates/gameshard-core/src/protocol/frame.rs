// ============================================
// File: crates/gameshard-core/src/protocol/frame.rs
// ============================================
//! # Frame Codec
//!
//! ## Creation Reason
//! TCP delivers a byte stream; the game protocol is a sequence of
//! length-prefixed frames. This codec cuts complete frames out of an
//! accumulating read buffer and builds outbound frames.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────┬────────┬──────────────────────────┐
//! │ length u16LE │ opcode │ body                     │
//! │ (2 bytes)    │ 1 byte │ length - 3 bytes         │
//! └──────────────┴────────┴──────────────────────────┘
//!   length counts itself, so the payload is length - 2 bytes
//! ```
//!
//! ## Parsing Strategy
//! 1. Wait until the 2-byte header is buffered
//! 2. Reject declared lengths that cannot hold an opcode
//! 3. Wait until the whole frame is buffered
//! 4. Split the frame off the buffer; leftover bytes stay for the next call
//!
//! ## ⚠️ Important Note for Next Developer
//! - The codec never decrypts; the caller decrypts the returned payload
//! - A partial frame is NEVER returned, no matter how the stream is split
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Size of the little-endian length prefix.
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Smallest valid frame: length prefix plus opcode.
pub const MIN_FRAME_SIZE: usize = LENGTH_FIELD_SIZE + 1;

/// Largest frame the u16 length prefix can describe.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Largest payload (opcode + body) that fits into one frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - LENGTH_FIELD_SIZE;

// ============================================
// FrameCodec
// ============================================

/// Length-prefixed frame codec.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use gameshard_core::protocol::FrameCodec;
///
/// let codec = FrameCodec::new();
/// let mut wire = BytesMut::new();
/// codec.encode(&[0x00, 0xd8, 0x00], &mut wire).unwrap();
///
/// let payload = codec.decode(&mut wire).unwrap().unwrap();
/// assert_eq!(&payload[..], &[0x00, 0xd8, 0x00]);
/// assert!(wire.is_empty());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new frame codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks whether `buf` starts with a complete frame.
    ///
    /// # Returns
    /// - `Ok(Some(len))` - A complete frame of `len` bytes (prefix included)
    /// - `Ok(None)` - More data is needed
    /// - `Err(_)` - The header declares an impossible length
    pub fn check_complete(buf: &[u8]) -> Result<Option<usize>> {
        if buf.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        let declared = usize::from(u16::from_le_bytes([buf[0], buf[1]]));
        if declared < MIN_FRAME_SIZE {
            return Err(CoreError::MalformedFrame {
                declared,
                minimum: MIN_FRAME_SIZE,
            });
        }

        if buf.len() >= declared {
            Ok(Some(declared))
        } else {
            Ok(None)
        }
    }

    /// Splits the next complete frame off `buf` and returns its payload.
    ///
    /// The returned payload starts with the opcode and is still encrypted
    /// if the peer encrypts.
    ///
    /// # Errors
    /// Returns `MalformedFrame` when the header is invalid. The buffer is
    /// left untouched in that case.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<BytesMut>> {
        match Self::check_complete(buf)? {
            Some(len) => {
                let mut frame = buf.split_to(len);
                frame.advance(LENGTH_FIELD_SIZE);
                Ok(Some(frame))
            }
            None => {
                if buf.len() >= LENGTH_FIELD_SIZE {
                    // Avoid reallocating once per read for large frames
                    let declared = usize::from(u16::from_le_bytes([buf[0], buf[1]]));
                    buf.reserve(declared - buf.len());
                }
                Ok(None)
            }
        }
    }

    /// Appends one frame carrying `payload` to `dst`.
    ///
    /// # Errors
    /// - `MessageTooShort`: empty payload (no opcode)
    /// - `FrameTooLarge`: payload longer than [`MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.is_empty() {
            return Err(CoreError::too_short(1, 0));
        }
        let total = payload.len() + LENGTH_FIELD_SIZE;
        let length = u16::try_from(total).map_err(|_| CoreError::FrameTooLarge {
            max: MAX_FRAME_SIZE,
            actual: total,
        })?;

        dst.reserve(total);
        dst.put_u16_le(length);
        dst.put_slice(payload);
        Ok(())
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Builds a standalone frame around `payload`.
///
/// # Errors
/// See [`FrameCodec::encode`].
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(payload.len() + LENGTH_FIELD_SIZE);
    FrameCodec.encode(payload, &mut buf)?;
    Ok(buf)
}

// ============================================
// Tests
// ============================================
