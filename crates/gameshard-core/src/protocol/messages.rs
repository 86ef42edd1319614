// ============================================
// File: crates/gameshard-core/src/protocol/messages.rs
// ============================================
//! # Packet Definitions
//!
//! ## Creation Reason
//! Defines the opcodes and packet bodies exchanged between the game
//! client and the server.
//!
//! ## Main Functionality
//! - `ClientOpcode` / `ServerOpcode`: First payload byte of every frame
//! - `ClientPacket` / `ServerPacket`: Parse and serialize packet bodies
//! - `ProtocolVersionRequest`: Client declares its protocol revision
//! - `CharacterActionRequest`: Client clicks on a game object
//! - `KeyAnnouncement`: Server sends the connection key and verdict
//!
//! ## Packet Sizes (body, opcode excluded)
//! | Packet | Opcode | Size (bytes) |
//! |--------|--------|--------------|
//! | ProtocolVersionRequest | 0x00 | 2 |
//! | CharacterActionRequest | 0x1f | 17 |
//! | KeyAnnouncement | 0x2e | 17 |
//!
//! ## Wire Format (Little Endian)
//! All multi-byte integers are encoded in little-endian byte order.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Opcode values are fixed by the game client - DO NOT renumber
//! - Client packets may carry trailing bytes; parsers ignore them
//!
//! ## Last Modified
//! v0.1.0 - Initial packet definitions

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::version::ProtocolVersion;
use crate::crypto::{CryptographyKey, KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// Packet Size Constants
// ============================================

/// Body size of the protocol version declaration.
pub const PROTOCOL_VERSION_BODY_SIZE: usize = 2;

/// Body size of a character action.
pub const CHARACTER_ACTION_BODY_SIZE: usize = 4 + 3 * 4 + 1;

/// Body size of the key announcement.
pub const KEY_ANNOUNCEMENT_BODY_SIZE: usize = KEY_SIZE + 1;

// ============================================
// Opcodes
// ============================================

/// Opcodes of packets sent by the client.
///
/// # Values
/// | Value | Packet |
/// |-------|--------|
/// | 0x00 | ProtocolVersion |
/// | 0x1f | CharacterAction |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientOpcode {
    /// Protocol version declaration, first packet of every connection.
    ProtocolVersion = 0x00,
    /// Click or shift-click on a game object.
    CharacterAction = 0x1f,
}

impl ClientOpcode {
    /// Converts a byte to a `ClientOpcode`.
    ///
    /// # Returns
    /// - `Some(ClientOpcode)` if the byte is a known opcode
    /// - `None` if the byte is unknown
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::ProtocolVersion),
            0x1f => Some(Self::CharacterAction),
            _ => None,
        }
    }

    /// Converts the opcode to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for ClientOpcode {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(value)
    }
}

impl From<ClientOpcode> for u8 {
    fn from(opcode: ClientOpcode) -> Self {
        opcode.as_byte()
    }
}

/// Opcodes of packets sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerOpcode {
    /// Connection key and protocol verdict.
    KeyAnnouncement = 0x2e,
}

impl ServerOpcode {
    /// Converts the opcode to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }
}

impl From<ServerOpcode> for u8 {
    fn from(opcode: ServerOpcode) -> Self {
        opcode.as_byte()
    }
}

// ============================================
// Packet Traits
// ============================================

/// A packet the server sends to the client.
pub trait ServerPacket {
    /// Opcode written before the body.
    const OPCODE: ServerOpcode;

    /// Appends the packet body (without opcode) to `buf`.
    fn write_body(&self, buf: &mut BytesMut);

    /// Serializes opcode and body into a frame payload.
    fn to_payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u8(Self::OPCODE.as_byte());
        self.write_body(&mut buf);
        buf
    }
}

/// A packet the client sends to the server.
pub trait ClientPacket: Sized {
    /// Opcode this packet is dispatched on.
    const OPCODE: ClientOpcode;

    /// Parses the packet body (opcode already stripped).
    ///
    /// # Errors
    /// Returns a protocol error if the body is truncated or invalid.
    fn read(body: &mut Bytes) -> Result<Self>;
}

fn ensure_remaining(body: &Bytes, expected: usize) -> Result<()> {
    if body.remaining() < expected {
        return Err(CoreError::too_short(expected, body.remaining()));
    }
    Ok(())
}

// ============================================
// ProtocolVersionRequest
// ============================================

/// Client's protocol version declaration.
///
/// # Wire Format (2 bytes)
/// ```text
/// ┌──────────────────────────────────┐
/// │ version (2 bytes)    │ u16 LE    │
/// └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersionRequest {
    /// Declared protocol revision.
    pub version: ProtocolVersion,
}

impl ClientPacket for ProtocolVersionRequest {
    const OPCODE: ClientOpcode = ClientOpcode::ProtocolVersion;

    fn read(body: &mut Bytes) -> Result<Self> {
        ensure_remaining(body, PROTOCOL_VERSION_BODY_SIZE)?;
        Ok(Self {
            version: ProtocolVersion::new(body.get_u16_le()),
        })
    }
}

// ============================================
// CharacterActionRequest
// ============================================

/// Kind of click the client performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CharacterAction {
    /// Plain click: interact with the object.
    Click = 0,
    /// Shift-click: inspect only.
    ShiftClick = 1,
}

impl TryFrom<u8> for CharacterAction {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Click),
            1 => Ok(Self::ShiftClick),
            other => Err(CoreError::invalid_field(
                "action",
                format!("unknown action id {other}"),
            )),
        }
    }
}

/// Client clicked on a game object.
///
/// # Wire Format (17 bytes)
/// ```text
/// ┌──────────────────────────────────┐
/// │ object_id (4 bytes)  │ i32 LE    │
/// ├──────────────────────────────────┤
/// │ origin_x (4 bytes)   │ i32 LE    │
/// │ origin_y (4 bytes)   │ i32 LE    │
/// │ origin_z (4 bytes)   │ i32 LE    │
/// ├──────────────────────────────────┤
/// │ action (1 byte)      │ 0 / 1     │
/// └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterActionRequest {
    /// Target object.
    pub object_id: i32,
    /// Client-side position of the character when it clicked.
    pub origin: [i32; 3],
    /// Click kind.
    pub action: CharacterAction,
}

impl CharacterActionRequest {
    /// Appends the wire body; clients and tests use it to build requests.
    pub fn write_body(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.object_id);
        for coordinate in self.origin {
            buf.put_i32_le(coordinate);
        }
        buf.put_u8(self.action as u8);
    }
}

impl ClientPacket for CharacterActionRequest {
    const OPCODE: ClientOpcode = ClientOpcode::CharacterAction;

    fn read(body: &mut Bytes) -> Result<Self> {
        ensure_remaining(body, CHARACTER_ACTION_BODY_SIZE)?;
        let object_id = body.get_i32_le();
        let origin = [body.get_i32_le(), body.get_i32_le(), body.get_i32_le()];
        let action = CharacterAction::try_from(body.get_u8())?;
        Ok(Self {
            object_id,
            origin,
            action,
        })
    }
}

// ============================================
// KeyAnnouncement
// ============================================

/// Server's answer to the protocol version declaration.
///
/// Always sent in plaintext. Carries the connection key whether or not
/// the version was accepted.
///
/// # Wire Format (17 bytes)
/// ```text
/// ┌──────────────────────────────────┐
/// │ key (16 bytes)       │ raw       │
/// ├──────────────────────────────────┤
/// │ accepted (1 byte)    │ 0 / 1     │
/// └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAnnouncement {
    /// Connection key, as generated for this session.
    pub key: CryptographyKey,
    /// Whether the declared protocol version is supported.
    pub accepted: bool,
}

impl KeyAnnouncement {
    /// Creates an announcement.
    #[must_use]
    pub const fn new(key: CryptographyKey, accepted: bool) -> Self {
        Self { key, accepted }
    }

    /// Parses an announcement body (opcode already stripped).
    ///
    /// The server never receives this packet; clients and tests do.
    ///
    /// # Errors
    /// Returns `MessageTooShort` for truncated bodies.
    pub fn decode(body: &mut Bytes) -> Result<Self> {
        ensure_remaining(body, KEY_ANNOUNCEMENT_BODY_SIZE)?;
        let key = CryptographyKey::try_from_slice(&body.split_to(KEY_SIZE))?;
        let accepted = body.get_u8() != 0;
        Ok(Self { key, accepted })
    }
}

impl ServerPacket for KeyAnnouncement {
    const OPCODE: ServerOpcode = ServerOpcode::KeyAnnouncement;

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_slice(self.key.as_bytes());
        buf.put_u8(u8::from(self.accepted));
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for opcode in [ClientOpcode::ProtocolVersion, ClientOpcode::CharacterAction] {
            assert_eq!(ClientOpcode::try_from(opcode.as_byte()), Ok(opcode));
        }
        assert_eq!(ClientOpcode::try_from(0x42), Err(0x42));
        assert_eq!(u8::from(ServerOpcode::KeyAnnouncement), 0x2e);
    }

    #[test]
    fn test_protocol_version_parse() {
        let mut body = Bytes::from_static(&[0xd8, 0x00]);
        let request = ProtocolVersionRequest::read(&mut body).unwrap();
        assert_eq!(request.version, ProtocolVersion::new(216));

        let mut short = Bytes::from_static(&[0xd8]);
        assert!(matches!(
            ProtocolVersionRequest::read(&mut short),
            Err(CoreError::MessageTooShort { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_key_announcement_layout() {
        let key = CryptographyKey::from_bytes([0x11; KEY_SIZE]);
        let payload = KeyAnnouncement::new(key.copy(), true).to_payload();

        assert_eq!(payload.len(), 1 + KEY_ANNOUNCEMENT_BODY_SIZE);
        assert_eq!(payload[0], 0x2e);
        assert_eq!(&payload[1..17], key.as_bytes());
        assert_eq!(payload[17], 1);

        let rejected = KeyAnnouncement::new(key, false).to_payload();
        assert_eq!(rejected[17], 0);

        let mut body = Bytes::copy_from_slice(&rejected[1..]);
        let decoded = KeyAnnouncement::decode(&mut body).unwrap();
        assert!(!decoded.accepted);
    }

    #[test]
    fn test_character_action_parse() {
        let request = CharacterActionRequest {
            object_id: 0x1000_0001,
            origin: [100, -200, 3000],
            action: CharacterAction::ShiftClick,
        };
        let mut buf = BytesMut::new();
        request.write_body(&mut buf);
        assert_eq!(buf.len(), CHARACTER_ACTION_BODY_SIZE);

        let mut body = buf.freeze();
        assert_eq!(CharacterActionRequest::read(&mut body).unwrap(), request);
    }

    #[test]
    fn test_character_action_rejects_unknown_action() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(1);
        buf.put_bytes(0, 12);
        buf.put_u8(7);

        let err = CharacterActionRequest::read(&mut buf.freeze()).unwrap_err();
        assert!(err.is_protocol_error());
    }
}
