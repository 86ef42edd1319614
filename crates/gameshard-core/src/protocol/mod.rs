// ============================================
// File: crates/gameshard-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the game wire protocol: how the TCP stream is cut into
//! frames, which opcodes exist and how packet bodies are laid out.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`frame`]: Length-prefixed frame codec
//! - [`messages`]: Opcodes and packet structures
//! - [`version`]: Protocol revision handling
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │                                                             │
//! │  Client ──── ProtocolVersion 0x00 (plain) ─────────► Server │
//! │  Client ◄─── KeyAnnouncement 0x2e (plain) ────────── Server │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Encrypted Phase                          │
//! │                                                             │
//! │  Client ══════ game packets (rolling XOR) ═══════════ Server │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The client encrypts everything after its version frame, while the
//!   server encrypts only after the announcement is on the wire
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod frame;
pub mod messages;
pub mod version;

// Re-export primary types
pub use frame::{encode_frame, FrameCodec, LENGTH_FIELD_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
pub use messages::{
    CharacterAction, CharacterActionRequest, ClientOpcode, ClientPacket, KeyAnnouncement,
    ProtocolVersionRequest, ServerOpcode, ServerPacket,
};
pub use version::{ProtocolVersion, DEFAULT_SUPPORTED_VERSION, FREYA_PROTOCOL_VERSION};
