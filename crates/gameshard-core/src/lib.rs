// ============================================
// File: crates/gameshard-core/src/lib.rs
// ============================================
//! # Gameshard Core - Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Holds everything about the game wire format that does not need I/O:
//! framing, opcodes, packet layouts and the frame cipher.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Length-prefixed frame codec
//! - Client and server opcodes, packet parsing and serialization
//! - Protocol revision handling
//!
//! ### Crypto Module ([`crypto`])
//! - `CryptographyKey` (128-bit, zeroized on drop)
//! - `FrameCipher` (rolling XOR used by the game client)
//! - `Keygen` collaborator with secure and seeded implementations
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              gameshard-server                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   gameshard-core  ◄──  gameshard-transport          │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │            gameshard-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No sockets, no tasks, no logging here; keep it pure
//! - Packet layouts are dictated by the client and cannot change freely
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use crypto::{CryptographyKey, FrameCipher, Keygen, SecureKeygen, SeededKeygen};
pub use error::{CoreError, Result};
pub use protocol::{
    ClientOpcode, FrameCodec, KeyAnnouncement, ProtocolVersion, ServerOpcode,
    DEFAULT_SUPPORTED_VERSION,
};
