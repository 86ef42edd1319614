// ============================================
// File: crates/gameshard-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Everything needed to move a connection from plaintext to encrypted
//! frames: the per-connection key, the rolling frame cipher and the
//! keygen collaborator that produces fresh key material.
//!
//! ### Submodules
//! - [`keys`]: `CryptographyKey` (128-bit, zeroized on drop)
//! - [`cipher`]: `FrameCipher`, the size-preserving rolling XOR cipher
//! - [`keygen`]: `Keygen` trait with OS-backed and seeded implementations
//!
//! ## Key Flow
//! ```text
//! Keygen::generate(128) ──► CryptographyKey ──┬──► FrameCipher (inbound, enabled at once)
//!                                             │
//!                                             └─ copy ──► FrameCipher (outbound, enabled
//!                                                          after the key frame is written)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The frame cipher mutates its key after every frame, so the two
//!   directions MUST each own a separate copy
//! - This cipher is the game client's obfuscation layer, not a security
//!   boundary; do not reuse it for anything else
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod cipher;
pub mod keygen;
pub mod keys;

// Re-export primary types at module level
pub use cipher::FrameCipher;
pub use keygen::{Keygen, SecureKeygen, SeededKeygen};
pub use keys::CryptographyKey;

// ============================================
// Constants
// ============================================

/// Size of a connection key in bytes.
pub const KEY_SIZE: usize = 16;

/// Size of a connection key in bits, as requested from the keygen.
pub const KEY_BITS: usize = KEY_SIZE * 8;
