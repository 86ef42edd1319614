// ============================================
// File: crates/gameshard-common/src/lib.rs
// ============================================
//! # Gameshard Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Holds the identifiers, time helpers and base error type that every
//! other gameshard crate builds on.
//!
//! ## Main Functionality
//! - [`types`]: Connection and game object identifiers, object id allocation
//! - [`time`]: Lock-free activity timestamps
//! - [`error`]: Common error type and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              gameshard-server                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   gameshard-core       gameshard-transport          │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │            gameshard-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal (serde + thiserror only)
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{ConnectionId, ObjectId, ObjectIdAllocator, TemplateId};
