// ============================================
// File: crates/gameshard-server/src/model/mod.rs
// ============================================
//! # Game Model
//!
//! ## Creation Reason
//! The game objects the services operate on.
//!
//! ### Submodules
//! - [`item`]: Items, their locked state and persisted records
//! - [`character`]: Characters and inventories
//!
//! ## Last Modified
//! v0.1.0 - Initial model

pub mod character;
pub mod item;

pub use character::{Character, Inventory};
pub use item::{Item, ItemLocation, ItemRecord, ItemState, Point3D};
