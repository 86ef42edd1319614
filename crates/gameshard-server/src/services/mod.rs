// ============================================
// File: crates/gameshard-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! The game services that make up the service graph, plus the
//! per-connection session state they share.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`session`]: Connection sessions and their ordered writer
//! - [`keygen`]: Connection key generation
//! - [`database`]: Item persistence
//! - [`world`]: Spawned objects, characters, object ids
//! - [`item`]: Pickup, drop, split and stack rules
//! - [`network`]: TCP listener and connection tasks
//!
//! ## Service Graph
//! ```text
//!                 ┌──────────┐
//!                 │ network  │
//!                 └────┬─────┘
//!        ┌─────────────┼──────────────┬───────────┐
//!        ▼             ▼              ▼           ▼
//!   ┌────────┐   ┌──────────┐   ┌─────────┐  ┌────────┐
//!   │ keygen │   │   item   │   │  world  │  │database│
//!   └────────┘   └────┬─────┘   └─────────┘  └────────┘
//!                     ├──────────────▲            ▲
//!                     └───────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Services never start each other; declare the dependency and let
//!   the `ServiceManager` order the hooks
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod database;
pub mod item;
pub mod keygen;
pub mod network;
pub mod session;
pub mod world;

// Re-export primary types
pub use database::{DatabaseService, InMemoryItemStore, ItemStore};
pub use item::ItemService;
pub use keygen::KeygenService;
pub use network::{NetworkService, NetworkSettings};
pub use session::{AfterWrite, Session, SessionManager, SessionStage, WriteCompletion};
pub use world::WorldService;
