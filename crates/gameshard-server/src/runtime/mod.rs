// ============================================
// File: crates/gameshard-server/src/runtime/mod.rs
// ============================================
//! # Service Graph Runtime
//!
//! ## Creation Reason
//! The server is a graph of services with declared dependencies. This
//! module builds them from a typed registry and starts, stops and
//! restarts them in dependency order.
//!
//! ### Submodules
//! - [`service`]: `Service` trait, ids and lifecycle states
//! - [`registry`]: Factory table filled at bootstrap
//! - [`manager`]: The runtime context driving lifecycles
//!
//! ## Lifecycle
//! ```text
//!            start()                 hook ok
//! Stopped ─────────────► Starting ──────────► Started
//!    ▲                      │                    │
//!    │       hook failed    │                    │ stop()
//!    └──────────────────────┘                    ▼
//!    ▲                 hook ok              Stopping
//!    └───────────────────────────────────────────┤
//!                       hook failed: back to Started
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial runtime

pub mod manager;
pub mod registry;
pub mod service;

pub use manager::{ServiceManager, ServiceResult};
pub use registry::ServiceRegistry;
pub use service::{NamedService, Service, ServiceId, ServiceState};
