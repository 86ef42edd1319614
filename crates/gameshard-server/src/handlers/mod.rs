// ============================================
// File: crates/gameshard-server/src/handlers/mod.rs
// ============================================
//! # Packet Handlers
//!
//! ## Creation Reason
//! Client packet processing: the dispatch table and the handlers behind
//! each client opcode.
//!
//! ### Submodules
//! - [`dispatch`]: Handler trait, opcode table and inbound pipeline
//! - [`protocol_version`]: Handshake (key announcement)
//! - [`character_action`]: Clicks on world objects
//!
//! ## Opcode Table
//! ```text
//! 0x00  ProtocolVersion   → ProtocolVersionHandler
//! 0x1f  CharacterAction   → CharacterActionHandler
//! ----  anything else     → logged, discarded
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers

pub mod character_action;
pub mod dispatch;
pub mod protocol_version;

use std::sync::Arc;

use gameshard_core::protocol::{ClientOpcode, ProtocolVersion};

pub use character_action::CharacterActionHandler;
pub use dispatch::{ClientPacketHandler, InboundPipeline, PacketDispatcher, PacketDispatcherBuilder};
pub use protocol_version::ProtocolVersionHandler;

use crate::services::{ItemService, KeygenService, WorldService};

/// Builds the dispatch table for game connections.
pub fn game_dispatcher(
    keygen: Arc<KeygenService>,
    world: Arc<WorldService>,
    items: Arc<ItemService>,
    supported: ProtocolVersion,
) -> PacketDispatcher {
    PacketDispatcher::builder()
        .register(
            ClientOpcode::ProtocolVersion,
            Arc::new(ProtocolVersionHandler::new(keygen, supported)),
        )
        .register(
            ClientOpcode::CharacterAction,
            Arc::new(CharacterActionHandler::new(world, items)),
        )
        .build()
}
