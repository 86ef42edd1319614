// ============================================
// File: crates/gameshard-server/src/handlers/character_action.rs
// ============================================
//! # Character Action Handler
//!
//! ## Creation Reason
//! Clicks on world objects. For ground items this is the pickup entry
//! point, so several connections may hit the same item concurrently.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Losing a pickup race is normal gameplay, not a protocol error; item
//!   rule violations are logged at debug and the connection stays open
//!
//! ## Last Modified
//! v0.1.0 - Initial character action handling

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use gameshard_common::types::ObjectId;
use gameshard_core::protocol::{CharacterActionRequest, ClientPacket};

use super::ClientPacketHandler;
use crate::error::{Result, ServerError};
use crate::services::{ItemService, Session, WorldService};

/// Handles character actions on world objects.
#[derive(Debug)]
pub struct CharacterActionHandler {
    world: Arc<WorldService>,
    items: Arc<ItemService>,
}

impl CharacterActionHandler {
    /// Creates the handler.
    pub fn new(world: Arc<WorldService>, items: Arc<ItemService>) -> Self {
        Self { world, items }
    }
}

impl ClientPacketHandler for CharacterActionHandler {
    fn name(&self) -> &'static str {
        "character_action"
    }

    fn handle(&self, session: &Arc<Session>, mut body: Bytes) -> Result<()> {
        let request = CharacterActionRequest::read(&mut body)?;

        let character = session
            .character()
            .and_then(|id| self.world.character(id))
            .ok_or(ServerError::NotAuthenticated {
                connection: session.id(),
            })?;

        let target = ObjectId::new(request.object_id);
        let Some(item) = self.world.ground_item(target) else {
            debug!(connection = %session.id(), object = %target, "Action on unknown object");
            return Ok(());
        };

        match self.items.action(&item, &character, request.action) {
            Ok(result) => {
                trace!(
                    connection = %session.id(),
                    object = %target,
                    result = %result.id(),
                    "Character action done"
                );
                Ok(())
            }
            Err(e) if e.is_rule_violation() => {
                debug!(connection = %session.id(), object = %target, error = %e, "Character action refused");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    use gameshard_common::types::{ConnectionId, TemplateId};
    use gameshard_core::protocol::CharacterAction;
    use gameshard_transport::MockTransport;

    use crate::model::{Character, Item, ItemLocation, Point3D};
    use crate::services::DatabaseService;

    struct Fixture {
        world: Arc<WorldService>,
        handler: CharacterActionHandler,
    }

    fn fixture() -> Fixture {
        let world = Arc::new(WorldService::new());
        let items = Arc::new(ItemService::new(
            Arc::clone(&world),
            Arc::new(DatabaseService::in_memory()),
        ));
        Fixture {
            handler: CharacterActionHandler::new(Arc::clone(&world), items),
            world,
        }
    }

    fn body(object_id: i32, action: CharacterAction) -> Bytes {
        let mut buf = BytesMut::new();
        CharacterActionRequest {
            object_id,
            origin: [0, 0, 0],
            action,
        }
        .write_body(&mut buf);
        buf.freeze()
    }

    fn logged_in(f: &Fixture, id: i32) -> (Arc<Session>, Arc<Character>) {
        let character = Arc::new(Character::new(ObjectId::new(id), format!("char{id}")));
        f.world.add_character(Arc::clone(&character));
        let session = Session::new(ConnectionId::next(), Arc::new(MockTransport::new()));
        session.attach_character(character.id());
        (session, character)
    }

    #[tokio::test]
    async fn test_click_picks_up() {
        let f = fixture();
        let item = Arc::new(Item::on_ground(ObjectId::new(500), TemplateId::new(57), 1, Point3D::default()));
        f.world.spawn(Arc::clone(&item)).unwrap();
        let (session, character) = logged_in(&f, 1);

        f.handler.handle(&session, body(500, CharacterAction::Click)).unwrap();

        assert_eq!(item.lock().location, ItemLocation::Inventory);
        assert!(character.inventory().contains(item.id()));
    }

    #[tokio::test]
    async fn test_second_click_is_refused_quietly() {
        let f = fixture();
        let item = Arc::new(Item::on_ground(ObjectId::new(500), TemplateId::new(57), 1, Point3D::default()));
        f.world.spawn(Arc::clone(&item)).unwrap();
        let (first, _) = logged_in(&f, 1);
        let (second, late) = logged_in(&f, 2);

        f.handler.handle(&first, body(500, CharacterAction::Click)).unwrap();
        // Unspawned now: unknown object, still not an error
        f.handler.handle(&second, body(500, CharacterAction::Click)).unwrap();
        assert!(late.inventory().is_empty());
        assert!(!second.is_closed());
    }

    #[tokio::test]
    async fn test_requires_character() {
        let f = fixture();
        let session = Session::new(ConnectionId::next(), Arc::new(MockTransport::new()));

        let err = f.handler.handle(&session, body(1, CharacterAction::Click)).unwrap_err();
        assert!(matches!(err, ServerError::NotAuthenticated { .. }));
        assert!(!err.closes_connection());
    }

    #[tokio::test]
    async fn test_truncated_body_is_protocol_error() {
        let f = fixture();
        let (session, _) = logged_in(&f, 1);

        let err = f.handler.handle(&session, Bytes::from_static(&[1, 2, 3])).unwrap_err();
        assert!(err.closes_connection());
    }
}
