// ============================================
// File: crates/gameshard-server/src/services/world.rs
// ============================================
//! # World Service
//!
//! ## Creation Reason
//! Tracks which objects are visible in the world: items lying on the
//! ground and characters in game. Also hands out object ids.
//!
//! ## Main Functionality
//! - `spawn` / `unspawn`: Ground item visibility
//! - `ground_item`: Lookup by object id for client actions
//! - Character registry
//! - Object id allocation
//!
//! ## ⚠️ Important Note for Next Developer
//! - Spawning only registers visibility; the item's own location is
//!   owned by the item rules and changed under the item lock
//!
//! ## Last Modified
//! v0.1.0 - Initial world service

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, trace};

use gameshard_common::types::{ObjectId, ObjectIdAllocator};
use gameshard_common::CommonError;

use crate::error::ItemError;
use crate::model::{Character, Item};
use crate::runtime::{NamedService, Service, ServiceId};

/// Registry of visible world objects.
#[derive(Default)]
pub struct WorldService {
    ids: ObjectIdAllocator,
    spawned: DashMap<ObjectId, Arc<Item>>,
    characters: DashMap<ObjectId, Arc<Character>>,
}

impl WorldService {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object id allocator.
    #[must_use]
    pub const fn ids(&self) -> &ObjectIdAllocator {
        &self.ids
    }

    /// Allocates a fresh object id.
    ///
    /// # Errors
    /// Returns `ResourceExhausted` once ids run out.
    pub fn allocate_id(&self) -> Result<ObjectId, CommonError> {
        self.ids.allocate()
    }

    // ========================================
    // Ground items
    // ========================================

    /// Makes `item` visible on the ground.
    ///
    /// # Errors
    /// Returns `AlreadySpawned` if an object with the same id is visible.
    pub fn spawn(&self, item: Arc<Item>) -> Result<(), ItemError> {
        match self.spawned.entry(item.id()) {
            Entry::Occupied(_) => Err(ItemError::AlreadySpawned { object: item.id() }),
            Entry::Vacant(slot) => {
                trace!(object = %item.id(), template = %item.template(), "Spawned item");
                slot.insert(item);
                Ok(())
            }
        }
    }

    /// Removes the item with `id` from the world.
    ///
    /// # Errors
    /// Returns `NotSpawned` if nothing with that id is visible.
    pub fn unspawn(&self, id: ObjectId) -> Result<Arc<Item>, ItemError> {
        let (_, item) = self
            .spawned
            .remove(&id)
            .ok_or(ItemError::NotSpawned { object: id })?;
        trace!(object = %id, "Unspawned item");
        Ok(item)
    }

    /// Returns the visible item with `id`.
    #[must_use]
    pub fn ground_item(&self, id: ObjectId) -> Option<Arc<Item>> {
        self.spawned.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if an object with `id` is visible.
    #[must_use]
    pub fn is_spawned(&self, id: ObjectId) -> bool {
        self.spawned.contains_key(&id)
    }

    /// Returns the number of visible items.
    #[must_use]
    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    // ========================================
    // Characters
    // ========================================

    /// Registers a character in game. Replaces any previous entry.
    pub fn add_character(&self, character: Arc<Character>) {
        self.ids.reserve_through(character.id());
        debug!(character = %character.id(), name = character.name(), "Character entered world");
        self.characters.insert(character.id(), character);
    }

    /// Returns the character with `id`.
    #[must_use]
    pub fn character(&self, id: ObjectId) -> Option<Arc<Character>> {
        self.characters.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes the character with `id`.
    pub fn remove_character(&self, id: ObjectId) -> Option<Arc<Character>> {
        self.characters.remove(&id).map(|(_, character)| character)
    }

    /// Returns the number of characters in game.
    #[must_use]
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }
}

#[async_trait]
impl Service for WorldService {
    async fn start(&self) -> anyhow::Result<()> {
        info!("World ready");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let characters = self.characters.len();
        self.characters.clear();
        info!(characters, items = self.spawned.len(), "World stopped");
        Ok(())
    }
}

impl NamedService for WorldService {
    const ID: ServiceId = ServiceId::new("world");
}

impl fmt::Debug for WorldService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldService")
            .field("spawned", &self.spawned.len())
            .field("characters", &self.characters.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point3D;
    use gameshard_common::types::TemplateId;

    fn adena(id: i32) -> Arc<Item> {
        Arc::new(Item::on_ground(ObjectId::new(id), TemplateId::new(57), 1, Point3D::default()))
    }

    #[test]
    fn test_spawn_rules() {
        let world = WorldService::new();

        world.spawn(adena(5)).unwrap();
        assert!(world.is_spawned(ObjectId::new(5)));
        assert!(matches!(
            world.spawn(adena(5)),
            Err(ItemError::AlreadySpawned { object }) if object == ObjectId::new(5)
        ));

        world.unspawn(ObjectId::new(5)).unwrap();
        assert!(matches!(
            world.unspawn(ObjectId::new(5)),
            Err(ItemError::NotSpawned { .. })
        ));
        assert!(world.ground_item(ObjectId::new(5)).is_none());
    }

    #[test]
    fn test_character_registry_reserves_ids() {
        let world = WorldService::new();
        let high = ObjectId::new(0x2000_0000);
        world.add_character(Arc::new(Character::new(high, "Kain")));

        assert!(world.character(high).is_some());
        assert!(world.allocate_id().unwrap() > high);
        assert!(world.remove_character(high).is_some());
        assert_eq!(world.character_count(), 0);
    }
}
