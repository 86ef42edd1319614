// ============================================
// File: crates/gameshard-server/src/services/item.rs
// ============================================
//! # Item Service
//!
//! ## Creation Reason
//! Implements the item rules: picking items up from the ground,
//! dropping them, splitting and stacking. Several connections can act
//! on the same ground item at once, so every rule runs under the item's
//! scoped lock.
//!
//! ## Main Functionality
//! - `pick_up`: Ground to inventory, merging into an existing stack
//! - `drop`: Inventory to ground, splitting when only part is dropped
//! - `split` / `stack`: Stack arithmetic
//! - `action`: Entry point for client character actions
//!
//! ## Pickup Race
//! ```text
//! conn A: lock(item) ── on ground? yes ── move to inventory ── unlock
//! conn B:        lock(item) (waits) ────────────────────────── on ground? no → NotOnGround
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Lock order is item first, then inventory; never the other way round
//! - While holding an item lock at most one other item (an inventory
//!   stack or a freshly split item) may be locked, and holders of such a
//!   lock never wait on another item
//! - The item lock is a `parking_lot` guard: it is released on every
//!   exit path, including early `?` returns
//!
//! ## Last Modified
//! v0.1.0 - Initial item rules

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use gameshard_common::types::ObjectId;
use gameshard_core::protocol::CharacterAction;

use crate::error::ItemError;
use crate::model::{Character, Item, ItemLocation, ItemRecord, ItemState, Point3D};
use crate::runtime::{NamedService, Service, ServiceId};
use crate::services::database::ItemStore;
use crate::services::{DatabaseService, WorldService};

/// Result type for item rules.
pub type ItemResult<T> = std::result::Result<T, ItemError>;

const DEPENDENCIES: [ServiceId; 2] = [WorldService::ID, DatabaseService::ID];

/// Item rules service.
pub struct ItemService {
    world: Arc<WorldService>,
    database: Arc<DatabaseService>,
    /// Items this service put on the ground.
    ground: Mutex<HashMap<ObjectId, Arc<Item>>>,
}

impl ItemService {
    /// Creates the service.
    pub fn new(world: Arc<WorldService>, database: Arc<DatabaseService>) -> Self {
        Self {
            world,
            database,
            ground: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of items this service keeps on the ground.
    #[must_use]
    pub fn ground_count(&self) -> usize {
        self.ground.lock().len()
    }

    /// Handles a character action on `item`.
    ///
    /// A click picks the item up. A shift-click only inspects it and
    /// leaves everything unchanged.
    ///
    /// # Errors
    /// See [`ItemService::pick_up`].
    pub fn action(
        &self,
        item: &Arc<Item>,
        character: &Character,
        action: CharacterAction,
    ) -> ItemResult<Arc<Item>> {
        match action {
            CharacterAction::Click => self.pick_up(item, character),
            CharacterAction::ShiftClick => Ok(Arc::clone(item)),
        }
    }

    /// Moves a ground item into `character`'s inventory.
    ///
    /// If the inventory already holds a stack of the same template the
    /// picked count is merged into it and the picked item is deleted.
    /// Returns the inventory item that now holds the count.
    ///
    /// Nothing changes when the store fails: the item stays on the
    /// ground and the inventory is untouched.
    ///
    /// # Errors
    /// - `NotOnGround`: someone else picked it up first, or it was never dropped
    /// - `NotSpawned`: the item is not visible in the world
    /// - `Persistence`: the store failed
    pub fn pick_up(&self, item: &Arc<Item>, character: &Character) -> ItemResult<Arc<Item>> {
        let mut state = item.lock();
        if state.location != ItemLocation::Ground {
            return Err(ItemError::NotOnGround { item: item.id() });
        }

        self.world.unspawn(item.id())?;

        let picked = ItemState {
            location: ItemLocation::Inventory,
            owner: Some(character.id()),
            position: None,
            ..state.clone()
        };
        let existing = character
            .inventory()
            .items_of(item.template())
            .into_iter()
            .find(|stack| stack.id() != item.id());

        let result = match existing {
            Some(stack) => {
                let mut stack_state = stack.lock();
                let merged = ItemState {
                    count: stack_state.count + picked.count,
                    ..stack_state.clone()
                };
                if let Err(e) = self.persist_merge(item, &stack, &stack_state, &merged) {
                    self.respawn(item);
                    return Err(e);
                }
                *stack_state = merged;
                *state = ItemState { count: 0, ..picked };
                Arc::clone(&stack)
            }
            None => {
                if let Err(e) = self.database.items().save(&ItemRecord::capture(item, &picked)) {
                    self.respawn(item);
                    return Err(e.into());
                }
                *state = picked;
                character.inventory().add(Arc::clone(item));
                Arc::clone(item)
            }
        };

        self.ground.lock().remove(&item.id());
        debug!(
            item = %item.id(),
            into = %result.id(),
            character = %character.id(),
            "Item picked up"
        );
        Ok(result)
    }

    /// Drops `count` of `item` from `character`'s inventory at `point`.
    ///
    /// Dropping the whole stack moves the item itself. Dropping part of
    /// it splits off a new item that goes to the ground. Returns the item
    /// now lying on the ground.
    ///
    /// Nothing changes when the store fails: the stack stays in the
    /// inventory with its full count and nothing is spawned.
    ///
    /// # Errors
    /// - `AlreadyOnGround`: the item is already dropped
    /// - `NotEnoughItems`: `count` is not between 1 and the stack size
    /// - `AlreadySpawned`: the world already shows an object with that id
    /// - `Persistence`: the store failed or object ids are exhausted
    pub fn drop(
        &self,
        item: &Arc<Item>,
        count: i64,
        point: Point3D,
        character: &Character,
    ) -> ItemResult<Arc<Item>> {
        let mut state = item.lock();
        if state.location == ItemLocation::Ground {
            return Err(ItemError::AlreadyOnGround { item: item.id() });
        }
        check_count(item, &state, count)?;

        let store = self.database.items();
        let on_ground = ItemState {
            location: ItemLocation::Ground,
            owner: None,
            count,
            position: Some(point),
        };

        let dropped = if count == state.count {
            self.world.spawn(Arc::clone(item))?;
            if let Err(e) = store.save(&ItemRecord::capture(item, &on_ground)) {
                self.despawn(item.id());
                return Err(e.into());
            }
            *state = on_ground;
            character.inventory().remove(item.id());
            Arc::clone(item)
        } else {
            let remaining = ItemState {
                count: state.count - count,
                ..state.clone()
            };
            let split = Arc::new(Item::new(self.world.allocate_id()?, item.template(), on_ground));
            self.world.spawn(Arc::clone(&split))?;
            if let Err(e) = store.save(&split.snapshot()) {
                self.despawn(split.id());
                return Err(e.into());
            }
            if let Err(e) = store.save(&ItemRecord::capture(item, &remaining)) {
                self.despawn(split.id());
                forget_record(store, split.id());
                return Err(e.into());
            }
            *state = remaining;
            split
        };

        self.ground.lock().insert(dropped.id(), Arc::clone(&dropped));
        debug!(
            item = %dropped.id(),
            source = %item.id(),
            count,
            position = %point,
            "Item dropped"
        );
        Ok(dropped)
    }

    /// Splits `count` off `item`.
    ///
    /// Returns `item` itself when `count` equals its stack size, otherwise
    /// a new item with a fresh id at the same location. Nothing is
    /// persisted; callers save both items.
    ///
    /// # Errors
    /// - `NotEnoughItems`: `count` is not between 1 and the stack size
    /// - `Persistence`: object ids are exhausted
    pub fn split(&self, item: &Arc<Item>, count: i64) -> ItemResult<Arc<Item>> {
        let mut state = item.lock();
        self.split_locked(item, &mut state, count)
    }

    fn split_locked(
        &self,
        item: &Arc<Item>,
        state: &mut ItemState,
        count: i64,
    ) -> ItemResult<Arc<Item>> {
        check_count(item, state, count)?;
        if count == state.count {
            return Ok(Arc::clone(item));
        }

        let id = self.world.allocate_id()?;
        state.count -= count;
        let split = ItemState {
            count,
            ..state.clone()
        };
        Ok(Arc::new(Item::new(id, item.template(), split)))
    }

    /// Merges all `items` into the first one.
    ///
    /// The other items keep existing with a count of zero; callers
    /// delete them.
    ///
    /// # Errors
    /// Returns `NonStackable` for fewer than two items or mixed templates.
    pub fn stack(&self, items: &[Arc<Item>]) -> ItemResult<Arc<Item>> {
        let Some((first, rest)) = items.split_first() else {
            return Err(ItemError::non_stackable("no items given"));
        };
        if rest.is_empty() {
            return Err(ItemError::non_stackable("at least two items are required"));
        }
        if let Some(other) = rest.iter().find(|i| i.template() != first.template()) {
            return Err(ItemError::non_stackable(format!(
                "template {} differs from {}",
                other.template(),
                first.template()
            )));
        }

        // One lock at a time
        let mut total = 0;
        for other in rest.iter().filter(|i| i.id() != first.id()) {
            let mut other_state = other.lock();
            total += other_state.count;
            other_state.count = 0;
        }
        first.lock().count += total;
        Ok(Arc::clone(first))
    }

    /// Saves the merged stack, then deletes the picked item's record.
    /// A failed delete puts the stack record back.
    fn persist_merge(
        &self,
        picked: &Item,
        stack: &Item,
        before: &ItemState,
        merged: &ItemState,
    ) -> ItemResult<()> {
        let store = self.database.items();
        store.save(&ItemRecord::capture(stack, merged))?;
        if let Err(e) = store.delete(picked.id()) {
            if let Err(undo) = store.save(&ItemRecord::capture(stack, before)) {
                warn!(item = %stack.id(), error = %undo, "Stack record not restored");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn respawn(&self, item: &Arc<Item>) {
        if let Err(e) = self.world.spawn(Arc::clone(item)) {
            warn!(item = %item.id(), error = %e, "Item not respawned");
        }
    }

    fn despawn(&self, id: ObjectId) {
        if let Err(e) = self.world.unspawn(id) {
            warn!(item = %id, error = %e, "Item not unspawned");
        }
    }
}

fn check_count(item: &Item, state: &ItemState, count: i64) -> ItemResult<()> {
    if count < 1 || count > state.count {
        return Err(ItemError::NotEnoughItems {
            item: item.id(),
            requested: count,
            available: state.count,
        });
    }
    Ok(())
}

fn forget_record(store: &dyn ItemStore, id: ObjectId) {
    if let Err(e) = store.delete(id) {
        warn!(item = %id, error = %e, "Orphaned item record");
    }
}

#[async_trait]
impl Service for ItemService {
    fn dependencies(&self) -> &[ServiceId] {
        &DEPENDENCIES
    }

    async fn start(&self) -> anyhow::Result<()> {
        let records = self.database.items().load_dropped()?;
        let mut ground = self.ground.lock();
        for record in &records {
            let item = Arc::new(Item::from_record(record));
            self.world.ids().reserve_through(item.id());
            self.world.spawn(Arc::clone(&item))?;
            ground.insert(item.id(), item);
        }
        info!(items = records.len(), "Dropped items spawned");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let items: Vec<_> = self.ground.lock().drain().map(|(id, _)| id).collect();
        for id in &items {
            self.world.unspawn(*id)?;
        }
        info!(items = items.len(), "Dropped items unspawned");
        Ok(())
    }
}

impl NamedService for ItemService {
    const ID: ServiceId = ServiceId::new("item");
}

impl fmt::Debug for ItemService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemService")
            .field("ground", &self.ground_count())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
