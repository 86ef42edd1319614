// ============================================
// File: crates/gameshard-server/src/model/character.rs
// ============================================
//! # Character Model
//!
//! ## Creation Reason
//! A player character as far as item handling needs it: identity and
//! an inventory of shared items.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The inventory lock only guards membership; lock an item itself
//!   before touching its count or location
//! - Never hold the inventory lock while acquiring an item lock
//!
//! ## Last Modified
//! v0.1.0 - Initial character model

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use gameshard_common::types::{ObjectId, TemplateId};

use super::item::Item;

// ============================================
// Inventory
// ============================================

/// Items carried by a character.
#[derive(Default)]
pub struct Inventory {
    items: Mutex<Vec<Arc<Item>>>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` unless an item with the same id is already present.
    ///
    /// Returns `true` if the item was added.
    pub fn add(&self, item: Arc<Item>) -> bool {
        let mut items = self.items.lock();
        if items.iter().any(|existing| existing.id() == item.id()) {
            return false;
        }
        items.push(item);
        true
    }

    /// Removes and returns the item with `id`.
    pub fn remove(&self, id: ObjectId) -> Option<Arc<Item>> {
        let mut items = self.items.lock();
        let pos = items.iter().position(|item| item.id() == id)?;
        Some(items.remove(pos))
    }

    /// Returns the items instantiated from `template`, in insertion order.
    #[must_use]
    pub fn items_of(&self, template: TemplateId) -> Vec<Arc<Item>> {
        self.items
            .lock()
            .iter()
            .filter(|item| item.template() == template)
            .cloned()
            .collect()
    }

    /// Returns the item with `id`.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<Arc<Item>> {
        self.items.lock().iter().find(|item| item.id() == id).cloned()
    }

    /// Returns `true` if the item with `id` is present.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.items.lock().iter().any(|item| item.id() == id)
    }

    /// Returns the number of item stacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if the inventory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory").field("stacks", &self.len()).finish()
    }
}

// ============================================
// Character
// ============================================

/// A player character.
#[derive(Debug)]
pub struct Character {
    id: ObjectId,
    name: String,
    inventory: Inventory,
}

impl Character {
    /// Creates a character with an empty inventory.
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            inventory: Inventory::new(),
        }
    }

    /// Returns the object id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the character name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the inventory.
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn potion(id: i32) -> Arc<Item> {
        Arc::new(Item::in_inventory(ObjectId::new(id), TemplateId::new(1060), 1, ObjectId::new(1)))
    }

    #[test]
    fn test_inventory_membership() {
        let character = Character::new(ObjectId::new(1), "Talia");
        let inventory = character.inventory();

        assert!(inventory.add(potion(10)));
        assert!(!inventory.add(potion(10)), "duplicate id must be rejected");
        assert!(inventory.add(potion(11)));
        assert_eq!(inventory.len(), 2);

        assert_eq!(inventory.items_of(TemplateId::new(1060)).len(), 2);
        assert!(inventory.items_of(TemplateId::new(57)).is_empty());

        assert_eq!(inventory.remove(ObjectId::new(10)).map(|i| i.id()), Some(ObjectId::new(10)));
        assert!(inventory.remove(ObjectId::new(10)).is_none());
        assert!(inventory.contains(ObjectId::new(11)));
    }
}
