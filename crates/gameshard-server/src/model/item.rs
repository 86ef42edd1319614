// ============================================
// File: crates/gameshard-server/src/model/item.rs
// ============================================
//! # Item Model
//!
//! ## Creation Reason
//! Items are shared game objects: one item can be reached from the
//! world (lying on the ground), from a character inventory and from
//! several connection tasks at once. Their mutable state sits behind a
//! scoped lock so multi-step rules (check location, then move) are atomic.
//!
//! ## Main Functionality
//! - `Item`: Immutable identity plus locked `ItemState`
//! - `ItemLocation`: Where the item currently is
//! - `ItemRecord`: Persisted snapshot of an item
//! - `Point3D`: World coordinates
//!
//! ## ⚠️ Important Note for Next Developer
//! - Hold `Item::lock()` for the WHOLE read-modify-write; the guard
//!   releases on every exit path, including `?`
//! - The lock is not reentrant: never call `snapshot()` or `lock()` on an
//!   item whose guard you already hold, use `ItemRecord::capture`
//!
//! ## Last Modified
//! v0.1.0 - Initial item model

use std::fmt;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use gameshard_common::types::{ObjectId, TemplateId};

// ============================================
// Point3D
// ============================================

/// Position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point3D {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl Point3D {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<[i32; 3]> for Point3D {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ============================================
// ItemLocation
// ============================================

/// Where an item currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemLocation {
    /// Lying in the world, visible to everyone.
    Ground,
    /// In a character's inventory.
    Inventory,
    /// Equipped by a character.
    Paperdoll,
    /// Stored in a warehouse.
    Warehouse,
}

// ============================================
// ItemState
// ============================================

/// Mutable part of an item, only reachable through [`Item::lock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemState {
    /// Current location.
    pub location: ItemLocation,
    /// Owning character, `None` while on the ground.
    pub owner: Option<ObjectId>,
    /// Stack size.
    pub count: i64,
    /// World position, only meaningful on the ground.
    pub position: Option<Point3D>,
}

// ============================================
// Item
// ============================================

/// A stack of identical game items.
///
/// # Example
/// ```
/// use gameshard_common::types::{ObjectId, TemplateId};
/// use gameshard_server::model::{Item, ItemLocation, Point3D};
///
/// let item = Item::on_ground(ObjectId::new(1), TemplateId::new(57), 100, Point3D::new(0, 0, 0));
/// {
///     let mut state = item.lock();
///     assert_eq!(state.location, ItemLocation::Ground);
///     state.location = ItemLocation::Inventory;
/// }
/// assert_eq!(item.lock().count, 100);
/// ```
pub struct Item {
    id: ObjectId,
    template: TemplateId,
    state: Mutex<ItemState>,
}

impl Item {
    /// Creates an item with the given state.
    #[must_use]
    pub fn new(id: ObjectId, template: TemplateId, state: ItemState) -> Self {
        Self {
            id,
            template,
            state: Mutex::new(state),
        }
    }

    /// Creates an item lying on the ground at `position`.
    #[must_use]
    pub fn on_ground(id: ObjectId, template: TemplateId, count: i64, position: Point3D) -> Self {
        Self::new(
            id,
            template,
            ItemState {
                location: ItemLocation::Ground,
                owner: None,
                count,
                position: Some(position),
            },
        )
    }

    /// Creates an item in `owner`'s inventory.
    #[must_use]
    pub fn in_inventory(id: ObjectId, template: TemplateId, count: i64, owner: ObjectId) -> Self {
        Self::new(
            id,
            template,
            ItemState {
                location: ItemLocation::Inventory,
                owner: Some(owner),
                count,
                position: None,
            },
        )
    }

    /// Rebuilds an item from its persisted record.
    #[must_use]
    pub fn from_record(record: &ItemRecord) -> Self {
        Self::new(
            record.id,
            record.template,
            ItemState {
                location: record.location,
                owner: record.owner,
                count: record.count,
                position: record.position,
            },
        )
    }

    /// Returns the object id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the template id.
    #[must_use]
    pub const fn template(&self) -> TemplateId {
        self.template
    }

    /// Acquires the item's scoped lock.
    pub fn lock(&self) -> MutexGuard<'_, ItemState> {
        self.state.lock()
    }

    /// Captures the current state for persistence.
    #[must_use]
    pub fn snapshot(&self) -> ItemRecord {
        ItemRecord::capture(self, &self.lock())
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

// ============================================
// ItemRecord
// ============================================

/// Persisted form of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Object id.
    pub id: ObjectId,
    /// Template id.
    pub template: TemplateId,
    /// Location at save time.
    pub location: ItemLocation,
    /// Owner at save time.
    pub owner: Option<ObjectId>,
    /// Stack size at save time.
    pub count: i64,
    /// Position at save time.
    pub position: Option<Point3D>,
}

impl ItemRecord {
    /// Builds a record from an item and the guard already held on it.
    #[must_use]
    pub fn capture(item: &Item, state: &ItemState) -> Self {
        Self {
            id: item.id,
            template: item.template,
            location: state.location,
            owner: state.owner,
            count: state.count,
            position: state.position,
        }
    }

    /// Returns `true` if the item was on the ground.
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        self.location == ItemLocation::Ground
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip_through_item() {
        let item = Item::on_ground(ObjectId::new(7), TemplateId::new(57), 3, Point3D::new(1, 2, 3));
        let record = item.snapshot();
        assert!(record.is_dropped());

        let rebuilt = Item::from_record(&record);
        assert_eq!(rebuilt, item);
        assert_eq!(*rebuilt.lock(), *item.lock());
    }

    #[test]
    fn test_capture_under_guard() {
        let item = Item::in_inventory(ObjectId::new(8), TemplateId::new(1), 1, ObjectId::new(99));
        let mut state = item.lock();
        state.count = 5;
        let record = ItemRecord::capture(&item, &state);
        assert_eq!(record.count, 5);
        assert_eq!(record.owner, Some(ObjectId::new(99)));
    }

    #[test]
    fn test_record_serde() {
        let record = Item::on_ground(ObjectId::new(1), TemplateId::new(2), 1, Point3D::default()).snapshot();
        let toml = toml::to_string(&record).unwrap();
        assert!(toml.contains("location = \"ground\""));
        let parsed: ItemRecord = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, record);
    }
}
