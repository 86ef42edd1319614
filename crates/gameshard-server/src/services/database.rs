// ============================================
// File: crates/gameshard-server/src/services/database.rs
// ============================================
//! # Database Service
//!
//! ## Creation Reason
//! Item rules need to persist state changes without knowing where the
//! data lives. `ItemStore` is that seam; `DatabaseService` puts a store
//! into the service graph so other services can depend on it.
//!
//! ## Main Functionality
//! - `ItemStore`: Persistence collaborator for items
//! - `InMemoryItemStore`: `DashMap`-backed store
//! - `DatabaseService`: Service wrapper around a store
//!
//! ## ⚠️ Important Note for Next Developer
//! - Store methods are synchronous and are called while an item lock is
//!   held; implementations must not block on async work
//!
//! ## Last Modified
//! v0.1.0 - Initial database service

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use gameshard_common::types::ObjectId;
use gameshard_common::CommonError;

use crate::model::ItemRecord;
use crate::runtime::{NamedService, Service, ServiceId};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, CommonError>;

// ============================================
// ItemStore
// ============================================

/// Persistence collaborator for items.
pub trait ItemStore: Send + Sync {
    /// Loads every item whose saved location is the ground.
    ///
    /// # Errors
    /// Returns `Storage` if the backend cannot be read.
    fn load_dropped(&self) -> StoreResult<Vec<ItemRecord>>;

    /// Loads a single item.
    ///
    /// # Errors
    /// Returns `NotFound` if no record exists for `id`.
    fn load(&self, id: ObjectId) -> StoreResult<ItemRecord>;

    /// Inserts or replaces the record for `record.id`.
    ///
    /// # Errors
    /// Returns `Storage` if the backend rejects the write.
    fn save(&self, record: &ItemRecord) -> StoreResult<()>;

    /// Deletes the record for `id`. Deleting a missing record succeeds.
    ///
    /// # Errors
    /// Returns `Storage` if the backend rejects the delete.
    fn delete(&self, id: ObjectId) -> StoreResult<()>;
}

// ============================================
// InMemoryItemStore
// ============================================

/// Item store kept entirely in memory.
#[derive(Default)]
pub struct InMemoryItemStore {
    records: DashMap<ObjectId, ItemRecord>,
}

impl InMemoryItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = ItemRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.records.insert(record.id, record);
        }
        store
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.records.contains_key(&id)
    }
}

impl ItemStore for InMemoryItemStore {
    fn load_dropped(&self) -> StoreResult<Vec<ItemRecord>> {
        let mut dropped: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.value().is_dropped())
            .map(|entry| entry.value().clone())
            .collect();
        dropped.sort_by_key(|record| record.id);
        Ok(dropped)
    }

    fn load(&self, id: ObjectId) -> StoreResult<ItemRecord> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CommonError::not_found("item", id))
    }

    fn save(&self, record: &ItemRecord) -> StoreResult<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, id: ObjectId) -> StoreResult<()> {
        self.records.remove(&id);
        Ok(())
    }
}

impl fmt::Debug for InMemoryItemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryItemStore")
            .field("records", &self.len())
            .finish()
    }
}

// ============================================
// DatabaseService
// ============================================

/// Service exposing the item store to the rest of the graph.
pub struct DatabaseService {
    store: Arc<dyn ItemStore>,
}

impl DatabaseService {
    /// Wraps `store`.
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Creates a service over an empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryItemStore::new()))
    }

    /// Returns the item store.
    #[must_use]
    pub fn items(&self) -> &dyn ItemStore {
        self.store.as_ref()
    }
}

#[async_trait]
impl Service for DatabaseService {
    async fn start(&self) -> anyhow::Result<()> {
        let dropped = self.store.load_dropped()?.len();
        info!(dropped_items = dropped, "Item store ready");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        debug!("Item store released");
        Ok(())
    }
}

impl NamedService for DatabaseService {
    const ID: ServiceId = ServiceId::new("database");
}

impl fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseService").finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Point3D};
    use gameshard_common::types::TemplateId;

    #[test]
    fn test_load_dropped_filters_location() {
        let ground = Item::on_ground(ObjectId::new(2), TemplateId::new(57), 10, Point3D::new(1, 1, 1));
        let carried = Item::in_inventory(ObjectId::new(1), TemplateId::new(57), 5, ObjectId::new(9));
        let store = InMemoryItemStore::with_records([ground.snapshot(), carried.snapshot()]);

        let dropped = store.load_dropped().unwrap();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, ObjectId::new(2));
    }

    #[test]
    fn test_save_load_delete() {
        let store = InMemoryItemStore::new();
        let item = Item::on_ground(ObjectId::new(3), TemplateId::new(1), 1, Point3D::default());

        store.save(&item.snapshot()).unwrap();
        assert_eq!(store.load(ObjectId::new(3)).unwrap().count, 1);

        store.delete(ObjectId::new(3)).unwrap();
        assert!(store.load(ObjectId::new(3)).is_err());
        // Deleting twice is not an error
        store.delete(ObjectId::new(3)).unwrap();
    }
}
