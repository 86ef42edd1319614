// ============================================
// File: crates/gameshard-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Strongly typed identifiers so connection ids, world object ids and
//! template ids can never be mixed up at a call site.
//!
//! ## Main Functionality
//! - `ConnectionId`: Process-unique id of one client connection
//! - `ObjectId`: Id of a game object living in the world (items, characters)
//! - `TemplateId`: Id of the static template an object was created from
//! - `ObjectIdAllocator`: Thread-safe allocator for fresh `ObjectId`s
//!
//! ## ⚠️ Important Note for Next Developer
//! - `ObjectId` values travel on the wire as signed 32-bit integers
//! - The allocator never reuses ids; released ids are simply dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

// ============================================
// Constants
// ============================================

/// First id handed out by a default [`ObjectIdAllocator`].
///
/// Ids below this value are reserved for static world data.
pub const FIRST_DYNAMIC_OBJECT_ID: i32 = 0x1000_0000;

// ============================================
// ConnectionId
// ============================================

/// Identifier of a single client connection.
///
/// Ids are assigned from a process-wide counter and are never reused
/// while the process is running.
///
/// # Example
/// ```
/// use gameshard_common::types::ConnectionId;
///
/// let a = ConnectionId::next();
/// let b = ConnectionId::next();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Returns the next unused connection id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================
// ObjectId
// ============================================

/// Identifier of a game object (item, character, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(i32);

impl ObjectId {
    /// Wraps a raw wire value.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw wire value.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ObjectId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

// ============================================
// TemplateId
// ============================================

/// Identifier of the static template an object was instantiated from.
///
/// Two items can only be stacked when they share a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(i32);

impl TemplateId {
    /// Wraps a raw template id.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw template id.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template:{}", self.0)
    }
}

// ============================================
// ObjectIdAllocator
// ============================================

/// Hands out fresh, never reused [`ObjectId`]s.
///
/// # Thread Safety
/// Lock-free; safe to share behind an `Arc`.
#[derive(Debug)]
pub struct ObjectIdAllocator {
    next: AtomicI32,
}

impl ObjectIdAllocator {
    /// Creates an allocator starting at [`FIRST_DYNAMIC_OBJECT_ID`].
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(FIRST_DYNAMIC_OBJECT_ID)
    }

    /// Creates an allocator whose first id is `first`.
    #[must_use]
    pub const fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first),
        }
    }

    /// Allocates a new id.
    ///
    /// # Errors
    /// Returns `ResourceExhausted` once the positive i32 range is used up.
    pub fn allocate(&self) -> Result<ObjectId> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        if id < 0 || id == i32::MAX {
            self.next.store(i32::MAX, Ordering::Relaxed);
            return Err(CommonError::resource_exhausted("object ids", i32::MAX));
        }
        Ok(ObjectId(id))
    }

    /// Makes sure ids handed out later are above `id`.
    ///
    /// Used after loading persisted objects so fresh ids never collide.
    pub fn reserve_through(&self, id: ObjectId) {
        self.next.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for ObjectIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_unique() {
        let ids: Vec<_> = (0..100).map(|_| ConnectionId::next()).collect();
        let mut sorted = ids.clone();
        sorted.dedup();
        assert_eq!(ids.len(), sorted.len());
        assert!(ids[0].to_string().starts_with("conn-"));
    }

    #[test]
    fn test_allocator_sequential() {
        let alloc = ObjectIdAllocator::starting_at(10);
        assert_eq!(alloc.allocate().unwrap(), ObjectId::new(10));
        assert_eq!(alloc.allocate().unwrap(), ObjectId::new(11));
    }

    #[test]
    fn test_allocator_reserve_through() {
        let alloc = ObjectIdAllocator::starting_at(10);
        alloc.reserve_through(ObjectId::new(500));
        assert_eq!(alloc.allocate().unwrap(), ObjectId::new(501));

        // Reserving below the cursor is a no-op
        alloc.reserve_through(ObjectId::new(20));
        assert_eq!(alloc.allocate().unwrap(), ObjectId::new(502));
    }

    #[test]
    fn test_allocator_exhaustion() {
        let alloc = ObjectIdAllocator::starting_at(i32::MAX - 1);
        assert!(alloc.allocate().is_ok());
        assert!(alloc.allocate().is_err());
        assert!(alloc.allocate().is_err());
    }
}
