//! Store contract shared by the local and remote backends.
//!
//! Every entity has one table locally and one collection remotely, both named
//! by [`Entity::TABLE`]. Reads never fail for absence; writes return `false`
//! when they were skipped (offline) rather than applied.

mod error;

pub use error::StoreError;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Cashflow, Category, Creditbook, Customer, Item, OrderHistory, Supplier, Unit};

/// A record persisted by id.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Local table and remote collection name.
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

macro_rules! entity {
    ($ty:ty, $table:literal) => {
        impl Entity for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

entity!(Item, "items");
entity!(Category, "categories");
entity!(Unit, "units");
entity!(Customer, "customers");
entity!(Supplier, "suppliers");
entity!(OrderHistory, "orders");
entity!(Cashflow, "cashflows");
entity!(Creditbook, "creditbooks");

/// A whole collection together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub revision: u64,
}

impl<T> Snapshot<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            revision: 0,
        }
    }
}

#[async_trait]
pub trait Store<T: Entity>: Send + Sync {
    async fn get_all(&self) -> Result<Vec<T>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Inserts or overwrites the record with the same id.
    async fn add(&self, entity: &T) -> Result<bool, StoreError>;

    async fn update(&self, entity: &T) -> Result<bool, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn snapshot(&self) -> Result<Snapshot<T>, StoreError>;

    /// Replaces the whole collection. With `expected` set, fails with
    /// [`StoreError::Conflict`] if the collection moved past that revision.
    async fn replace(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError>;

    /// Unchecked whole-collection replace; the last writer wins.
    async fn save_all(&self, entities: &[T]) -> Result<bool, StoreError> {
        self.replace(entities, None).await
    }

    async fn clear(&self) -> Result<bool, StoreError> {
        self.replace(&[], None).await
    }
}

/// Binary payload plus the revision it was stored at.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub revision: u64,
}

/// Path-addressed binary storage used for buckets and backups.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError>;

    async fn put_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool, StoreError>;
}

/// Inserts `entity` into `items`, replacing any record with the same id.
pub(crate) fn upsert<T: Entity>(items: &mut Vec<T>, entity: &T) {
    match items.iter_mut().find(|e| e.id() == entity.id()) {
        Some(existing) => *existing = entity.clone(),
        None => items.push(entity.clone()),
    }
}
