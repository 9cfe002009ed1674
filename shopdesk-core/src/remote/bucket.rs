//! A whole collection stored as one gzip-compressed JSON blob.
//!
//! Every write re-uploads the full bucket. Single-record writes read the
//! bucket first and upload with its revision, so a concurrent writer makes
//! them fail with a conflict instead of being overwritten.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::codec::{compress_json, decompress_json};
use crate::store::{upsert, BlobStore, Entity, Snapshot, Store, StoreError};

pub struct BucketStore<T> {
    blobs: Arc<dyn BlobStore>,
    path: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> BucketStore<T> {
    pub fn new(blobs: Arc<dyn BlobStore>, path: impl Into<String>) -> Self {
        Self {
            blobs,
            path: path.into(),
            _entity: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    async fn write(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError> {
        let bytes = compress_json(entities)?;
        tracing::debug!(
            "Writing bucket {} ({} record(s), {} bytes)",
            self.path,
            entities.len(),
            bytes.len()
        );
        self.blobs.put_blob(&self.path, bytes, expected).await
    }
}

#[async_trait]
impl<T: Entity> Store<T> for BucketStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.snapshot().await?.items)
    }

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.items.into_iter().find(|e| e.id() == id))
    }

    async fn add(&self, entity: &T) -> Result<bool, StoreError> {
        let mut snapshot = self.snapshot().await?;
        upsert(&mut snapshot.items, entity);
        self.write(&snapshot.items, Some(snapshot.revision)).await
    }

    async fn update(&self, entity: &T) -> Result<bool, StoreError> {
        self.add(entity).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut snapshot = self.snapshot().await?;
        snapshot.items.retain(|e| e.id() != id);
        self.write(&snapshot.items, Some(snapshot.revision)).await
    }

    async fn snapshot(&self) -> Result<Snapshot<T>, StoreError> {
        match self.blobs.get_blob(&self.path).await? {
            Some(blob) => Ok(Snapshot {
                items: decompress_json(&blob.bytes)?,
                revision: blob.revision,
            }),
            None => Ok(Snapshot::empty()),
        }
    }

    async fn replace(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError> {
        self.write(entities, expected).await
    }
}
