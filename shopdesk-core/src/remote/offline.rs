//! Connectivity-aware wrapper around remote stores.
//!
//! Reads go to the remote while online and are mirrored into the local store;
//! while offline they are served from that mirror without touching the
//! network. Writes while offline are skipped and reported as `false`. There
//! is no write queue: a skipped write is gone.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::RemoteClient;
use crate::local::LocalStore;
use crate::store::{Blob, BlobStore, Entity, Snapshot, Store, StoreError};

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Connectivity decided by a flag, for forced offline operation and tests.
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for ManualConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Probes the server's health endpoint before every call.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: RemoteClient,
}

impl HttpProbe {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    async fn is_online(&self) -> bool {
        self.client.health().await
    }
}

pub struct OfflineFallback<T> {
    remote: Arc<dyn Store<T>>,
    mirror: LocalStore<T>,
    connectivity: Arc<dyn Connectivity>,
}

impl<T: Entity> OfflineFallback<T> {
    pub fn new(
        remote: Arc<dyn Store<T>>,
        mirror: LocalStore<T>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            remote,
            mirror,
            connectivity,
        }
    }

    async fn skip_write(&self, operation: &str) -> Option<Result<bool, StoreError>> {
        if self.connectivity.is_online().await {
            return None;
        }
        tracing::warn!("Offline: skipped {} on {}", operation, T::TABLE);
        Some(Ok(false))
    }

    async fn mirror_all(&self, entities: &[T]) {
        if let Err(e) = self.mirror.save_all(entities).await {
            tracing::warn!("Failed to mirror {} locally: {}", T::TABLE, e);
        }
    }
}

#[async_trait]
impl<T: Entity> Store<T> for OfflineFallback<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        if !self.connectivity.is_online().await {
            tracing::debug!("Offline: reading {} from local mirror", T::TABLE);
            return self.mirror.get_all().await;
        }
        let entities = self.remote.get_all().await?;
        self.mirror_all(&entities).await;
        Ok(entities)
    }

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        if !self.connectivity.is_online().await {
            return self.mirror.get(id).await;
        }
        let entity = self.remote.get(id).await?;
        let mirrored = match &entity {
            Some(entity) => self.mirror.update(entity).await,
            None => self.mirror.delete(id).await,
        };
        if let Err(e) = mirrored {
            tracing::warn!("Failed to mirror {} {} locally: {}", T::TABLE, id, e);
        }
        Ok(entity)
    }

    async fn add(&self, entity: &T) -> Result<bool, StoreError> {
        if let Some(skipped) = self.skip_write("add").await {
            return skipped;
        }
        self.remote.add(entity).await
    }

    async fn update(&self, entity: &T) -> Result<bool, StoreError> {
        if let Some(skipped) = self.skip_write("update").await {
            return skipped;
        }
        self.remote.update(entity).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if let Some(skipped) = self.skip_write("delete").await {
            return skipped;
        }
        self.remote.delete(id).await
    }

    /// Offline snapshots carry the mirror's revision; a checked replace with
    /// it is skipped anyway while offline.
    async fn snapshot(&self) -> Result<Snapshot<T>, StoreError> {
        if !self.connectivity.is_online().await {
            return self.mirror.snapshot().await;
        }
        let snapshot = self.remote.snapshot().await?;
        self.mirror_all(&snapshot.items).await;
        Ok(snapshot)
    }

    async fn replace(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError> {
        if let Some(skipped) = self.skip_write("replace").await {
            return skipped;
        }
        self.remote.replace(entities, expected).await
    }
}

/// Blob access that does nothing while offline.
pub struct OfflineBlobs {
    remote: Arc<dyn BlobStore>,
    connectivity: Arc<dyn Connectivity>,
}

impl OfflineBlobs {
    pub fn new(remote: Arc<dyn BlobStore>, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            remote,
            connectivity,
        }
    }
}

#[async_trait]
impl BlobStore for OfflineBlobs {
    async fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        if !self.connectivity.is_online().await {
            return Ok(None);
        }
        self.remote.get_blob(path).await
    }

    async fn put_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool, StoreError> {
        if !self.connectivity.is_online().await {
            tracing::warn!("Offline: skipped upload of {}", path);
            return Ok(false);
        }
        self.remote.put_blob(path, bytes, expected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::init_db;
    use crate::models::Item;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory remote that counts calls and can be told to fail reads.
    #[derive(Default)]
    struct FakeRemote {
        items: Mutex<Vec<Item>>,
        calls: AtomicUsize,
        fail_reads: AtomicBool,
    }

    impl FakeRemote {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn touch(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Status {
                    status: 503,
                    resource: "items".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Store<Item> for FakeRemote {
        async fn get_all(&self) -> Result<Vec<Item>, StoreError> {
            self.touch()?;
            Ok(self.items.lock().unwrap().clone())
        }
        async fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
            self.touch()?;
            Ok(self.items.lock().unwrap().iter().find(|i| i.id == id).cloned())
        }
        async fn add(&self, entity: &Item) -> Result<bool, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            crate::store::upsert(&mut self.items.lock().unwrap(), entity);
            Ok(true)
        }
        async fn update(&self, entity: &Item) -> Result<bool, StoreError> {
            self.add(entity).await
        }
        async fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.items.lock().unwrap().retain(|i| i.id != id);
            Ok(true)
        }
        async fn snapshot(&self) -> Result<Snapshot<Item>, StoreError> {
            Ok(Snapshot {
                items: self.get_all().await?,
                revision: 0,
            })
        }
        async fn replace(&self, entities: &[Item], _: Option<u64>) -> Result<bool, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.items.lock().unwrap() = entities.to_vec();
            Ok(true)
        }
    }

    struct TestContext {
        store: OfflineFallback<Item>,
        remote: Arc<FakeRemote>,
        mirror: LocalStore<Item>,
        connectivity: Arc<ManualConnectivity>,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("t.db")).await.unwrap();
        let remote = Arc::new(FakeRemote::default());
        let mirror = LocalStore::new(pool);
        let connectivity = Arc::new(ManualConnectivity::new(true));
        TestContext {
            store: OfflineFallback::new(remote.clone(), mirror.clone(), connectivity.clone()),
            remote,
            mirror,
            connectivity,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_online_read_is_mirrored() {
        let ctx = setup().await;
        let item = Item::new("Cola", 1.0).with_id("i1");
        ctx.store.add(&item).await.unwrap();

        assert_eq!(ctx.store.get_all().await.unwrap(), vec![item.clone()]);
        assert_eq!(ctx.mirror.get_all().await.unwrap(), vec![item]);
    }

    #[tokio::test]
    async fn test_offline_read_serves_mirror_without_network() {
        let ctx = setup().await;
        let item = Item::new("Cola", 1.0).with_id("i1");
        ctx.store.add(&item).await.unwrap();
        ctx.store.get_all().await.unwrap();

        ctx.connectivity.set_online(false);
        ctx.remote.fail_reads.store(true, Ordering::SeqCst);
        let calls_before = ctx.remote.calls();

        let items = ctx.store.get_all().await.unwrap();
        assert_eq!(items, vec![item.clone()]);
        assert_eq!(ctx.store.get("i1").await.unwrap(), Some(item));
        assert_eq!(ctx.remote.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_offline_writes_are_skipped() {
        let ctx = setup().await;
        ctx.connectivity.set_online(false);

        assert!(!ctx.store.add(&Item::new("Cola", 1.0)).await.unwrap());
        assert!(!ctx.store.delete("x").await.unwrap());
        assert!(!ctx.store.save_all(&[]).await.unwrap());
        assert_eq!(ctx.remote.calls(), 0);
        assert!(ctx.mirror.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_online_read_failure_propagates() {
        let ctx = setup().await;
        ctx.remote.fail_reads.store(true, Ordering::SeqCst);
        assert!(ctx.store.get_all().await.is_err());
    }

    #[tokio::test]
    async fn test_get_mirrors_single_record() {
        let ctx = setup().await;
        let item = Item::new("Tea", 2.0).with_id("t1");
        ctx.remote.add(&item).await.unwrap();

        ctx.store.get("t1").await.unwrap();
        assert_eq!(ctx.mirror.get("t1").await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn test_get_drops_record_deleted_remotely() {
        let ctx = setup().await;
        let item = Item::new("Tea", 2.0).with_id("t1");
        ctx.store.add(&item).await.unwrap();
        ctx.store.get("t1").await.unwrap();

        ctx.remote.delete("t1").await.unwrap();
        assert_eq!(ctx.store.get("t1").await.unwrap(), None);
        assert_eq!(ctx.mirror.get("t1").await.unwrap(), None);

        ctx.connectivity.set_online(false);
        assert_eq!(ctx.store.get("t1").await.unwrap(), None);
    }
}
