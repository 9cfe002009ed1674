use async_trait::async_trait;
use std::marker::PhantomData;

use super::RemoteClient;
use crate::store::{Entity, Snapshot, Store, StoreError};

/// One remote collection per entity, documents keyed by entity id.
pub struct CollectionStore<T> {
    client: RemoteClient,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> CollectionStore<T> {
    pub fn new(client: RemoteClient) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity> Store<T> for CollectionStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.client.list(T::TABLE).await?.items)
    }

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let (entity, _) = self.client.get_document(T::TABLE, id).await?;
        Ok(entity)
    }

    async fn add(&self, entity: &T) -> Result<bool, StoreError> {
        self.client
            .put_document(T::TABLE, entity.id(), entity, None)
            .await?;
        Ok(true)
    }

    async fn update(&self, entity: &T) -> Result<bool, StoreError> {
        self.add(entity).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.client.delete_document(T::TABLE, id).await?;
        Ok(true)
    }

    async fn snapshot(&self) -> Result<Snapshot<T>, StoreError> {
        self.client.list(T::TABLE).await
    }

    async fn replace(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError> {
        self.client
            .replace_collection(T::TABLE, entities, expected)
            .await?;
        Ok(true)
    }
}
