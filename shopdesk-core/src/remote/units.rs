use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::protocol::{UNIT_COLLECTION, UNIT_DOCUMENT};
use super::RemoteClient;
use crate::models::Unit;
use crate::store::{upsert, Snapshot, Store, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct UnitDocument {
    #[serde(default)]
    units: Vec<Unit>,
}

/// All units kept as an array inside one remote document, so linked units
/// are always written together.
pub struct UnitDocumentStore {
    client: RemoteClient,
}

impl UnitDocumentStore {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    async fn write(&self, units: &[Unit], expected: Option<u64>) -> Result<bool, StoreError> {
        let document = UnitDocument {
            units: units.to_vec(),
        };
        self.client
            .put_document(UNIT_COLLECTION, UNIT_DOCUMENT, &document, expected)
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl Store<Unit> for UnitDocumentStore {
    async fn get_all(&self) -> Result<Vec<Unit>, StoreError> {
        Ok(self.snapshot().await?.items)
    }

    async fn get(&self, id: &str) -> Result<Option<Unit>, StoreError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.items.into_iter().find(|u| u.id == id))
    }

    async fn add(&self, unit: &Unit) -> Result<bool, StoreError> {
        let mut snapshot = self.snapshot().await?;
        upsert(&mut snapshot.items, unit);
        self.write(&snapshot.items, Some(snapshot.revision)).await
    }

    async fn update(&self, unit: &Unit) -> Result<bool, StoreError> {
        self.add(unit).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut snapshot = self.snapshot().await?;
        snapshot.items.retain(|u| u.id != id);
        self.write(&snapshot.items, Some(snapshot.revision)).await
    }

    async fn snapshot(&self) -> Result<Snapshot<Unit>, StoreError> {
        let (document, revision) = self
            .client
            .get_document::<UnitDocument>(UNIT_COLLECTION, UNIT_DOCUMENT)
            .await?;
        Ok(Snapshot {
            items: document.map(|d| d.units).unwrap_or_default(),
            revision,
        })
    }

    async fn replace(&self, units: &[Unit], expected: Option<u64>) -> Result<bool, StoreError> {
        self.write(units, expected).await
    }
}
