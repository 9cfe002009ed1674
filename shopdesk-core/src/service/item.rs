use std::ops::Deref;
use std::sync::Arc;

use super::Service;
use crate::codec::{compress_json, decompress_json};
use crate::images::ImageCache;
use crate::models::Item;
use crate::remote::protocol::BACKUP_BLOB;
use crate::store::{BlobStore, Store, StoreError};

/// Item facade. Adds image cleanup, the display fallback and the backup blob
/// on top of the plain [`Service`] calls, which it derefs to.
#[derive(Clone)]
pub struct ItemService {
    inner: Service<Item>,
    images: ImageCache,
    backups: Arc<dyn BlobStore>,
}

impl Deref for ItemService {
    type Target = Service<Item>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl ItemService {
    pub fn new(store: Arc<dyn Store<Item>>, images: ImageCache, backups: Arc<dyn BlobStore>) -> Self {
        Self {
            inner: Service::new(store),
            images,
            backups,
        }
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// Deletes the item and, once the delete went through, its cached image.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let image = self.inner.get(id).await?.and_then(|item| item.image);
        let deleted = self.inner.delete(id).await?;
        if !deleted {
            return Ok(false);
        }
        if let Some(image) = image {
            match self.images.remove(&image).await {
                Ok(true) => tracing::debug!("Removed cached image {}", image),
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to remove cached image {}: {}", image, e),
            }
        }
        Ok(true)
    }

    /// Items for rendering. A failed read yields the single "Error"
    /// placeholder so the caller always has something to show.
    pub async fn list_for_display(&self) -> Vec<Item> {
        match self.inner.get_all().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Failed to load items: {}", e);
                vec![Item::error_placeholder()]
            }
        }
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Item>, StoreError> {
        let items = self.inner.get_all().await?;
        Ok(items
            .into_iter()
            .find(|item| item.barcode.as_deref() == Some(barcode)))
    }

    pub async fn pinned(&self) -> Result<Vec<Item>, StoreError> {
        let mut items = self.inner.get_all().await?;
        items.retain(|item| item.pinned);
        Ok(items)
    }

    /// Uploads the catalog as the gzip backup blob.
    pub async fn backup(&self, items: &[Item]) -> Result<bool, StoreError> {
        let bytes = compress_json(items)?;
        let written = self.backups.put_blob(BACKUP_BLOB, bytes, None).await?;
        if written {
            tracing::info!("Backed up {} item(s)", items.len());
        }
        Ok(written)
    }

    /// Reads the last backup, if any.
    pub async fn load_backup(&self) -> Result<Option<Vec<Item>>, StoreError> {
        match self.backups.get_blob(BACKUP_BLOB).await? {
            Some(blob) => Ok(Some(decompress_json(&blob.bytes)?)),
            None => Ok(None),
        }
    }
}
