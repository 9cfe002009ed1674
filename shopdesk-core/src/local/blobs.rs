use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::store::{Blob, BlobStore, StoreError};

/// Blob storage in the local `blobs` table.
#[derive(Clone)]
pub struct LocalBlobs {
    pool: SqlitePool,
}

impl LocalBlobs {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn revision_of(&self, path: &str) -> Result<u64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT revision FROM blobs WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(r,)| r as u64).unwrap_or(0))
    }
}

#[async_trait]
impl BlobStore for LocalBlobs {
    async fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let row: Option<(Vec<u8>, i64)> =
            sqlx::query_as("SELECT bytes, revision FROM blobs WHERE path = ?")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(bytes, revision)| Blob {
            bytes,
            revision: revision as u64,
        }))
    }

    async fn put_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool, StoreError> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO blobs (path, bytes, revision) VALUES (?, ?, 1)
                    ON CONFLICT(path) DO UPDATE SET bytes = excluded.bytes, revision = blobs.revision + 1
                    "#,
                )
                .bind(path)
                .bind(&bytes)
                .execute(&self.pool)
                .await?
            }
            Some(0) => {
                sqlx::query(
                    "INSERT INTO blobs (path, bytes, revision) VALUES (?, ?, 1) ON CONFLICT(path) DO NOTHING",
                )
                .bind(path)
                .bind(&bytes)
                .execute(&self.pool)
                .await?
            }
            Some(revision) => {
                sqlx::query(
                    "UPDATE blobs SET bytes = ?, revision = revision + 1 WHERE path = ? AND revision = ?",
                )
                .bind(&bytes)
                .bind(path)
                .bind(revision as i64)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                resource: path.to_string(),
                expected: expected.unwrap_or(0),
                found: self.revision_of(path).await?,
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::init_db;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let temp_dir = TempDir::new().unwrap();
        let blobs = LocalBlobs::new(init_db(&temp_dir.path().join("t.db")).await.unwrap());

        assert!(blobs.get_blob("backup/backup_data").await.unwrap().is_none());

        blobs
            .put_blob("backup/backup_data", vec![1, 2, 3], None)
            .await
            .unwrap();
        blobs
            .put_blob("backup/backup_data", vec![4, 5], None)
            .await
            .unwrap();

        let blob = blobs.get_blob("backup/backup_data").await.unwrap().unwrap();
        assert_eq!(blob.bytes, vec![4, 5]);
        assert_eq!(blob.revision, 2);
    }

    #[tokio::test]
    async fn test_checked_put_detects_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let blobs = LocalBlobs::new(init_db(&temp_dir.path().join("t.db")).await.unwrap());

        blobs.put_blob("data/items", vec![1], Some(0)).await.unwrap();
        assert!(blobs.put_blob("data/items", vec![2], Some(0)).await.is_err());
        blobs.put_blob("data/items", vec![3], Some(1)).await.unwrap();

        let err = blobs
            .put_blob("data/items", vec![4], Some(1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
