use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::marker::PhantomData;

use super::{bump_revision, current_revision};
use crate::store::{Entity, Snapshot, Store, StoreError};

/// One entity table in the local database, rows keyed by entity id.
///
/// Records are kept as JSON in the `body` column and listed in insertion
/// order.
pub struct LocalStore<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for LocalStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BodyRow {
    body: String,
}

impl<T: Entity> LocalStore<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub async fn revision(&self) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        current_revision(&mut conn, T::TABLE).await
    }

    async fn list(conn: &mut SqliteConnection) -> Result<Vec<T>, StoreError> {
        let sql = format!("SELECT body FROM {} ORDER BY rowid", T::TABLE);
        let rows: Vec<BodyRow> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(serde_json::from_str(&row.body)?);
        }
        Ok(entities)
    }

    async fn insert(conn: &mut SqliteConnection, entity: &T) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, body, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
            T::TABLE
        );
        let body = serde_json::to_string(entity)?;
        sqlx::query(&sql)
            .bind(entity.id())
            .bind(&body)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn put(&self, entity: &T) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        bump_revision(&mut tx, T::TABLE, None).await?;
        Self::insert(&mut tx, entity).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl<T: Entity> Store<T> for LocalStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::list(&mut conn).await
    }

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let sql = format!("SELECT body FROM {} WHERE id = ?", T::TABLE);
        let row: Option<BodyRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.body)?)),
            None => Ok(None),
        }
    }

    async fn add(&self, entity: &T) -> Result<bool, StoreError> {
        self.put(entity).await
    }

    async fn update(&self, entity: &T) -> Result<bool, StoreError> {
        self.put(entity).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        bump_revision(&mut tx, T::TABLE, None).await?;
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn snapshot(&self) -> Result<Snapshot<T>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let items = Self::list(&mut tx).await?;
        let revision = current_revision(&mut tx, T::TABLE).await?;
        tx.commit().await?;
        Ok(Snapshot { items, revision })
    }

    /// Clears the table and reinserts `entities` in one transaction.
    async fn replace(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        bump_revision(&mut tx, T::TABLE, expected).await?;

        let sql = format!("DELETE FROM {}", T::TABLE);
        sqlx::query(&sql).execute(&mut *tx).await?;
        for entity in entities {
            Self::insert(&mut tx, entity).await?;
        }

        tx.commit().await?;
        tracing::debug!("Replaced {} with {} record(s)", T::TABLE, entities.len());
        Ok(true)
    }
}
