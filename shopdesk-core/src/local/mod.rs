//! Local SQLite persistence.

mod blobs;
mod table;

pub use blobs::LocalBlobs;
pub use table::LocalStore;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use std::path::Path;

use crate::store::StoreError;

/// Opens (creating if needed) the local database and runs migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!("Opened local database {}", path.display());
    Ok(pool)
}

pub(crate) async fn current_revision(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<u64, StoreError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT revision FROM revisions WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(r,)| r as u64).unwrap_or(0))
}

/// Bumps the write counter of `name`, first checking it against `expected`.
///
/// Runs before the data change so the transaction takes the write lock early.
pub(crate) async fn bump_revision(
    conn: &mut SqliteConnection,
    name: &str,
    expected: Option<u64>,
) -> Result<u64, StoreError> {
    sqlx::query("INSERT OR IGNORE INTO revisions (name, revision) VALUES (?, 0)")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let result = match expected {
        Some(expected) => {
            sqlx::query(
                "UPDATE revisions SET revision = revision + 1 WHERE name = ? AND revision = ?",
            )
            .bind(name)
            .bind(expected as i64)
            .execute(&mut *conn)
            .await?
        }
        None => {
            sqlx::query("UPDATE revisions SET revision = revision + 1 WHERE name = ?")
                .bind(name)
                .execute(&mut *conn)
                .await?
        }
    };

    if result.rows_affected() == 0 {
        let found = current_revision(conn, name).await?;
        return Err(StoreError::Conflict {
            resource: name.to_string(),
            expected: expected.unwrap_or(0),
            found,
        });
    }

    current_revision(conn, name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for table in [
            "items",
            "categories",
            "units",
            "customers",
            "suppliers",
            "orders",
            "cashflows",
            "creditbooks",
            "blobs",
            "revisions",
        ] {
            assert!(table_names.contains(&table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_bump_revision_checks_expected() {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(bump_revision(&mut conn, "items", None).await.unwrap(), 1);
        assert_eq!(bump_revision(&mut conn, "items", Some(1)).await.unwrap(), 2);

        let err = bump_revision(&mut conn, "items", Some(1)).await.unwrap_err();
        match err {
            StoreError::Conflict {
                expected, found, ..
            } => {
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
