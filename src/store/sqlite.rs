use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use super::{Query, RecordStore, StoreError};
use crate::models::{FieldValue, Record, RecordId};

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    record_type: String,
    fields: String,
    created_at: String,
}

impl RecordRow {
    fn into_record(self) -> Result<Record, StoreError> {
        let fields: BTreeMap<String, FieldValue> = serde_json::from_str(&self.fields)
            .map_err(|e| StoreError::Decode(format!("record {}: {}", self.id, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Decode(format!("record {}: {}", self.id, e)))?;

        Ok(Record {
            id: Some(RecordId::new(self.id)),
            record_type: self.record_type,
            fields,
            created_at: Some(created_at),
        })
    }
}

/// Record store backed by a single SQLite table.
///
/// Fields are stored as a JSON object. Predicates and sorting are evaluated
/// on decoded records after selecting by record type. Rows that fail to
/// decode are skipped with a warning.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let pool = init_db(&path).await?;
        tracing::debug!("Opened record store at {}", path.display());
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        let mut rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, record_type, fields, created_at FROM records WHERE record_type = ? ORDER BY rowid",
        )
        .bind(&query.record_type)
        .fetch(&self.pool);

        let mut records = Vec::new();
        while let Some(row) = rows.try_next().await? {
            match row.into_record() {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unreadable row: {}", e),
            }
        }

        Ok(query.apply(records))
    }

    async fn save(&self, mut record: Record) -> Result<Record, StoreError> {
        let id = record
            .id
            .get_or_insert_with(|| RecordId::new(Uuid::new_v4().to_string()))
            .clone();
        let created_at = *record.created_at.get_or_insert_with(Utc::now);
        let fields = serde_json::to_string(&record.fields)
            .map_err(|e| StoreError::Backend(format!("failed to encode fields: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO records (id, record_type, fields, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET record_type = excluded.record_type, fields = excluded.fields
            "#,
        )
        .bind(id.as_str())
        .bind(&record.record_type)
        .bind(&fields)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete(&self, id: &RecordId) -> Result<RecordId, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MenuItem, Restaurant};
    use crate::store::Predicate;
    use tempfile::TempDir;

    struct TestContext {
        store: SqliteRecordStore,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_store() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteRecordStore::open(temp_dir.path().join("records.db"))
            .await
            .unwrap();
        TestContext {
            store,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_init_db_creates_records_table() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("nested").join("test.db"))
            .await
            .unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["records"]);
    }

    #[tokio::test]
    async fn test_save_and_query_roundtrip() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let saved = store.save(Restaurant::new_record("Luigi's")).await.unwrap();
        assert!(saved.id.is_some());

        let records = store.query(&Query::all("Restaurants")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], saved);
    }

    #[tokio::test]
    async fn test_query_sorts_by_name() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        for name in ["Bistro", "Alehouse", "Cantina"] {
            store.save(Restaurant::new_record(name)).await.unwrap();
        }

        let records = store
            .query(&Query::all("Restaurants").sorted_by("name", true))
            .await
            .unwrap();
        let names: Vec<_> = records.iter().filter_map(|r| r.string("name")).collect();
        assert_eq!(names, vec!["Alehouse", "Bistro", "Cantina"]);
    }

    #[tokio::test]
    async fn test_query_filters_by_reference() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let luigi = store.save(Restaurant::new_record("Luigi's")).await.unwrap();
        let mario = store.save(Restaurant::new_record("Mario's")).await.unwrap();
        let luigi_ref = luigi.to_reference().unwrap();

        store
            .save(MenuItem::new_record("Soup", luigi_ref.clone()))
            .await
            .unwrap();
        store
            .save(MenuItem::new_record("Pizza", mario.to_reference().unwrap()))
            .await
            .unwrap();

        let query = Query::all("MenuItems")
            .with_predicate(Predicate::field_equals("restaurant", luigi_ref));
        let records = store.query(&query).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].string("name"), Some("Soup"));
    }

    #[tokio::test]
    async fn test_query_skips_unreadable_rows() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.save(Restaurant::new_record("Luigi's")).await.unwrap();
        sqlx::query(
            "INSERT INTO records (id, record_type, fields, created_at) VALUES ('bad', 'Restaurants', 'not json', 'yesterday')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let records = store.query(&Query::all("Restaurants")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].string("name"), Some("Luigi's"));
    }

    #[tokio::test]
    async fn test_delete_record() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let saved = store.save(Restaurant::new_record("Gone")).await.unwrap();
        let id = saved.id.unwrap();

        assert_eq!(store.delete(&id).await.unwrap(), id);
        assert!(store
            .query(&Query::all("Restaurants"))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.delete(&id).await, Err(StoreError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_deleting_restaurant_keeps_menu_items() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let restaurant = store.save(Restaurant::new_record("Luigi's")).await.unwrap();
        store
            .save(MenuItem::new_record(
                "Soup",
                restaurant.to_reference().unwrap(),
            ))
            .await
            .unwrap();

        store.delete(restaurant.id.as_ref().unwrap()).await.unwrap();

        let items = store.query(&Query::all("MenuItems")).await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
