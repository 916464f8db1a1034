#[cfg(feature = "database")]
use async_trait::async_trait;
#[cfg(feature = "database")]
use serde_json::Value;
#[cfg(feature = "database")]
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
#[cfg(feature = "database")]
use sqlx::{migrate::MigrateDatabase, Row, SqlitePool};
#[cfg(feature = "database")]
use std::str::FromStr;
#[cfg(feature = "database")]
use std::time::Duration;
#[cfg(feature = "database")]
use tokio::sync::Mutex;
#[cfg(feature = "database")]
use tracing::info;

#[cfg(feature = "database")]
use crate::observability::OperationTimer;
#[cfg(feature = "database")]
use crate::store::{
    ensure_object, is_deleted, violated_key, DocumentStore, Filter, StoreError, StoreResult,
    UniqueKey,
};

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[cfg(feature = "database")]
/// SQLite-backed document store: one row per document, body stored as JSON text.
///
/// Writes go through `write_lock` so the read-check-write in `write_checked`
/// never races another writer into `SQLITE_BUSY`.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

#[cfg(feature = "database")]
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(feature = "database")]
impl SqliteDocumentStore {
    /// Open (creating if needed) the database and optionally run migrations
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> anyhow::Result<Self> {
        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }

    async fn write_checked(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
        must_exist: bool,
    ) -> StoreResult<bool> {
        ensure_object(&doc)?;
        let _writer = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        if must_exist && !exists {
            return Ok(false);
        }
        if !must_exist && exists {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        if !keys.is_empty() {
            let rows = sqlx::query(
                "SELECT id, body FROM documents WHERE collection = ?1 AND is_deleted = 0",
            )
            .bind(collection)
            .fetch_all(&mut *tx)
            .await?;
            let existing = rows
                .iter()
                .map(|row| {
                    let body: String = row.get("body");
                    Ok((row.get::<String, _>("id"), serde_json::from_str::<Value>(&body)?))
                })
                .collect::<StoreResult<Vec<(String, Value)>>>()?;
            if let Some(key) = violated_key(
                existing.iter().map(|(doc_id, doc)| (doc_id.as_str(), doc)),
                id,
                keys,
            ) {
                return Err(StoreError::UniqueViolation {
                    collection: collection.to_string(),
                    fields: key.describe(),
                });
            }
        }

        let body = serde_json::to_string(&doc)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents (collection, id, body, is_deleted, updated_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(is_deleted(&doc))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()> {
        self.write_checked(collection, id, doc, &[], false).await?;
        Ok(())
    }

    async fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
    ) -> StoreResult<()> {
        self.write_checked(collection, id, doc, keys, false).await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> StoreResult<bool> {
        self.write_checked(collection, id, doc, &[], true).await
    }

    async fn replace_unique(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
    ) -> StoreResult<bool> {
        self.write_checked(collection, id, doc, keys, true).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let timer = OperationTimer::new("sqlite.find");
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;
        let mut matched = Vec::new();
        for row in rows {
            let body: String = row.get("body");
            let doc: Value = serde_json::from_str(&body)?;
            if filter.matches(&doc) {
                matched.push(doc);
            }
        }
        timer.finish();
        Ok(matched)
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let _writer = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(feature = "database")]
static DB_STORE: std::sync::LazyLock<
    tokio::sync::RwLock<Option<std::sync::Arc<SqliteDocumentStore>>>,
> = std::sync::LazyLock::new(|| tokio::sync::RwLock::new(None));

#[cfg(feature = "database")]
/// Open the configured SQLite store; `None` when no database is configured
pub async fn init_database(
    config: &crate::config::QuotedeskConfig,
) -> anyhow::Result<Option<std::sync::Arc<dyn DocumentStore>>> {
    let Some(db_config) = &config.database else {
        info!("Database not configured, using in-memory document store");
        return Ok(None);
    };

    info!("Initializing database at {}", db_config.url);
    let store = std::sync::Arc::new(
        SqliteDocumentStore::connect(
            &db_config.url,
            db_config.max_connections,
            db_config.auto_migrate,
        )
        .await?,
    );
    *DB_STORE.write().await = Some(store.clone());
    info!("Database store initialized successfully");
    Ok(Some(store))
}

#[cfg(feature = "database")]
/// Shutdown database connections
pub async fn shutdown_database() {
    if let Some(store) = DB_STORE.read().await.as_ref() {
        store.shutdown().await;
    }
}

// Stub implementations for when database feature is not enabled
#[cfg(not(feature = "database"))]
pub async fn init_database(
    config: &crate::config::QuotedeskConfig,
) -> anyhow::Result<Option<std::sync::Arc<dyn crate::store::DocumentStore>>> {
    if config.database.is_some() {
        tracing::warn!("Database configured but the `database` feature is not enabled; using in-memory store");
    } else {
        tracing::info!("Database feature not enabled, using in-memory document store");
    }
    Ok(None)
}

#[cfg(not(feature = "database"))]
pub async fn shutdown_database() {
    tracing::info!("Database feature not enabled, no database to shutdown");
}
