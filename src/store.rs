//! Persistence of finished datasets.

use crate::dataset::ReviewDataset;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Receipt for a stored dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAck {
    /// Identifies the rows written by this call
    pub batch_id: Uuid,
    pub rows: usize,
    pub stored_at: DateTime<Utc>,
}

/// Where finished datasets go.
pub trait ReviewStore: Send + Sync {
    /// Appends `dataset` under the query's product name.
    fn store(&self, product_name: &str, dataset: &ReviewDataset) -> Result<StoreAck, StoreError>;
}

/// Append-only SQLite store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!("Opening review store at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reviews (
                query TEXT NOT NULL,
                batch_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                product_name TEXT NOT NULL,
                reviewer_name TEXT NOT NULL,
                rating REAL NOT NULL,
                review_text TEXT NOT NULL,
                review_title TEXT,
                review_date TEXT,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (query, batch_id, position)
            );

            CREATE INDEX IF NOT EXISTS idx_reviews_query ON reviews (query);
            ",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Number of rows stored under `product_name` across all batches.
    pub fn count_for(&self, product_name: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE query = ?1",
            params![product_name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ReviewStore for SqliteStore {
    fn store(&self, product_name: &str, dataset: &ReviewDataset) -> Result<StoreAck, StoreError> {
        if dataset.is_empty() {
            return Err(StoreError::Empty(product_name.to_string()));
        }

        let batch_id = Uuid::new_v4();
        let stored_at = Utc::now();
        let stamp = stored_at.to_rfc3339();

        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO reviews (
                    query, batch_id, position, product_name, reviewer_name,
                    rating, review_text, review_title, review_date, stored_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, record) in dataset.iter().enumerate() {
                stmt.execute(params![
                    product_name,
                    batch_id.to_string(),
                    position as i64,
                    &record.product_name,
                    &record.reviewer_name,
                    record.rating,
                    &record.review_text,
                    &record.review_title,
                    &record.review_date,
                    &stamp,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Stored {} reviews for '{}' (batch {})", dataset.len(), product_name, batch_id);

        Ok(StoreAck { batch_id, rows: dataset.len(), stored_at })
    }
}
