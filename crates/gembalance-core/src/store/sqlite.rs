//! SQLite-backed key store.

use async_trait::async_trait;
use gembalance_types::{ApiKey, DayBucket, ErrorMarker, KeyError, KeyUsage};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tokio::sync::Mutex;

use super::{fold_dimension, KeyStore};

/// Key store persisted in a single SQLite file.
///
/// All access goes through one connection behind an async mutex; every
/// statement is short and storage-bound, so serializing them is cheaper than
/// a pool. Counter increments use an upsert and the cursor CAS is a guarded
/// UPDATE, which gives the atomicity the trait demands even with multiple
/// processes sharing the file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if necessary) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let conn = Connection::open(path).map_err(|e| KeyError::storage(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, KeyError> {
        let conn = Connection::open_in_memory().map_err(|e| KeyError::storage(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<(), KeyError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS keys (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                secret TEXT NOT NULL,
                name TEXT,
                daily_quota INTEGER,
                error_status INTEGER,
                error_at INTEGER,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS usage_counters (
                key_id TEXT NOT NULL,
                dimension TEXT NOT NULL,
                day TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (key_id, dimension, day)
            );
            CREATE INDEX IF NOT EXISTS idx_usage_dimension_day
                ON usage_counters (dimension, day);
            CREATE TABLE IF NOT EXISTS rotation_cursor (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO rotation_cursor (id, value) VALUES (0, 0);",
        )
        .map_err(|e| KeyError::storage(e.to_string()))
    }

    fn row_to_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKey> {
        let error_status: Option<u16> = row.get("error_status")?;
        let error_at: Option<i64> = row.get("error_at")?;
        let error = match (error_status, error_at) {
            (Some(status_code), Some(occurred_at)) => {
                Some(ErrorMarker { status_code, occurred_at })
            },
            _ => None,
        };
        Ok(ApiKey {
            id: row.get("id")?,
            secret: row.get("secret")?,
            name: row.get("name")?,
            daily_quota: row.get::<_, Option<i64>>("daily_quota")?.map(|q| q as u64),
            error,
            created_at: row.get("created_at")?,
        })
    }
}

#[async_trait]
impl KeyStore for SqliteStore {
    async fn insert_key(&self, key: &ApiKey) -> Result<(), KeyError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO keys (id, secret, name, daily_quota, error_status, error_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key.id,
                key.secret,
                key.name,
                key.daily_quota.map(|q| q as i64),
                key.error.map(|e| e.status_code),
                key.error.map(|e| e.occurred_at),
                key.created_at,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("UNIQUE") => {
                KeyError::Validation {
                    field: "id".to_string(),
                    message: format!("duplicate key id: {}", key.id),
                }
            },
            other => KeyError::storage(other.to_string()),
        })?;
        Ok(())
    }

    async fn delete_key(&self, id: &str) -> Result<bool, KeyError> {
        let conn = self.conn.lock().await;
        let removed = conn
            .execute("DELETE FROM keys WHERE id = ?1", params![id])
            .map_err(|e| KeyError::storage(e.to_string()))?;
        if removed > 0 {
            conn.execute("DELETE FROM usage_counters WHERE key_id = ?1", params![id])
                .map_err(|e| KeyError::storage(e.to_string()))?;
        }
        Ok(removed > 0)
    }

    async fn get_key(&self, id: &str) -> Result<Option<ApiKey>, KeyError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, secret, name, daily_quota, error_status, error_at, created_at
             FROM keys WHERE id = ?1",
            params![id],
            Self::row_to_key,
        )
        .optional()
        .map_err(|e| KeyError::storage(e.to_string()))
    }

    async fn list_keys(&self) -> Result<Vec<ApiKey>, KeyError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, secret, name, daily_quota, error_status, error_at, created_at
                 FROM keys ORDER BY seq ASC",
            )
            .map_err(|e| KeyError::storage(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::row_to_key)
            .map_err(|e| KeyError::storage(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|e| KeyError::storage(e.to_string()))
    }

    async fn increment_usage(
        &self,
        key_id: &str,
        dimension: &str,
        day: &DayBucket,
    ) -> Result<(), KeyError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO usage_counters (key_id, dimension, day, count) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT (key_id, dimension, day) DO UPDATE SET count = count + 1",
            params![key_id, dimension, day.as_str()],
        )
        .map_err(|e| KeyError::storage(e.to_string()))?;
        Ok(())
    }

    async fn usage(
        &self,
        key_id: &str,
        dimension: &str,
        day: &DayBucket,
    ) -> Result<u64, KeyError> {
        let conn = self.conn.lock().await;
        let count: Option<i64> = conn
            .query_row(
                "SELECT count FROM usage_counters
                 WHERE key_id = ?1 AND dimension = ?2 AND day = ?3",
                params![key_id, dimension, day.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| KeyError::storage(e.to_string()))?;
        Ok(count.unwrap_or(0) as u64)
    }

    async fn dimension_total(&self, dimension: &str, day: &DayBucket) -> Result<u64, KeyError> {
        let conn = self.conn.lock().await;
        let total: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(count), 0) FROM usage_counters
                 WHERE dimension = ?1 AND day = ?2",
                params![dimension, day.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| KeyError::storage(e.to_string()))?;
        Ok(total as u64)
    }

    async fn usage_snapshot(&self, key_id: &str, day: &DayBucket) -> Result<KeyUsage, KeyError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT dimension, count FROM usage_counters
                 WHERE key_id = ?1 AND day = ?2",
            )
            .map_err(|e| KeyError::storage(e.to_string()))?;
        let rows = stmt
            .query_map(params![key_id, day.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| KeyError::storage(e.to_string()))?;

        let mut snapshot = KeyUsage::default();
        for row in rows {
            let (dimension, count) = row.map_err(|e| KeyError::storage(e.to_string()))?;
            fold_dimension(&mut snapshot, &dimension, count as u64);
        }
        Ok(snapshot)
    }

    async fn set_error(&self, key_id: &str, marker: ErrorMarker) -> Result<(), KeyError> {
        let conn = self.conn.lock().await;
        let updated = conn
            .execute(
                "UPDATE keys SET error_status = ?2, error_at = ?3 WHERE id = ?1",
                params![key_id, marker.status_code, marker.occurred_at],
            )
            .map_err(|e| KeyError::storage(e.to_string()))?;
        if updated == 0 {
            return Err(KeyError::NotFound { id: key_id.to_string() });
        }
        Ok(())
    }

    async fn clear_error(&self, key_id: &str) -> Result<bool, KeyError> {
        let conn = self.conn.lock().await;
        let existed: Option<Option<u16>> = conn
            .query_row("SELECT error_status FROM keys WHERE id = ?1", params![key_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| KeyError::storage(e.to_string()))?;
        let had_error = match existed {
            None => return Err(KeyError::NotFound { id: key_id.to_string() }),
            Some(status) => status.is_some(),
        };
        conn.execute(
            "UPDATE keys SET error_status = NULL, error_at = NULL WHERE id = ?1",
            params![key_id],
        )
        .map_err(|e| KeyError::storage(e.to_string()))?;
        Ok(had_error)
    }

    async fn cursor(&self) -> Result<u64, KeyError> {
        let conn = self.conn.lock().await;
        let value: i64 = conn
            .query_row("SELECT value FROM rotation_cursor WHERE id = 0", [], |row| row.get(0))
            .map_err(|e| KeyError::storage(e.to_string()))?;
        Ok(value as u64)
    }

    async fn cas_cursor(&self, expected: u64, next: u64) -> Result<bool, KeyError> {
        let conn = self.conn.lock().await;
        let updated = conn
            .execute(
                "UPDATE rotation_cursor SET value = ?2 WHERE id = 0 AND value = ?1",
                params![expected as i64, next as i64],
            )
            .map_err(|e| KeyError::storage(e.to_string()))?;
        Ok(updated == 1)
    }
}
