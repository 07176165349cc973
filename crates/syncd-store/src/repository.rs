//! `SqliteStore`: the [`StateStore`] implementation over the three
//! buckets in `migrations/20260203_initial.sql`.
//!
//! Every bucket stores its domain value as a JSON blob in a single
//! `TEXT` column rather than projecting fields into SQL columns:
//! `ProfileRecord`, `LogEntry`, and `RemoteSnapshotEntry` are already
//! `Serialize`/`Deserialize` (spec §3 calls the store "a transactional
//! embedded key/value store" — there's no relational structure to buy by
//! normalizing them further).

use sqlx::{Row, SqlitePool};

use syncd_core::domain::audit::{LogEntry, LogKind};
use syncd_core::domain::handle::RemoteSnapshotEntry;
use syncd_core::domain::profile::ProfileRecord;
use syncd_core::ports::{StateStore, StoreError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse_kind(s: &str) -> LogKind {
    match s {
        "local" => LogKind::Local,
        "remote" => LogKind::Remote,
        _ => LogKind::Both,
    }
}

#[async_trait::async_trait]
impl StateStore for SqliteStore {
    // -- profiles bucket ------------------------------------------------

    async fn save_profile(&self, id: &str, record: &ProfileRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StoreError::Backend(format!("failed to serialize profile: {e}")))?;
        sqlx::query("INSERT INTO profiles (id, record) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET record = excluded.record")
            .bind(id)
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn load_profile(&self, id: &str) -> Result<ProfileRecord, StoreError> {
        let row = sqlx::query("SELECT record FROM profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let json: String = row.try_get("record").map_err(backend_err)?;
        serde_json::from_str(&json)
            .map_err(|e| StoreError::Backend(format!("failed to deserialize profile {id}: {e}")))
    }

    async fn load_all_profiles(&self) -> Result<Vec<(String, ProfileRecord)>, StoreError> {
        let rows = sqlx::query("SELECT id, record FROM profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(backend_err)?;
                let json: String = row.try_get("record").map_err(backend_err)?;
                let record: ProfileRecord = serde_json::from_str(&json).map_err(|e| {
                    StoreError::Backend(format!("failed to deserialize profile {id}: {e}"))
                })?;
                Ok((id, record))
            })
            .collect()
    }

    async fn delete_profile(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM profiles WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    // -- log bucket -------------------------------------------------------

    async fn append_log(&self, entry: LogEntry, capacity: usize) -> Result<LogEntry, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        let row = sqlx::query(
            "INSERT INTO log (when_rfc3339, kind, message) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(entry.when().to_rfc3339())
        .bind(entry.kind().to_string())
        .bind(entry.message())
        .fetch_one(&mut *tx)
        .await
        .map_err(backend_err)?;
        let new_id: i64 = row.try_get("id").map_err(backend_err)?;

        // Oldest-first eviction: if the ring is over capacity, drop
        // enough of the lowest ids to get back under it.
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM log")
            .fetch_one(&mut *tx)
            .await
            .map_err(backend_err)?
            .try_get("n")
            .map_err(backend_err)?;
        let over = count - capacity as i64;
        if over > 0 {
            sqlx::query(
                "DELETE FROM log WHERE id IN (SELECT id FROM log ORDER BY id ASC LIMIT ?1)",
            )
            .bind(over)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;
        }

        tx.commit().await.map_err(backend_err)?;
        Ok(entry.with_id(new_id.into()))
    }

    async fn iter_log(&self, offset: usize, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, when_rfc3339, kind, message FROM log ORDER BY id ASC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        rows.into_iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(backend_err)?;
                let when_str: String = row.try_get("when_rfc3339").map_err(backend_err)?;
                let kind_str: String = row.try_get("kind").map_err(backend_err)?;
                let message: String = row.try_get("message").map_err(backend_err)?;
                let when = chrono::DateTime::parse_from_rfc3339(&when_str)
                    .map_err(|e| StoreError::Backend(format!("bad log timestamp: {e}")))?
                    .with_timezone(&chrono::Utc);
                Ok(LogEntry::new(parse_kind(&kind_str), message)
                    .with_when(when)
                    .with_id(id.into()))
            })
            .collect()
    }

    // -- remote bucket (prior-remote snapshot) ----------------------------

    async fn load_remote_snapshot(
        &self,
        dir_id: &str,
    ) -> Result<Vec<RemoteSnapshotEntry>, StoreError> {
        let row = sqlx::query("SELECT entries FROM remote_snapshots WHERE dir_id = ?1")
            .bind(dir_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        match row {
            None => Ok(Vec::new()),
            Some(row) => {
                let json: String = row.try_get("entries").map_err(backend_err)?;
                serde_json::from_str(&json).map_err(|e| {
                    StoreError::Backend(format!("failed to deserialize snapshot {dir_id}: {e}"))
                })
            }
        }
    }

    async fn save_remote_snapshot(
        &self,
        dir_id: &str,
        entries: &[RemoteSnapshotEntry],
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(entries)
            .map_err(|e| StoreError::Backend(format!("failed to serialize snapshot: {e}")))?;
        sqlx::query(
            "INSERT INTO remote_snapshots (dir_id, entries) VALUES (?1, ?2) \
             ON CONFLICT(dir_id) DO UPDATE SET entries = excluded.entries",
        )
        .bind(dir_id)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn delete_remote_snapshot(&self, dir_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM remote_snapshots WHERE dir_id = ?1")
            .bind(dir_id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}
