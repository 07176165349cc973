//! Persistent store port (spec §6 "Persistent store", consumed).
//!
//! Three logical buckets over a transactional embedded key/value store:
//! `profiles` (registry), `log` (bounded ring), `remote` (prior-remote
//! snapshots, keyed by watched directory id). `syncd-store` implements
//! this over sqlite (sqlx), the teacher's persistence stack.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audit::LogEntry;
use crate::domain::handle::RemoteSnapshotEntry;
use crate::domain::profile::ProfileRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    // -- profiles bucket --------------------------------------------------
    async fn save_profile(&self, id: &str, record: &ProfileRecord) -> Result<(), StoreError>;
    async fn load_profile(&self, id: &str) -> Result<ProfileRecord, StoreError>;
    async fn load_all_profiles(&self) -> Result<Vec<(String, ProfileRecord)>, StoreError>;
    async fn delete_profile(&self, id: &str) -> Result<(), StoreError>;

    // -- log bucket ---------------------------------------------------------
    /// Appends an entry, assigning it an id, and evicts the oldest entry
    /// if the ring is at `capacity`.
    async fn append_log(&self, entry: LogEntry, capacity: usize) -> Result<LogEntry, StoreError>;
    /// Oldest-first page of up to `limit` entries starting at `offset`.
    async fn iter_log(&self, offset: usize, limit: usize) -> Result<Vec<LogEntry>, StoreError>;

    // -- remote bucket (prior-remote snapshot) ------------------------------
    async fn load_remote_snapshot(
        &self,
        dir_id: &str,
    ) -> Result<Vec<RemoteSnapshotEntry>, StoreError>;
    async fn save_remote_snapshot(
        &self,
        dir_id: &str,
        entries: &[RemoteSnapshotEntry],
    ) -> Result<(), StoreError>;
    /// Called when a directory subtree is deleted or a profile stops
    /// watching it, so a stale snapshot can't resurrect a deletion.
    async fn delete_remote_snapshot(&self, dir_id: &str) -> Result<(), StoreError>;
}
