//! The File Abstraction capability set (spec §4.A).
//!
//! [`Syncer`] is the one trait both backends implement: `syncd-core`'s
//! local-filesystem adapter and `syncd-http`'s remote-file-service
//! client. There are exactly two implementations, so the engine never
//! needs to downcast out of a trait object to reach backend-specific
//! context (Design Note 9) — each impl simply closes over what it needs
//! (nothing for local, `Arc<RemoteClient>` for remote).
//!
//! `start_monitor`/`stop_monitor` from spec §4.A are deliberately *not*
//! methods here: Design Note 9 calls out the source's cyclic
//! `File ↔ watcher registry` references as a defect to fix by having the
//! engine orchestrate subscription directly against a [`Monitor`],
//! rather than threading a watcher pointer through every handle.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::domain::errors::EngineError;
use crate::domain::handle::{Backend, FileHandle};

pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Uniform operations over a local or remote directory tree.
#[async_trait]
pub trait Syncer: Send + Sync {
    fn backend(&self) -> Backend;

    /// Returns a handle with `exists = false` rather than failing when
    /// the path is absent.
    async fn stat(&self, id: &str) -> Result<FileHandle, EngineError>;

    /// Empty if `dir` is not a directory.
    async fn children(&self, dir: &FileHandle) -> Result<Vec<FileHandle>, EngineError>;

    /// Fails if `¬exists`.
    async fn open_read(&self, handle: &FileHandle) -> Result<ByteStream, EngineError>;

    /// Atomically replaces current content, sets mtime to `modified`
    /// (rounded to seconds), and fails with a precondition error if the
    /// bytes actually copied don't match `size`.
    async fn write(
        &self,
        id: &str,
        reader: ByteStream,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Result<FileHandle, EngineError>;

    /// Fails if `id` already exists.
    async fn create_dir(&self, id: &str) -> Result<FileHandle, EngineError>;

    /// Recursive for directories; a no-op when `¬exists`.
    async fn delete(&self, handle: &FileHandle) -> Result<(), EngineError>;

    /// Forbidden on directories. Inserts a timestamp suffix between the
    /// basename and extension.
    async fn rename(&self, handle: &FileHandle) -> Result<FileHandle, EngineError>;
}

/// Reference-counted directory subscription, shared by the local watcher
/// (§4.B) and the remote poller (§4.C). The first subscriber installs
/// the underlying watch (a kernel inotify watch, or simply membership in
/// the poller's `watched` map); the last `unsubscribe` tears it down.
#[async_trait]
pub trait Monitor: Send + Sync {
    async fn subscribe(&self, profile_id: &str, dir: &FileHandle);
    async fn unsubscribe(&self, profile_id: &str, dir: &FileHandle);
}
