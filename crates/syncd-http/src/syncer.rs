//! [`Syncer`] implementation for the remote backend (spec §4.A).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;

use syncd_core::domain::errors::EngineError;
use syncd_core::domain::handle::{Backend, FileHandle};
use syncd_core::ports::{ByteStream, Syncer};

use crate::client::RemoteClient;

/// Remote `Syncer`. Closes over `Arc<RemoteClient>` instead of requiring
/// a downcast from a trait object (Design Note 9's closed tagged variant).
pub struct RemoteSyncer {
    client: Arc<RemoteClient>,
}

impl RemoteSyncer {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Syncer for RemoteSyncer {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    async fn stat(&self, id: &str) -> Result<FileHandle, EngineError> {
        self.client.stat(id).await
    }

    async fn children(&self, dir: &FileHandle) -> Result<Vec<FileHandle>, EngineError> {
        if !dir.is_dir {
            return Ok(Vec::new());
        }
        self.client.children(&dir.id).await
    }

    async fn open_read(&self, handle: &FileHandle) -> Result<ByteStream, EngineError> {
        if !handle.exists {
            return Err(EngineError::Precondition(format!(
                "open_read on absent remote path: {}",
                handle.id
            )));
        }
        let resp = self.client.open_read(&handle.id).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| EngineError::Transient(e.to_string()))?;
        let cursor = std::io::Cursor::new(bytes.to_vec());
        Ok(Box::pin(cursor))
    }

    async fn write(
        &self,
        id: &str,
        mut reader: ByteStream,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Result<FileHandle, EngineError> {
        let mut buf = Vec::with_capacity(size as usize);
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| EngineError::Transient(e.to_string()))?;
        if buf.len() as u64 != size {
            return Err(EngineError::Precondition(format!(
                "short write: expected {size} bytes, copied {}",
                buf.len()
            )));
        }
        self.client.upload(id, buf, modified).await
    }

    async fn create_dir(&self, id: &str) -> Result<FileHandle, EngineError> {
        let existing = self.client.stat(id).await?;
        if existing.exists {
            return Err(EngineError::Precondition(format!(
                "create_dir over existing path: {id}"
            )));
        }
        self.client.create_dir(id).await
    }

    async fn delete(&self, handle: &FileHandle) -> Result<(), EngineError> {
        if !handle.exists {
            return Ok(());
        }
        self.client.delete(&handle.id).await
    }

    async fn rename(&self, handle: &FileHandle) -> Result<FileHandle, EngineError> {
        if handle.is_dir {
            return Err(EngineError::Precondition(
                "rename is forbidden on directories".to_string(),
            ));
        }
        let new_id = syncd_core::naming::insert_timestamp(&handle.id);
        self.client.rename_to(&handle.id, &new_id).await
    }
}
