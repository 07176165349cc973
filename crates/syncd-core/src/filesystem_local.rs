//! Local filesystem `Syncer` implementation (spec §4.A).
//!
//! Mirrors the teacher's `LocalFileSystemAdapter` in shape (async_trait,
//! `tokio::fs`, `tracing::instrument` on every op) but implements the
//! unified [`Syncer`] capability set instead of a OneDrive-specific
//! hashing adapter, and replaces the old read-then-overwrite write path
//! (Design Note: "the source opens existing files read-only before
//! writing — a likely bug") with write-to-temp-then-rename.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::domain::errors::EngineError;
use crate::domain::handle::{Backend, FileHandle};
use crate::ports::syncer::{ByteStream, Syncer};

/// Local-filesystem backend for the File Abstraction.
///
/// Zero-sized: every operation derives its context from the `id`
/// (absolute path string) passed in, so one `LocalSyncer` serves every
/// profile's local root.
#[derive(Debug, Clone, Default)]
pub struct LocalSyncer;

impl LocalSyncer {
    pub fn new() -> Self {
        Self
    }

    fn io_err(context: &str, e: std::io::Error) -> EngineError {
        match e.kind() {
            ErrorKind::PermissionDenied => {
                EngineError::Permanent(format!("{context}: permission denied"))
            }
            _ => EngineError::Transient(format!("{context}: {e}")),
        }
    }
}

/// Renames by inserting a timestamp suffix between basename and
/// extension (spec §4.A). Shared with `syncd-http::syncer` via
/// [`crate::naming::insert_timestamp`] so both backends name
/// rename-asides identically.
fn timestamped_name(path: &std::path::Path) -> PathBuf {
    PathBuf::from(crate::naming::insert_timestamp(&path.to_string_lossy()))
}

#[async_trait]
impl Syncer for LocalSyncer {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    #[instrument(skip(self), fields(id))]
    async fn stat(&self, id: &str) -> Result<FileHandle, EngineError> {
        let path = PathBuf::from(id);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileHandle::absent(id, Backend::Local));
            }
            Err(e) => return Err(Self::io_err("stat", e)),
        };

        let modified = metadata
            .modified()
            .ok()
            .and_then(|st| st.duration_since(std::time::UNIX_EPOCH).ok())
            .and_then(|dur| DateTime::from_timestamp(dur.as_secs() as i64, 0))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(FileHandle {
            id: id.to_string(),
            backend: Backend::Local,
            modified,
            size: metadata.len(),
            is_dir: metadata.is_dir(),
            exists: true,
            deleted: false,
        })
    }

    #[instrument(skip(self, dir), fields(id = %dir.id))]
    async fn children(&self, dir: &FileHandle) -> Result<Vec<FileHandle>, EngineError> {
        if !dir.is_dir || !dir.exists {
            return Ok(Vec::new());
        }
        let mut entries = match tokio::fs::read_dir(&dir.id).await {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err("children", e)),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_err("children", e))?
        {
            let id = entry.path().to_string_lossy().into_owned();
            out.push(self.stat(&id).await?);
        }
        Ok(out)
    }

    #[instrument(skip(self, handle), fields(id = %handle.id))]
    async fn open_read(&self, handle: &FileHandle) -> Result<ByteStream, EngineError> {
        if !handle.exists {
            return Err(EngineError::Precondition(format!(
                "open_read on absent path {}",
                handle.id
            )));
        }
        let file = tokio::fs::File::open(&handle.id)
            .await
            .map_err(|e| Self::io_err("open_read", e))?;
        Ok(Box::pin(file))
    }

    #[instrument(skip(self, reader), fields(id, size))]
    async fn write(
        &self,
        id: &str,
        mut reader: ByteStream,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Result<FileHandle, EngineError> {
        let target = PathBuf::from(id);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_err("write (mkdir parent)", e))?;
        }

        let mut tmp_name = target.as_os_str().to_owned();
        tmp_name.push(".syncd-tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut tmp_file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| Self::io_err("write (create temp)", e))?;
        let copied = tokio::io::copy(&mut reader, &mut tmp_file)
            .await
            .map_err(|e| Self::io_err("write (copy)", e))?;

        if copied != size {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(EngineError::Precondition(format!(
                "short write: expected {size} bytes, copied {copied}"
            )));
        }

        let rounded = FileHandle::round_to_secs(modified);
        let file_time = filetime::FileTime::from_unix_time(rounded.timestamp(), 0);
        filetime::set_file_mtime(&tmp_path, file_time)
            .map_err(|e| Self::io_err("write (set mtime)", e))?;

        tokio::fs::rename(&tmp_path, &target)
            .await
            .map_err(|e| Self::io_err("write (rename into place)", e))?;

        debug!("atomic write complete");
        self.stat(id).await
    }

    #[instrument(skip(self), fields(id))]
    async fn create_dir(&self, id: &str) -> Result<FileHandle, EngineError> {
        match tokio::fs::create_dir(id).await {
            Ok(()) => self.stat(id).await,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(EngineError::Precondition(
                format!("create_dir: {id} already exists"),
            )),
            Err(e) => Err(Self::io_err("create_dir", e)),
        }
    }

    #[instrument(skip(self, handle), fields(id = %handle.id))]
    async fn delete(&self, handle: &FileHandle) -> Result<(), EngineError> {
        if !handle.exists {
            return Ok(());
        }
        let result = if handle.is_dir {
            tokio::fs::remove_dir_all(&handle.id).await
        } else {
            tokio::fs::remove_file(&handle.id).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err("delete", e)),
        }
    }

    #[instrument(skip(self, handle), fields(id = %handle.id))]
    async fn rename(&self, handle: &FileHandle) -> Result<FileHandle, EngineError> {
        if handle.is_dir {
            return Err(EngineError::Precondition(
                "rename is forbidden on directories".into(),
            ));
        }
        let path = PathBuf::from(&handle.id);
        let new_path = timestamped_name(&path);
        tokio::fs::rename(&path, &new_path)
            .await
            .map_err(|e| Self::io_err("rename", e))?;
        let new_id = new_path.to_string_lossy().into_owned();
        self.stat(&new_id).await
    }
}
