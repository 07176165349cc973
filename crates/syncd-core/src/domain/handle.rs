//! The unified file handle (spec §3, §4.A).
//!
//! A [`FileHandle`] is the one representation both backends produce: a
//! local [`SyncPath`] and a remote [`RemotePath`] are both turned into a
//! `FileHandle` before the engine ever sees them, so `reconcile_pair`
//! (`syncd-engine`) never has to know which side it is looking at.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{RemotePath, SyncPath};

/// Which side of a profile a handle belongs to.
///
/// Kept as a plain enum rather than generic parameters: Design Note 9
/// models the capability set as a closed tagged variant, and `Backend`
/// is the tag that travels with every handle and every `Syncer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Remote => write!(f, "remote"),
        }
    }
}

/// Uniform metadata snapshot for a local or remote path (spec §3 "File
/// handle").
///
/// Identity is by `id` alone (a local absolute path or a remote URL);
/// `deleted` means "this path used to exist and has since vanished",
/// which is distinct from a path that never existed (`exists = false,
/// deleted = false`, e.g. the very first time the engine ever sees it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: String,
    pub backend: Backend,
    /// Second-precision. Local handles round down at stat time so the two
    /// sides can be compared with `==` instead of a tolerance window.
    pub modified: DateTime<Utc>,
    pub size: u64,
    pub is_dir: bool,
    pub exists: bool,
    pub deleted: bool,
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for FileHandle {}

impl FileHandle {
    /// A handle for a path that has never existed.
    pub fn absent(id: impl Into<String>, backend: Backend) -> Self {
        Self {
            id: id.into(),
            backend,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            size: 0,
            is_dir: false,
            exists: false,
            deleted: false,
        }
    }

    /// A synthetic handle representing a path that has been removed.
    /// Used by the poller (§4.C) for remote deletions and by the watcher
    /// (§4.B) for `Rename`/`Remove` inotify events.
    pub fn deleted(id: impl Into<String>, backend: Backend) -> Self {
        Self {
            id: id.into(),
            backend,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            size: 0,
            is_dir: false,
            exists: false,
            deleted: true,
        }
    }

    /// Round a timestamp to second precision, matching the remote side's
    /// native precision (spec §3: "local must be rounded to match").
    pub fn round_to_secs(ts: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
    }

    /// Local path this handle refers to, if it is a local handle.
    pub fn local_path(&self) -> Option<SyncPath> {
        (self.backend == Backend::Local)
            .then(|| SyncPath::new(std::path::PathBuf::from(&self.id)).ok())
            .flatten()
    }

    /// Remote path this handle refers to, if it is a remote handle.
    pub fn remote_path(&self) -> Option<RemotePath> {
        (self.backend == Backend::Remote)
            .then(|| RemotePath::new(self.id.clone()).ok())
            .flatten()
    }

    /// The basename of `id`, used for rename-aside naming.
    pub fn basename(&self) -> &str {
        self.id
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.id)
    }
}

/// The subset of [`FileHandle`] that must round-trip through the
/// persisted prior-remote-snapshot (spec §3: "Only the attributes needed
/// for diffing must round-trip").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSnapshotEntry {
    pub id: String,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
}

impl From<&FileHandle> for RemoteSnapshotEntry {
    fn from(h: &FileHandle) -> Self {
        Self {
            id: h.id.clone(),
            modified: h.modified,
            is_dir: h.is_dir,
        }
    }
}

impl RemoteSnapshotEntry {
    pub fn to_handle(&self) -> FileHandle {
        FileHandle {
            id: self.id.clone(),
            backend: Backend::Remote,
            modified: self.modified,
            size: 0,
            is_dir: self.is_dir,
            exists: true,
            deleted: false,
        }
    }
}
