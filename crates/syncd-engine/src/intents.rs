//! Mutation intents enqueued by the reconcile decision procedure (spec
//! §4.E): `write`, `create_dir`, `rename`, `delete`. The decision
//! procedure (`reconcile.rs`) only ever produces these — it never calls
//! a `Syncer` directly, so every mutation is serialized through a
//! profile's change queue.

use syncd_core::domain::handle::FileHandle;

/// One queued mutation. `target`/`to` carry the backend the mutation
/// runs against (Design Note 9's closed tagged variant).
#[derive(Debug, Clone)]
pub enum Intent {
    /// Open `from` for reading, then `to.write(reader, from.size, from.modified)`.
    Write { from: FileHandle, to: FileHandle },
    /// Create `target`, failing if it already exists.
    CreateDir { target: FileHandle },
    /// Rename `target` aside (forbidden on directories).
    Rename { target: FileHandle },
    /// Delete `target` (recursive for directories, no-op if absent).
    Delete { target: FileHandle },
}

impl Intent {
    /// The id an echo-suppression guard should be held against for the
    /// duration of this mutation — the side actually being written to.
    pub fn echo_id(&self) -> &str {
        match self {
            Intent::Write { to, .. } => &to.id,
            Intent::CreateDir { target }
            | Intent::Rename { target }
            | Intent::Delete { target } => &target.id,
        }
    }
}
