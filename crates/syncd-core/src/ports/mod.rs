//! Port definitions (hexagonal architecture interfaces).
//!
//! Ports are the interfaces the domain core depends on; implementations
//! live in adapter crates (`syncd-core::filesystem_local`, `syncd-http`,
//! `syncd-store`).
//!
//! - [`Syncer`] / [`Monitor`] — the File Abstraction capability set (§4.A)
//!   and the reference-counted directory-subscription protocol shared by
//!   the local watcher and the remote poller.
//! - [`StateStore`] — the persistent key/value store (§6).

pub mod state_store;
pub mod syncer;

pub use state_store::{StateStore, StoreError};
pub use syncer::{ByteStream, Monitor, Syncer};
