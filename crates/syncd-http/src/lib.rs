//! syncd-http — the remote-backend `Syncer` (spec §4.A, §6).
//!
//! - [`client`] — the HTTP client: stat/list/upload/delete/move/mkdir
//!   against the remote file service's `/v1/file/...` and
//!   `/v1/properties/...` endpoints, HTTP Basic auth.
//! - [`syncer`] — [`syncer::RemoteSyncer`], the `Syncer` impl the engine
//!   drives; wraps `Arc<RemoteClient>` rather than requiring a downcast
//!   (Design Note 9).
//! - [`error`] — maps transport failures onto [`syncd_core::domain::errors::EngineError`].

pub mod client;
pub mod error;
pub mod syncer;

pub use client::{RemoteClient, RemoteProperties};
pub use syncer::RemoteSyncer;
