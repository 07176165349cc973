//! syncd-core — domain logic and ports shared by every other crate.
//!
//! - [`domain`] — `Profile`, `FileHandle`, bounded-log entries, errors.
//! - [`ports`] — `Syncer`/`Monitor` (the File Abstraction, §4.A) and
//!   `StateStore` (the persisted key/value store, §6).
//! - [`config`] — the daemon's JSON settings file (§6).
//! - [`filesystem_local`] — the local-filesystem `Syncer` implementation.
//!
//! This crate has no async-runtime-specific adapters besides the local
//! filesystem: `syncd-http` implements `Syncer` for the remote side, and
//! `syncd-store` implements `StateStore`, so both can depend on `tokio`
//! and `reqwest`/`sqlx` without pulling those into this crate's surface.

pub mod config;
pub mod domain;
pub mod filesystem_local;
pub mod naming;
pub mod ports;
