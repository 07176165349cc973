//! syncd-watch — the local kernel-event change source (spec §4.B).
//!
//! [`watcher::LocalWatcher`] wraps a single process-wide `notify`
//! watcher, debounces bursts per id, and implements [`Monitor`] for
//! reference-counted directory subscription. It shares the
//! `(profile_id, FileHandle)` handler protocol with `syncd-engine`'s
//! remote poller, so the engine's reconcile loop doesn't care which side
//! produced an event.

pub mod watcher;

pub use watcher::LocalWatcher;
pub use syncd_core::ports::Monitor;
