//! syncd-store — the persistent key/value store (spec §6 "Persistent store").
//!
//! Three logical buckets over sqlite (sqlx, the teacher's persistence
//! stack): `profiles` (the registry), `log` (the bounded ring), `remote`
//! (prior-remote snapshots keyed by watched directory id). [`SqliteStore`]
//! implements `syncd_core::ports::StateStore` directly against these
//! tables; there is no generic key/value abstraction in between because
//! the three buckets have different shapes (a registry, an append-only
//! ring, a snapshot replace).

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteStore;
