//! The engine's per-profile dependency bundle.
//!
//! Grounded in Design Note 9: rather than the source's cyclic `File ↔
//! watcher registry` references, every dependency the reconcile loop
//! needs — the two `Syncer`s, the two `Monitor`s, the change queue, and
//! the shared `InFlight` gate — is an explicit, injected field. Nothing
//! here is a process-wide singleton, so tests can construct as many
//! independent `EngineContext`s as they like.

use std::sync::Arc;

use syncd_core::domain::handle::Backend;
use syncd_core::domain::profile::Profile;
use syncd_core::domain::runtime::InFlight;
use syncd_core::ports::{Monitor, Syncer};

use crate::queue::ChangeQueueHandle;

/// The local and remote `Syncer`/`Monitor` pair a profile's engine
/// invocations dispatch against.
///
/// A closed tagged variant over open dispatch (Design Note 9): callers
/// pick the right side with [`Backends::syncer`]/[`Backends::monitor`]
/// rather than downcasting a trait object.
pub struct Backends {
    pub local: Arc<dyn Syncer>,
    pub remote: Arc<dyn Syncer>,
    pub local_monitor: Arc<dyn Monitor>,
    pub remote_monitor: Arc<dyn Monitor>,
}

impl Backends {
    pub fn syncer(&self, backend: Backend) -> &Arc<dyn Syncer> {
        match backend {
            Backend::Local => &self.local,
            Backend::Remote => &self.remote,
        }
    }

    pub fn monitor(&self, backend: Backend) -> &Arc<dyn Monitor> {
        match backend {
            Backend::Local => &self.local_monitor,
            Backend::Remote => &self.remote_monitor,
        }
    }
}

/// Everything `reconcile::handle_change` needs for one profile.
pub struct EngineContext {
    pub profile: Profile,
    pub backends: Arc<Backends>,
    pub queue: ChangeQueueHandle,
    pub in_flight: Arc<InFlight>,
}

impl EngineContext {
    pub fn profile_id(&self) -> String {
        self.profile.id()
    }
}
