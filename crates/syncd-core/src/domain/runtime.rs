//! Ephemeral runtime state (spec §3 "Ephemeral runtime state").
//!
//! These structures are explicit, injectable dependencies rather than
//! process-wide singletons (Design Note 9): a `LocalWatcher` and a
//! `RemotePoller` both take an `Arc<IgnoreEcho>` at construction so
//! multiple engines — notably in tests — can coexist without sharing
//! global state.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

/// The set of ids whose next change event must be discarded because the
/// engine itself is mutating them (spec §4.B "Echo suppression").
#[derive(Debug, Default)]
pub struct IgnoreEcho {
    ids: DashSet<String>,
}

impl IgnoreEcho {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    pub fn remove(&self, id: &str) {
        self.ids.remove(id);
    }

    /// Wraps `id` in the ignore set for the duration of the returned
    /// guard, matching spec §4.B: "every engine-initiated local mutation
    /// wraps the target id in `ignore_echo` for the duration of the call".
    pub fn guard<'a>(self: &'a Arc<Self>, id: impl Into<String>) -> EchoGuard<'a> {
        let id = id.into();
        self.insert(id.clone());
        EchoGuard { set: self, id }
    }
}

/// RAII guard that removes its id from [`IgnoreEcho`] on drop.
pub struct EchoGuard<'a> {
    set: &'a IgnoreEcho,
    id: String,
}

impl Drop for EchoGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

/// Per-profile gating set (spec §3 "Ephemeral runtime state" `in_flight`,
/// §4.D Step 0, §4.E retry "drains only while `P.in_flight == 0`").
///
/// Holds the set of ids currently owned by an in-progress engine
/// invocation, keyed by profile. `try_acquire` takes both sides of a
/// pair atomically: if either id is already owned, neither is taken, so
/// "at-most-one-in-flight" (spec §8 invariant 8) holds for the pair as a
/// whole, not just per id.
#[derive(Debug, Default)]
pub struct InFlight {
    ids: DashMap<String, DashSet<String>>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attempts to acquire every id in `ids` for `profile_id`. Returns
    /// `None` if any of them is already owned.
    pub fn try_acquire(self: &Arc<Self>, profile_id: &str, ids: &[&str]) -> Option<InFlightGuard> {
        let mut entry = self.ids.entry(profile_id.to_string()).or_default();
        if ids.iter().any(|id| entry.contains(*id)) {
            return None;
        }
        for id in ids {
            entry.insert((*id).to_string());
        }
        drop(entry);
        Some(InFlightGuard {
            inflight: self.clone(),
            profile_id: profile_id.to_string(),
            ids: ids.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Number of ids currently owned for `profile_id` (spec §3: "powers
    /// status and retry gating").
    pub fn count(&self, profile_id: &str) -> usize {
        self.ids.get(profile_id).map(|s| s.len()).unwrap_or(0)
    }
}

/// RAII guard that releases its ids from [`InFlight`] on drop.
pub struct InFlightGuard {
    inflight: Arc<InFlight>,
    profile_id: String,
    ids: Vec<String>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(set) = self.inflight.ids.get(&self.profile_id) {
            for id in &self.ids {
                set.remove(id);
            }
        }
    }
}
