//! Conflict window detection (spec §4.D Step 6).
//!
//! The engine hands this module a pair that has already passed gating,
//! ignore, existence, coercion, and equal-mtime checks (Steps 0-4), has
//! already been ordered into `before`/`after` by Step 5, and asks: is
//! this a conflict, and if so what does the configured policy do about
//! it?

use std::time::Duration;

use syncd_core::domain::handle::FileHandle;
use syncd_core::domain::profile::ConflictPolicy;

/// What the engine should enqueue for an ordered, non-ignored pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not a conflict (or policy is OVERWRITE): copy `after` onto `before`.
    Overwrite,
    /// Conflict under policy RENAME: rename `before` aside; `after` is
    /// picked up on a later pass.
    RenameAside,
}

/// True iff `before`/`after` are close enough in time to be a genuine
/// conflict rather than one side simply superseding the other (spec
/// §4.D Step 6: `after.modified - before.modified < conflict_window`).
pub fn is_conflict(before: &FileHandle, after: &FileHandle, conflict_window: Duration) -> bool {
    let delta = after.modified - before.modified;
    let window = chrono::Duration::from_std(conflict_window).unwrap_or(chrono::Duration::MAX);
    delta < window
}

/// Decides the resolution for an already-ordered pair.
///
/// `before` is the older handle, `after` the newer one, per spec §4.D
/// Step 5. Equal-mtime pairs must be filtered out by the caller (Step 4
/// exits before reaching conflict detection at all).
pub fn decide(
    before: &FileHandle,
    after: &FileHandle,
    conflict_window: Duration,
    policy: ConflictPolicy,
) -> Resolution {
    if is_conflict(before, after, conflict_window) && policy == ConflictPolicy::Rename {
        Resolution::RenameAside
    } else {
        Resolution::Overwrite
    }
}
