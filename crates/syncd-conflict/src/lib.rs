//! syncd-conflict — conflict window detection (spec §4.D Step 6).
//!
//! Narrow by design (spec Non-goals: no content hashing, no three-way
//! merge, no vector clocks): given an ordered `before`/`after` pair, a
//! conflict window, and a profile's policy, decide whether to overwrite
//! or rename the older side aside. Renaming itself is a `Syncer::rename`
//! call the engine issues; this crate only makes the decision.

pub mod detector;

pub use detector::{decide, is_conflict, Resolution};
