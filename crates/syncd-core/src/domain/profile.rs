//! Sync profiles (spec §3 "Profile").
//!
//! A profile binds a local root to a remote root with a direction, a
//! conflict policy, a conflict window, and an ordered ignore list.
//! Grounded in `profileStore.go`'s `profileStore`/`makeProfile`: that is
//! where the source validates direction/conflict-resolution/ignore and
//! rejects duplicate local+remote pairs.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{RemotePath, SyncPath};

/// Sync direction. `BOTH` is bidirectional; `PUSH`/`PULL` are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Both,
    Push,
    Pull,
}

/// How a near-simultaneous edit on both sides is resolved (spec §4.D
/// Step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictPolicy {
    Overwrite,
    Rename,
}

/// A compiled ignore rule. Profiles persist the pattern strings; the
/// compiled `Regex` is rebuilt at load time (regexes aren't `Serialize`).
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: String,
    regex: Regex,
}

impl IgnoreRule {
    pub fn compile(pattern: &str) -> Result<Self, DomainError> {
        let regex = Regex::new(pattern)
            .map_err(|e| DomainError::InvalidIgnorePattern(pattern.to_string(), e.to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, id: &str) -> bool {
        self.regex.is_match(id)
    }
}

/// A configured synchronization between a local directory tree and a
/// remote one.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub direction: Direction,
    pub conflict_policy: ConflictPolicy,
    pub conflict_window: Duration,
    pub ignore: Vec<IgnoreRule>,
    pub local_root: SyncPath,
    pub remote_root: RemotePath,
    pub active: bool,
}

impl Profile {
    /// Stable identifier: `id(local_root) + "_" + id(remote_root)`.
    /// Guarantees no two profiles sync the same pair (spec §3).
    pub fn id(&self) -> String {
        format!("{}_{}", self.local_root, self.remote_root)
    }

    /// True if `id` (a local path or remote path) matches any ignore rule,
    /// in declared order (first match is sufficient — spec doesn't
    /// require knowing *which* rule matched).
    pub fn is_ignored(&self, id: &str) -> bool {
        self.ignore.iter().any(|rule| rule.matches(id))
    }
}

/// On-disk representation of a profile (spec §3 "Profile registry"),
/// mirroring `profileStore.go`'s JSON shape closely enough that the CLI's
/// `--json` output and the persisted registry agree on field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub name: String,
    pub direction: Direction,
    pub conflict_policy: ConflictPolicy,
    pub conflict_window_secs: u64,
    pub ignore: Vec<String>,
    pub local_path: String,
    pub remote_path: String,
    pub active: bool,
}

impl ProfileRecord {
    /// Validate and compile into a runtime [`Profile`].
    ///
    /// Normalizes `conflict_window_secs` into a `Duration` once here, per
    /// Design Note 9's "unit of conflict_window" open question.
    pub fn into_profile(self) -> Result<Profile, DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidProfile("name must not be empty".into()));
        }
        let local_root = SyncPath::new(std::path::PathBuf::from(&self.local_path))?;
        let remote_root = RemotePath::new(self.remote_path.clone())?;
        let ignore = self
            .ignore
            .iter()
            .map(|p| IgnoreRule::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Profile {
            name: self.name,
            direction: self.direction,
            conflict_policy: self.conflict_policy,
            conflict_window: Duration::from_secs(self.conflict_window_secs),
            ignore,
            local_root,
            remote_root,
            active: self.active,
        })
    }
}

impl From<&Profile> for ProfileRecord {
    fn from(p: &Profile) -> Self {
        Self {
            name: p.name.clone(),
            direction: p.direction,
            conflict_policy: p.conflict_policy,
            conflict_window_secs: p.conflict_window.as_secs(),
            ignore: p.ignore.iter().map(|r| r.pattern().to_string()).collect(),
            local_path: p.local_root.to_string(),
            remote_path: p.remote_root.to_string(),
            active: p.active,
        }
    }
}
