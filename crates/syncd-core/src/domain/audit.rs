//! Bounded log ring entries (spec §6 "Bounded log").
//!
//! The daemon keeps the last 1,000–10,000 entries of significant
//! activity, persisted oldest-first in the store's `log` bucket and
//! mirrored to `tracing` at error severity. `LogKind` distinguishes which
//! side of a profile an entry concerns, matching `{when, type, message}`
//! from spec.md verbatim (`type` renamed to `kind` to avoid the Rust
//! keyword).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::AuditId;

/// Which side(s) of a profile a log entry concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Local,
    Remote,
    Both,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Local => write!(f, "local"),
            LogKind::Remote => write!(f, "remote"),
            LogKind::Both => write!(f, "both"),
        }
    }
}

/// A single entry in the bounded log ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Row id, assigned by the store on insert; used as the ordered-
    /// iteration key for oldest-first eviction.
    id: Option<AuditId>,
    when: DateTime<Utc>,
    kind: LogKind,
    message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            id: None,
            when: Utc::now(),
            kind,
            message: message.into(),
        }
    }

    pub fn with_id(mut self, id: AuditId) -> Self {
        self.id = Some(id);
        self
    }

    /// Overrides the timestamp. Used when reconstructing an entry
    /// previously persisted with its own `when` rather than `Utc::now()`.
    pub fn with_when(mut self, when: DateTime<Utc>) -> Self {
        self.when = when;
        self
    }

    pub fn id(&self) -> Option<AuditId> {
        self.id
    }

    pub fn when(&self) -> DateTime<Utc> {
        self.when
    }

    pub fn kind(&self) -> LogKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
