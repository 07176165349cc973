//! Domain error types.
//!
//! [`DomainError`] covers validation failures in the data model itself
//! (bad paths, bad profiles). [`EngineError`] is the taxonomy from spec
//! §7: every error an adapter (`syncd-http`, local filesystem, the
//! store) raises is classified into one of these variants so the retry
//! drainer (`syncd-engine::queue`) can decide what to do with it without
//! inspecting adapter-specific error types.

use thiserror::Error;

/// Errors that can occur validating domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),

    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    #[error("Invalid ignore pattern '{0}': {1}")]
    InvalidIgnorePattern(String, String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Error taxonomy at the engine boundary (spec §7).
///
/// `Transient` enters the retry queue; everything else is logged and
/// dropped (or, for `Configuration`, never reaches the engine at all —
/// it is surfaced at profile load time instead).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Network timeout, lock contention, temporary not-found mid-rename.
    #[error("transient I/O error: {0}")]
    Transient(String),

    /// Bad credentials, path permission.
    #[error("permanent I/O error: {0}")]
    Permanent(String),

    /// Rename on a directory, create_dir over an existing path, short
    /// write. The engine leaves the pair for the next watcher event
    /// rather than retrying.
    #[error("logical precondition violated: {0}")]
    Precondition(String),

    /// A programming invariant was violated (e.g. inverted before/after).
    /// Fatal: the daemon aborts rather than risk silent data loss.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Whether this error should be retried (spec §7 propagation rules).
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }

    /// Whether the daemon must abort rather than continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Invariant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_display() {
        let err = DomainError::InvalidPath("/bad/path".to_string());
        assert_eq!(err.to_string(), "Invalid path: /bad/path");
    }

    #[test]
    fn domain_error_equality() {
        assert_eq!(
            DomainError::InvalidPath("/path".into()),
            DomainError::InvalidPath("/path".into())
        );
        assert_ne!(
            DomainError::InvalidPath("/path".into()),
            DomainError::InvalidPath("/other".into())
        );
    }

    #[test]
    fn only_transient_is_retried() {
        assert!(EngineError::Transient("timeout".into()).is_transient());
        assert!(!EngineError::Permanent("401".into()).is_transient());
        assert!(!EngineError::Precondition("rename on dir".into()).is_transient());
    }

    #[test]
    fn only_invariant_is_fatal() {
        assert!(EngineError::Invariant("inverted before/after".into()).is_fatal());
        assert!(!EngineError::Transient("timeout".into()).is_fatal());
    }
}
