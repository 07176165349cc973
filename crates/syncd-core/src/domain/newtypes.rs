//! Domain newtypes with validation.
//!
//! Strongly-typed wrappers for the identifiers that flow between the
//! engine and its adapters. Each newtype validates at construction time
//! rather than trusting caller-supplied strings.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Path types
// ============================================================================

/// A validated absolute local path.
///
/// Normalizes `.`/`..` components at construction (the path need not
/// exist yet — local handles re-stat themselves before any mutating
/// operation, per spec §4.A "Refresh semantics").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct SyncPath(PathBuf);

impl SyncPath {
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is not absolute.
    pub fn new(path: PathBuf) -> Result<Self, DomainError> {
        if !path.is_absolute() {
            return Err(DomainError::InvalidPath(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        Ok(Self(Self::normalize(&path)?))
    }

    #[must_use]
    pub fn as_path(&self) -> &PathBuf {
        &self.0
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// # Errors
    /// Returns an error if `component` attempts path traversal.
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.contains("..") || component.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "invalid path component: {component}"
            )));
        }
        Self::new(self.0.join(component))
    }

    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| Self(p.to_path_buf()))
    }

    fn normalize(path: &PathBuf) -> Result<PathBuf, DomainError> {
        use std::path::Component;
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Prefix(p) => normalized.push(p.as_os_str()),
                Component::RootDir => normalized.push("/"),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(DomainError::InvalidPath("path escapes root via ..".into()));
                    }
                }
                Component::Normal(c) => normalized.push(c),
            }
        }
        Ok(normalized)
    }
}

impl Display for SyncPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for SyncPath {
    type Error = DomainError;
    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<SyncPath> for PathBuf {
    fn from(sync_path: SyncPath) -> Self {
        sync_path.0
    }
}

impl AsRef<std::path::Path> for SyncPath {
    fn as_ref(&self) -> &std::path::Path {
        &self.0
    }
}

/// A validated remote path, always rooted at `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// # Errors
    /// Returns an error if `path` doesn't start with `/`, contains `//`,
    /// or attempts `..` traversal.
    pub fn new(path: String) -> Result<Self, DomainError> {
        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "remote path must start with '/': {path}"
            )));
        }
        if path.len() > 1 && path.contains("//") {
            return Err(DomainError::InvalidRemotePath(format!(
                "remote path contains '//': {path}"
            )));
        }
        if path.contains("..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "remote path contains '..': {path}"
            )));
        }
        Ok(Self(path))
    }

    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// # Errors
    /// Returns an error if `component` is empty or contains `/` or `..`.
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.is_empty() || component.contains('/') || component.contains("..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "invalid path component: {component}"
            )));
        }
        let new_path = if self.0 == "/" {
            format!("/{component}")
        } else {
            format!("{}/{component}", self.0)
        };
        Self::new(new_path)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.0 == "/" {
            return None;
        }
        self.0.rsplit('/').next()
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// Audit/log row identifier
// ============================================================================

/// Identifier for bounded-log-ring entries (assigned by the store on
/// insert; doubles as the ordered-iteration key for oldest-first
/// eviction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(i64);

impl AuditId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AuditId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AuditId {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("invalid AuditId: {e}")))
    }
}

impl From<i64> for AuditId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_path_rejects_relative() {
        assert!(SyncPath::new(PathBuf::from("relative/path")).is_err());
    }

    #[test]
    fn sync_path_normalizes_dot_components() {
        let p = SyncPath::new(PathBuf::from("/a/./b/../c")).unwrap();
        assert_eq!(p.as_path(), &PathBuf::from("/a/c"));
    }

    #[test]
    fn sync_path_join_rejects_traversal() {
        let root = SyncPath::new(PathBuf::from("/a")).unwrap();
        assert!(root.join("../etc/passwd").is_err());
    }

    #[test]
    fn remote_path_requires_leading_slash() {
        assert!(RemotePath::new("docs".into()).is_err());
        assert!(RemotePath::new("/docs".into()).is_ok());
    }

    #[test]
    fn remote_path_join_and_parent_roundtrip() {
        let root = RemotePath::root();
        let child = root.join("docs").unwrap().join("report.pdf").unwrap();
        assert_eq!(child.as_str(), "/docs/report.pdf");
        assert_eq!(child.file_name(), Some("report.pdf"));
        assert_eq!(child.parent().unwrap().as_str(), "/docs");
    }

    #[test]
    fn audit_id_orders_for_ring_eviction() {
        assert!(AuditId::new(1) < AuditId::new(2));
    }
}
