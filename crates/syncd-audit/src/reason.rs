//! Reason codes for audit log entries.
//!
//! Structured codes for categorizing why an operation failed or why a
//! conflict occurred, attached to `AuditLog` entries alongside the
//! free-text message.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured reason codes for failures and conflicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Remote file was modified while an upload was in progress
    RemoteModifiedDuringUpload,
    /// Local file was modified while a download was in progress
    LocalModifiedDuringDownload,
    /// Network operation timed out
    NetworkTimeout,
    /// API rate limit / throttling was exceeded
    ThrottlingExceeded,
    /// Insufficient permissions to perform the operation
    PermissionDenied,
    /// File exceeds the maximum allowed size
    FileTooLarge,
    /// File path exceeds the maximum allowed length
    PathTooLong,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::RemoteModifiedDuringUpload => "remote_modified_during_upload",
            ReasonCode::LocalModifiedDuringDownload => "local_modified_during_download",
            ReasonCode::NetworkTimeout => "network_timeout",
            ReasonCode::ThrottlingExceeded => "throttling_exceeded",
            ReasonCode::PermissionDenied => "permission_denied",
            ReasonCode::FileTooLarge => "file_too_large",
            ReasonCode::PathTooLong => "path_too_long",
        };
        write!(f, "{s}")
    }
}
