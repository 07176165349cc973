//! syncd-audit — the bounded log ring and reason taxonomy (spec §6).
//!
//! [`AuditLog`] is the single entry point both the daemon and the CLI use
//! to append and page through persisted activity; [`ReasonCode`] enriches
//! individual entries with a structured cause for `syncd explain`.

pub mod logger;
pub mod reason;

pub use logger::{AuditLog, DEFAULT_LOG_CAPACITY};
pub use reason::ReasonCode;
