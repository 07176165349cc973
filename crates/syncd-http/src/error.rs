//! Error mapping from transport-level failures to [`EngineError`] (spec §7).

use syncd_core::domain::errors::EngineError;

/// Maps a `reqwest` error onto the engine's transient/permanent split
/// (spec §7: "Transient I/O (network timeout, ...): enters retry" vs.
/// "Permanent I/O (bad credentials, path permission): logged, not
/// retried").
pub fn map_reqwest_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() || err.is_connect() {
        return EngineError::Transient(err.to_string());
    }
    if let Some(status) = err.status() {
        return map_status(status, err.to_string());
    }
    EngineError::Transient(err.to_string())
}

pub fn map_status(status: reqwest::StatusCode, body: String) -> EngineError {
    use reqwest::StatusCode;
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EngineError::Permanent(body),
        StatusCode::NOT_FOUND => EngineError::Precondition(body),
        StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS => EngineError::Transient(body),
        s if s.is_server_error() => EngineError::Transient(body),
        _ => EngineError::Permanent(body),
    }
}
