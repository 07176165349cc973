//! HTTP client for the remote file service (spec §6 "Remote file
//! service").
//!
//! Endpoints: stat/list under `/v1/properties/...`, content operations
//! under `/v1/file/...`. Authentication is HTTP Basic with
//! `(username, token-or-password)`. `modified` round-trips as RFC 3339,
//! second precision. Grounded in the teacher's `client.rs` for the
//! `reqwest::Client` + base-url + typed-response shape; OAuth2/Graph
//! specifics are gone per spec §6.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use syncd_core::domain::errors::EngineError;
use syncd_core::domain::handle::{Backend, FileHandle};

use crate::error::{map_reqwest_error, map_status};

/// Wire representation of file metadata, as returned by
/// `/v1/properties/...` and accepted by upload requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProperties {
    pub path: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

impl RemoteProperties {
    fn into_handle(self) -> FileHandle {
        FileHandle {
            id: self.path,
            backend: Backend::Remote,
            modified: FileHandle::round_to_secs(self.modified),
            size: self.size,
            is_dir: self.is_dir,
            exists: true,
            deleted: false,
        }
    }
}

/// Thin HTTP client for the remote file service. Cheap to clone (wraps
/// `reqwest::Client`, itself an `Arc`-backed handle).
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    username: String,
    token: String,
}

impl RemoteClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            username: username.into(),
            token: token.into(),
        })
    }

    fn properties_url(&self, path: &str) -> String {
        format!("{}/v1/properties/{}", self.base_url, urlencode_path(path))
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/v1/file/{}", self.base_url, urlencode_path(path))
    }

    /// Returns a handle with `exists = false` rather than failing when
    /// the path is absent (spec §4.A `stat`).
    pub async fn stat(&self, path: &str) -> Result<FileHandle, EngineError> {
        let resp = self
            .http
            .get(self.properties_url(path))
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(FileHandle::absent(path, Backend::Remote));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        let props: RemoteProperties = resp.json().await.map_err(map_reqwest_error)?;
        Ok(props.into_handle())
    }

    /// Empty if `dir` is not a directory (spec §4.A `children`).
    pub async fn children(&self, dir_path: &str) -> Result<Vec<FileHandle>, EngineError> {
        let resp = self
            .http
            .get(format!(
                "{}/v1/properties/{}?children=true",
                self.base_url,
                urlencode_path(dir_path)
            ))
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        let children: Vec<RemoteProperties> = resp.json().await.map_err(map_reqwest_error)?;
        Ok(children.into_iter().map(RemoteProperties::into_handle).collect())
    }

    /// Opens a read stream for `path`. Fails if the remote doesn't have it.
    pub async fn open_read(&self, path: &str) -> Result<reqwest::Response, EngineError> {
        let resp = self
            .http
            .get(self.file_url(path))
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        Ok(resp)
    }

    /// Uploads `body` as the full content of `path`. The service has no
    /// in-place replace, so the caller (the engine, via `Syncer::write`)
    /// deletes first when replacing an existing file (spec §4.A
    /// "Writes").
    pub async fn upload(
        &self,
        path: &str,
        body: Vec<u8>,
        modified: DateTime<Utc>,
    ) -> Result<FileHandle, EngineError> {
        let modified = FileHandle::round_to_secs(modified);
        let size = body.len() as u64;
        let resp = self
            .http
            .put(self.file_url(path))
            .basic_auth(&self.username, Some(&self.token))
            .query(&[(
                "modified",
                modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            )])
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        Ok(FileHandle {
            id: path.to_string(),
            backend: Backend::Remote,
            modified,
            size,
            is_dir: false,
            exists: true,
            deleted: false,
        })
    }

    pub async fn delete(&self, path: &str) -> Result<(), EngineError> {
        let resp = self
            .http
            .delete(self.file_url(path))
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        Ok(())
    }

    pub async fn create_dir(&self, path: &str) -> Result<FileHandle, EngineError> {
        let resp = self
            .http
            .post(format!(
                "{}/v1/file/{}?mkdir=true",
                self.base_url,
                urlencode_path(path)
            ))
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(EngineError::Precondition(format!(
                "directory already exists: {path}"
            )));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        Ok(FileHandle {
            id: path.to_string(),
            backend: Backend::Remote,
            modified: Utc::now(),
            size: 0,
            is_dir: true,
            exists: true,
            deleted: false,
        })
    }

    /// Renames by inserting a timestamp suffix, matching the local
    /// backend's naming (spec §4.A `rename`). Forbidden on directories —
    /// the caller must check `is_dir` first.
    pub async fn rename_to(&self, from: &str, to: &str) -> Result<FileHandle, EngineError> {
        let resp = self
            .http
            .post(format!(
                "{}/v1/file/{}?move_to={}",
                self.base_url,
                urlencode_path(from),
                urlencode_path(to)
            ))
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        self.stat(to).await
    }

    /// Requests a new auth token from the service (spec §6 "token
    /// issuance"), used by the admin layer, not the engine.
    pub async fn issue_token(&self, password: &str) -> anyhow::Result<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            token: String,
        }
        let resp = self
            .http
            .post(format!("{}/v1/session", self.base_url))
            .basic_auth(&self.username, Some(password))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            warn!(%status, "token issuance failed");
            anyhow::bail!("token issuance failed: {status}");
        }
        let body: TokenResponse = resp.json().await?;
        debug!(username = %self.username, "issued new remote token");
        Ok(body.token)
    }
}

fn urlencode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| url::form_urlencoded::byte_serialize(seg.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}
