use crate::archive::RemoteStorage;
use crate::config;
use crate::error::SnapshotError;
use crate::models::{ArchiveFile, UploadedArchive};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// OAuth user credentials as exported by the Google auth libraries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveCredentials {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl DriveCredentials {
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(text)
            .map_err(|e| SnapshotError::RemoteArchive(format!("invalid Drive credentials JSON: {}", e)))
    }

    /// `Ok(None)` when the variable is unset or blank.
    pub fn from_env() -> Result<Option<Self>, SnapshotError> {
        match std::env::var(config::ENV_DRIVE_CREDENTIALS) {
            Ok(text) if !text.trim().is_empty() => Self::from_json(&text).map(Some),
            _ => Ok(None),
        }
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<ArchiveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

// -----------------------------------------------
// DRIVE CLIENT WITH CACHED ACCESS TOKEN
// -----------------------------------------------
pub struct GoogleDriveStorage {
    client: Client,
    credentials: DriveCredentials,
    access_token: RwLock<Option<String>>,
    api_url: String,
    upload_url: String,
}

impl GoogleDriveStorage {
    pub fn new(credentials: DriveCredentials) -> Result<Self, SnapshotError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config::DRIVE_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| SnapshotError::RemoteArchive(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            access_token: RwLock::new(credentials.token.clone()),
            credentials,
            api_url: config::DRIVE_API_URL.to_string(),
            upload_url: config::DRIVE_UPLOAD_URL.to_string(),
        })
    }

    /// Point the metadata and upload calls somewhere other than googleapis.com.
    pub fn with_endpoints(mut self, api_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.upload_url = upload_url.into();
        self
    }

    async fn current_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String> {
        let creds = &self.credentials;
        let refresh_token = creds
            .refresh_token
            .as_deref()
            .context("Drive credentials have no refresh_token")?;
        let client_id = creds.client_id.as_deref().context("Drive credentials have no client_id")?;
        let client_secret = creds
            .client_secret
            .as_deref()
            .context("Drive credentials have no client_secret")?;
        let token_uri = creds.token_uri.as_deref().unwrap_or(config::DRIVE_DEFAULT_TOKEN_URI);

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let res = self
            .client
            .post(token_uri)
            .form(&params)
            .send()
            .await
            .context("Token refresh request failed")?;
        let res = ensure_success(res, "Token refresh").await?;
        let token: TokenResponse = res.json().await.context("Failed to parse token response")?;

        debug!(expires_in = ?token.expires_in, "Refreshed Drive access token");
        *self.access_token.write().await = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    /// Send with the cached token; on 401 refresh once and resend.
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.current_token().await?;
        let res = build(&token).send().await.context("Drive request failed")?;

        if res.status() != StatusCode::UNAUTHORIZED || !self.credentials.can_refresh() {
            return Ok(res);
        }

        warn!("Drive rejected the access token, refreshing");
        let token = self.refresh_token().await?;
        build(&token)
            .send()
            .await
            .context("Drive request failed after token refresh")
    }

    async fn list_files(&self, folder_id: &str, name_prefix: &str) -> Result<Vec<ArchiveFile>> {
        let query = format!(
            "name contains '{}' and '{}' in parents and trashed=false",
            escape_query(name_prefix),
            escape_query(folder_id)
        );
        let url = format!("{}/files", self.api_url);

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let res = self
                .send_authorized(|token| {
                    let mut req = self.client.get(&url).bearer_auth(token).query(&[
                        ("q", query.as_str()),
                        ("fields", "nextPageToken, files(id, name, createdTime)"),
                        ("orderBy", "createdTime desc"),
                        ("pageSize", "1000"),
                    ]);
                    if let Some(page) = &page_token {
                        req = req.query(&[("pageToken", page.as_str())]);
                    }
                    req
                })
                .await?;
            let res = ensure_success(res, "List files").await?;
            let list: FileList = res.json().await.context("Failed to parse file list")?;

            // `name contains` also matches the prefix mid-name
            files.extend(list.files.into_iter().filter(|f| f.name.starts_with(name_prefix)));

            match list.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!(count = files.len(), "Listed archived snapshots");
        Ok(files)
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", self.api_url, urlencoding::encode(file_id));
        let res = self
            .send_authorized(|token| self.client.delete(&url).bearer_auth(token))
            .await?;
        ensure_success(res, "Delete file").await?;
        Ok(())
    }

    async fn upload_file(&self, local_path: &Path, folder_id: &str) -> Result<UploadedArchive> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("No file name in {}", local_path.display()))?;
        let content = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        let boundary = format!("snapshot-boundary-{}", Utc::now().timestamp_millis());
        let metadata = serde_json::json!({ "name": file_name, "parents": [folder_id] });
        let body = multipart_related(&boundary, &metadata.to_string(), "text/csv", &content);
        let content_type = format!("multipart/related; boundary={}", boundary);
        let url = format!("{}/files", self.upload_url);

        let res = self
            .send_authorized(|token| {
                self.client
                    .post(&url)
                    .bearer_auth(token)
                    .query(&[("uploadType", "multipart"), ("fields", "id,name,webViewLink")])
                    .header(header::CONTENT_TYPE, content_type.as_str())
                    .body(body.clone())
            })
            .await?;
        let res = ensure_success(res, "Upload file").await?;
        let uploaded: UploadedArchive = res.json().await.context("Failed to parse upload response")?;

        info!(id = %uploaded.id, bytes = content.len(), "Drive upload complete");
        Ok(uploaded)
    }
}

#[async_trait]
impl RemoteStorage for GoogleDriveStorage {
    async fn list(&self, folder_id: &str, name_prefix: &str) -> Result<Vec<ArchiveFile>, SnapshotError> {
        self.list_files(folder_id, name_prefix).await.map_err(remote_error)
    }

    async fn delete(&self, file_id: &str) -> Result<(), SnapshotError> {
        self.delete_file(file_id).await.map_err(remote_error)
    }

    async fn upload(&self, local_path: &Path, folder_id: &str) -> Result<UploadedArchive, SnapshotError> {
        self.upload_file(local_path, folder_id).await.map_err(remote_error)
    }
}

fn remote_error(err: anyhow::Error) -> SnapshotError {
    SnapshotError::RemoteArchive(format!("{:#}", err))
}

async fn ensure_success(res: Response, what: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    let preview: String = body.chars().take(200).collect();
    anyhow::bail!("{} failed with {}: {}", what, status, preview)
}

/// Quote a literal for a Drive `q` expression.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Body for a Drive `uploadType=multipart` request: JSON metadata then media.
pub fn multipart_related(boundary: &str, metadata_json: &str, media_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + metadata_json.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata_json,
            t = media_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
