// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth and Drive API client.
//!
//! Handles:
//! - Authorization URL generation (offline access, forced consent)
//! - Code exchange and token refresh
//! - User profile lookup
//! - Drive file listing, metadata and downloads

use super::provider::{self, ProviderError, TokenProvider};
use crate::error::AppError;
use crate::models::{FileMetadata, Provider, ProviderProfile, TokenGrant};
use async_trait::async_trait;
use serde::Deserialize;

/// OAuth scopes requested from Google.
pub const GOOGLE_SCOPES: &str = "openid email profile \
    https://www.googleapis.com/auth/drive.readonly \
    https://www.googleapis.com/auth/drive.file";

/// Drive fields requested for each file.
const DRIVE_FILE_FIELDS: &str = "id,name,size,mimeType,webContentLink,thumbnailLink";

const DRIVE_PAGE_SIZE: u32 = 100;

/// Google endpoint URLs (overridable for tests).
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub drive_api: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            drive_api: "https://www.googleapis.com/drive/v3".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// All endpoints rooted at one base URL (mock servers).
    pub fn with_base(base: &str) -> Self {
        Self {
            auth_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/token", base),
            userinfo_url: format!("{}/oauth2/v2/userinfo", base),
            drive_api: format!("{}/drive/v3", base),
        }
    }
}

/// Google OAuth provider and Drive client.
#[derive(Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    endpoints: GoogleEndpoints,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleProvider {
    /// Create a Google client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self::with_endpoints(client_id, client_secret, redirect_uri, GoogleEndpoints::default())
    }

    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: GoogleEndpoints,
    ) -> Self {
        Self {
            http: provider::http_client(),
            endpoints,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    // ─── Drive API ───────────────────────────────────────────────────────────

    /// List the first page of the user's Drive files.
    pub async fn list_files(&self, access_token: &str) -> Result<Vec<FileMetadata>, AppError> {
        let url = format!(
            "{}/files?pageSize={}&fields={}",
            self.endpoints.drive_api,
            DRIVE_PAGE_SIZE,
            urlencoding::encode(&format!("nextPageToken,files({})", DRIVE_FILE_FIELDS))
        );

        let list: DriveFileList = provider::get_json(&self.http, &url, access_token)
            .await
            .map_err(|e| drive_error("list files", e))?;

        Ok(list.files.into_iter().map(FileMetadata::from).collect())
    }

    /// Metadata for a single Drive file.
    pub async fn get_file(&self, access_token: &str, file_id: &str) -> Result<FileMetadata, AppError> {
        let url = format!(
            "{}/files/{}?fields={}",
            self.endpoints.drive_api,
            urlencoding::encode(file_id),
            urlencoding::encode(DRIVE_FILE_FIELDS)
        );

        let file: DriveFile = provider::get_json(&self.http, &url, access_token)
            .await
            .map_err(|e| drive_error("get file", e))?;

        Ok(file.into())
    }

    /// Download the content of a Drive file.
    pub async fn download_file(&self, access_token: &str, file_id: &str) -> Result<Vec<u8>, AppError> {
        let url = format!(
            "{}/files/{}?alt=media",
            self.endpoints.drive_api,
            urlencoding::encode(file_id)
        );

        provider::get_bytes(&self.http, &url, access_token)
            .await
            .map_err(|e| drive_error("download file", e))
    }
}

/// Map a Drive failure, surfacing 404 as a missing resource.
fn drive_error(action: &str, err: ProviderError) -> AppError {
    match err {
        ProviderError::Status { status: 404, .. } => {
            AppError::NotFound("Drive file not found".to_string())
        }
        other => AppError::ProviderCallFailed(format!("Google Drive {} failed: {}", action, other)),
    }
}

#[async_trait]
impl TokenProvider for GoogleProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&include_granted_scopes=true&state={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(GOOGLE_SCOPES),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        provider::post_token_form(
            &self.http,
            &self.endpoints.token_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        provider::post_token_form(
            &self.http,
            &self.endpoints.token_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        let info: GoogleUserInfo =
            provider::get_json(&self.http, &self.endpoints.userinfo_url, access_token).await?;

        let email = info
            .email
            .ok_or_else(|| ProviderError::Malformed("userinfo has no email".to_string()))?;

        Ok(ProviderProfile {
            external_id: info.id,
            name: info.name.unwrap_or_else(|| email.clone()),
            email,
        })
    }
}

/// Google userinfo v2 response.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

/// Drive `files.list` response.
#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Drive file resource (subset of fields).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: Option<String>,
    /// int64 encoded as a string
    size: Option<String>,
    web_content_link: Option<String>,
    thumbnail_link: Option<String>,
}

impl From<DriveFile> for FileMetadata {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            size: file.size.and_then(|s| s.parse().ok()),
            download_url: file.web_content_link,
            thumbnail_url: file.thumbnail_link,
        }
    }
}
