// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft identity platform (v2.0) and Graph client.

use super::provider::{self, ProviderError, TokenProvider};
use crate::error::AppError;
use crate::models::{Provider, ProviderProfile, TokenGrant};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Delegated Graph scopes; `offline_access` is what yields a refresh token.
pub const MICROSOFT_SCOPES: &str = "https://graph.microsoft.com/Files.ReadWrite.All \
    https://graph.microsoft.com/Sites.ReadWrite.All User.Read offline_access";

/// Microsoft endpoint URLs (overridable for tests).
#[derive(Debug, Clone)]
pub struct MicrosoftEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub graph_api: String,
}

impl MicrosoftEndpoints {
    /// Public cloud endpoints for a tenant (`common`, `organizations`, or an ID).
    pub fn for_tenant(tenant: &str) -> Self {
        let authority = format!("https://login.microsoftonline.com/{}/oauth2/v2.0", tenant);
        Self {
            auth_url: format!("{}/authorize", authority),
            token_url: format!("{}/token", authority),
            graph_api: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }

    /// All endpoints rooted at one base URL (mock servers).
    pub fn with_base(base: &str) -> Self {
        Self {
            auth_url: format!("{}/oauth2/v2.0/authorize", base),
            token_url: format!("{}/oauth2/v2.0/token", base),
            graph_api: format!("{}/v1.0", base),
        }
    }
}

/// Microsoft OAuth provider and Graph client.
#[derive(Clone)]
pub struct MicrosoftProvider {
    http: reqwest::Client,
    endpoints: MicrosoftEndpoints,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl MicrosoftProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String, tenant: &str) -> Self {
        Self::with_endpoints(
            client_id,
            client_secret,
            redirect_uri,
            MicrosoftEndpoints::for_tenant(tenant),
        )
    }

    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: MicrosoftEndpoints,
    ) -> Self {
        Self {
            http: provider::http_client(),
            endpoints,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    // ─── Graph API ───────────────────────────────────────────────────────────

    /// Children of the user's OneDrive root.
    pub async fn list_root_children(&self, access_token: &str) -> Result<Value, AppError> {
        self.graph_json("/me/drive/root/children", access_token).await
    }

    /// Content of a OneDrive item.
    pub async fn download_item(&self, access_token: &str, item_id: &str) -> Result<Vec<u8>, AppError> {
        let url = format!(
            "{}/me/drive/items/{}/content",
            self.endpoints.graph_api,
            urlencoding::encode(item_id)
        );
        provider::get_bytes(&self.http, &url, access_token)
            .await
            .map_err(|e| graph_error(&url, e))
    }

    /// SharePoint sites visible to the user.
    pub async fn search_sites(&self, access_token: &str) -> Result<Value, AppError> {
        self.graph_json("/sites?search=*", access_token).await
    }

    /// Root children of a SharePoint site's default drive.
    pub async fn list_site_children(&self, access_token: &str, site_id: &str) -> Result<Value, AppError> {
        let path = format!("/sites/{}/drive/root/children", urlencoding::encode(site_id));
        self.graph_json(&path, access_token).await
    }

    /// Children of a folder in a SharePoint site's default drive.
    pub async fn list_site_folder_children(
        &self,
        access_token: &str,
        site_id: &str,
        folder_id: &str,
    ) -> Result<Value, AppError> {
        let path = format!(
            "/sites/{}/drive/items/{}/children",
            urlencoding::encode(site_id),
            urlencoding::encode(folder_id)
        );
        self.graph_json(&path, access_token).await
    }

    async fn graph_json(&self, path: &str, access_token: &str) -> Result<Value, AppError> {
        let url = format!("{}{}", self.endpoints.graph_api, path);
        provider::get_json(&self.http, &url, access_token)
            .await
            .map_err(|e| graph_error(&url, e))
    }
}

fn graph_error(url: &str, err: ProviderError) -> AppError {
    match err {
        ProviderError::Status { status: 404, .. } => {
            AppError::NotFound("Graph resource not found".to_string())
        }
        other => {
            tracing::debug!(url, error = %other, "Graph request failed");
            AppError::ProviderCallFailed(format!("Microsoft Graph request failed: {}", other))
        }
    }
}

#[async_trait]
impl TokenProvider for MicrosoftProvider {
    fn provider(&self) -> Provider {
        Provider::Microsoft
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&state={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(MICROSOFT_SCOPES),
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
                ("scope", MICROSOFT_SCOPES),
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
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", MICROSOFT_SCOPES),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        let url = format!("{}/me", self.endpoints.graph_api);
        let me: GraphUser = provider::get_json(&self.http, &url, access_token).await?;
        me.into_profile()
    }
}

/// Graph `/me` response (subset).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    display_name: Option<String>,
    mail: Option<String>,
    user_principal_name: Option<String>,
}

impl GraphUser {
    /// Personal accounts often have no `mail`; fall back to the UPN.
    fn into_profile(self) -> Result<ProviderProfile, ProviderError> {
        let email = self
            .mail
            .filter(|m| !m.is_empty())
            .or(self.user_principal_name)
            .ok_or_else(|| ProviderError::Malformed("Graph user has no mail or UPN".to_string()))?;

        Ok(ProviderProfile {
            external_id: self.id,
            name: self.display_name.unwrap_or_else(|| email.clone()),
            email,
        })
    }
}
