// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider capability interface shared by Google and Microsoft.
//!
//! The token lifecycle manager only talks to providers through
//! [`TokenProvider`]; HTTP details live in the implementations.

use crate::models::{Provider, ProviderProfile, TokenGrant};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Request timeout applied to every outbound provider call.
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Failure talking to a provider endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// The provider rejected the grant (revoked or expired refresh token).
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, ProviderError::Status { status: 400 | 401, body } if body.contains("invalid_grant"))
    }
}

/// OAuth capabilities of one identity provider.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Which provider this is.
    fn provider(&self) -> Provider;

    /// Consent URL the browser is sent to.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code (`grant_type=authorization_code`).
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    /// Exchange a refresh token (`grant_type=refresh_token`).
    async fn exchange_refresh_token(&self, refresh_token: &str)
        -> Result<TokenGrant, ProviderError>;

    /// Identity of the user owning `access_token`.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError>;
}

/// Build the shared HTTP client used by provider implementations.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// POST a form to a token endpoint and parse the grant.
pub(crate) async fn post_token_form(
    http: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<TokenGrant, ProviderError> {
    let response = http.post(url).form(form).send().await?;
    let grant: TokenGrant = check_response_json(response).await?;
    if grant.expires_at(Utc::now()).is_none() {
        return Err(ProviderError::Malformed(format!(
            "expires_in out of range: {}",
            grant.expires_in
        )));
    }
    Ok(grant)
}

/// GET a JSON resource with bearer authentication.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> Result<T, ProviderError> {
    let response = http.get(url).bearer_auth(access_token).send().await?;
    check_response_json(response).await
}

/// GET raw bytes with bearer authentication.
pub(crate) async fn get_bytes(
    http: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> Result<Vec<u8>, ProviderError> {
    let response = http.get(url).bearer_auth(access_token).send().await?;
    let response = check_response(response).await?;
    Ok(response.bytes().await?.to_vec())
}

/// Return the response if successful, otherwise a `Status` error.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    if status == 429 {
        tracing::warn!("Provider rate limit hit (429)");
    }

    Err(ProviderError::Status { status, body })
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let response = check_response(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}
