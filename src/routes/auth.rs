// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session user and Google token routes.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::{require_user, MessageResponse};
use crate::error::{AppError, Result};
use crate::middleware::auth::{removal_cookie, AuthUser};
use crate::models::{Provider, TokenRecord};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/config", get(client_config))
}

/// Routes that require a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/user", get(current_user))
        .route("/api/auth/token", get(google_token))
        .route("/api/auth/logout", post(logout))
}

/// Public client identifiers for the frontend pickers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClientConfigResponse {
    pub google_client_id: String,
    pub google_api_key: Option<String>,
    pub microsoft_client_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Google tokens stored and not yet expired
    pub is_connected: bool,
    pub microsoft_connected: bool,
}

/// Access token handed to the browser. The refresh token never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry, never negative
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub expires_in: i64,
    pub expires_at: String,
}

impl TokenResponse {
    pub fn new(access_token: String, record: &TokenRecord, now: DateTime<Utc>) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: record.seconds_remaining(now).max(0),
            expires_at: format_utc_rfc3339(record.expires_at),
        }
    }
}

/// Issue a usable access token for `provider`, refreshing if needed.
pub(crate) async fn token_response(
    state: &AppState,
    auth: &AuthUser,
    provider: Provider,
) -> Result<Json<TokenResponse>> {
    let access_token = state.tokens.get_valid_access_token(auth, provider).await?;

    // Re-read so expiry reflects any refresh that just happened
    let record = state
        .tokens
        .get_token_record(auth, provider)
        .await?
        .ok_or(AppError::NoTokenRecord(provider))?;

    Ok(Json(TokenResponse::new(access_token, &record, Utc::now())))
}

async fn client_config(State(state): State<Arc<AppState>>) -> Json<ClientConfigResponse> {
    Json(ClientConfigResponse {
        google_client_id: state.config.google_client_id.clone(),
        google_api_key: state.config.google_api_key.clone(),
        microsoft_client_id: state.config.microsoft_client_id.clone(),
    })
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = require_user(&state, &auth).await?;
    let now = Utc::now();

    let google = state.tokens.get_token_record(&auth, Provider::Google).await?;
    let microsoft = state
        .tokens
        .get_token_record(&auth, Provider::Microsoft)
        .await?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        is_connected: google.is_some_and(|t| t.expires_at > now),
        microsoft_connected: microsoft.is_some(),
    }))
}

async fn google_token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TokenResponse>> {
    require_user(&state, &auth).await?;
    token_response(&state, &auth, Provider::Google).await
}

/// Drop Google tokens and end the session.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    state.tokens.delete_tokens(&auth, Provider::Google).await?;
    tracing::info!(user_id = %auth.user_id, "User logged out");

    let jar = jar.add(removal_cookie(state.config.secure_cookies()));
    Ok((jar, MessageResponse::new("Logged out successfully")))
}
