// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft Graph routes (OneDrive and SharePoint).

use axum::{
    extract::{Extension, Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use super::auth::{token_response, TokenResponse};
use super::{attachment, require_user, save_metadata, MessageResponse};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{FileMetadata, Provider};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/microsoft/token", get(token))
        .route("/api/microsoft/auth/refresh", post(refresh))
        .route("/api/microsoft/files", get(list_files))
        .route("/api/microsoft/files/save", post(save_file))
        .route("/api/microsoft/files/{item_id}/download", get(download_file))
        .route("/api/microsoft/sites", get(list_sites))
        .route("/api/microsoft/sites/{site_id}/files", get(list_site_files))
        .route(
            "/api/microsoft/sites/{site_id}/folders/{folder_id}/children",
            get(list_site_folder),
        )
        .route("/api/microsoft/logout", post(logout))
}

async fn token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TokenResponse>> {
    require_user(&state, &auth).await?;
    token_response(&state, &auth, Provider::Microsoft).await
}

/// Refresh now, even if the current token is still fresh.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TokenResponse>> {
    require_user(&state, &auth).await?;
    let record = state.tokens.force_refresh(&auth, Provider::Microsoft).await?;
    Ok(Json(TokenResponse::new(
        record.access_token.clone(),
        &record,
        Utc::now(),
    )))
}

async fn access_token(state: &AppState, auth: &AuthUser) -> Result<String> {
    require_user(state, auth).await?;
    state
        .tokens
        .get_valid_access_token(auth, Provider::Microsoft)
        .await
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>> {
    let token = access_token(&state, &auth).await?;
    Ok(Json(state.microsoft.list_root_children(&token).await?))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(item_id): Path<String>,
) -> Result<Response> {
    let token = access_token(&state, &auth).await?;
    let bytes = state.microsoft.download_item(&token, &item_id).await?;
    tracing::debug!(user_id = %auth.user_id, item_id = %item_id, size = bytes.len(), "Downloaded OneDrive item");
    Ok(attachment(bytes, &item_id))
}

async fn save_file(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(metadata): Json<FileMetadata>,
) -> Result<Json<MessageResponse>> {
    require_user(&state, &auth).await?;
    save_metadata(&state, &auth, Provider::Microsoft, &metadata).await?;
    Ok(MessageResponse::new("File metadata saved successfully"))
}

async fn list_sites(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>> {
    let token = access_token(&state, &auth).await?;
    Ok(Json(state.microsoft.search_sites(&token).await?))
}

async fn list_site_files(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(site_id): Path<String>,
) -> Result<Json<Value>> {
    let token = access_token(&state, &auth).await?;
    Ok(Json(state.microsoft.list_site_children(&token, &site_id).await?))
}

async fn list_site_folder(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((site_id, folder_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let token = access_token(&state, &auth).await?;
    Ok(Json(
        state
            .microsoft
            .list_site_folder_children(&token, &site_id, &folder_id)
            .await?,
    ))
}

/// Disconnect Microsoft. The session itself stays valid.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    state.tokens.delete_tokens(&auth, Provider::Microsoft).await?;
    Ok(MessageResponse::new("Microsoft account disconnected"))
}
