// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Drive routes.

use axum::{
    extract::{Extension, Path, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::{attachment, require_user, save_metadata};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{FileMetadata, Provider, SavedFile};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/drive/files", get(list_files).post(save_file))
        .route("/api/drive/files/{file_id}", get(get_file))
        .route("/api/drive/files/{file_id}/download", get(download_file))
        .route("/api/drive/saved-files", get(saved_files))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SaveFileResponse {
    /// Storage key of the saved record
    pub id: String,
    pub file_id: String,
    pub file_name: String,
    pub message: String,
}

async fn access_token(state: &AppState, auth: &AuthUser) -> Result<String> {
    require_user(state, auth).await?;
    state
        .tokens
        .get_valid_access_token(auth, Provider::Google)
        .await
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<FileMetadata>>> {
    let token = access_token(&state, &auth).await?;
    Ok(Json(state.google.list_files(&token).await?))
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(file_id): Path<String>,
) -> Result<Json<FileMetadata>> {
    let token = access_token(&state, &auth).await?;
    Ok(Json(state.google.get_file(&token, &file_id).await?))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let token = access_token(&state, &auth).await?;
    let bytes = state.google.download_file(&token, &file_id).await?;
    tracing::debug!(user_id = %auth.user_id, file_id = %file_id, size = bytes.len(), "Downloaded Drive file");
    Ok(attachment(bytes, &file_id))
}

async fn save_file(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(metadata): Json<FileMetadata>,
) -> Result<Json<SaveFileResponse>> {
    require_user(&state, &auth).await?;
    let file = save_metadata(&state, &auth, Provider::Google, &metadata).await?;

    Ok(Json(SaveFileResponse {
        id: file.key(),
        file_id: file.file_id,
        file_name: file.file_name,
        message: "File metadata saved successfully".to_string(),
    }))
}

async fn saved_files(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<SavedFile>>> {
    require_user(&state, &auth).await?;
    Ok(Json(
        state
            .db
            .list_saved_files(&auth.user_id, Provider::Google)
            .await?,
    ))
}
