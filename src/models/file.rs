// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File metadata models (Drive listings and saved bookmarks).

use super::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// File metadata as exposed to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub size: Option<i64>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// A file the user bookmarked, stored per (user, provider, file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SavedFile {
    pub user_id: String,
    pub provider: Provider,
    /// Provider-side file ID
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub file_size: Option<i64>,
    pub download_url: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl SavedFile {
    /// New bookmark, or an update of `existing` keeping its creation time.
    pub fn from_metadata(
        user_id: &str,
        provider: Provider,
        metadata: &FileMetadata,
        existing: Option<&SavedFile>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            provider,
            file_id: metadata.id.clone(),
            file_name: metadata.name.clone(),
            mime_type: metadata.mime_type.clone(),
            file_size: metadata.size,
            download_url: metadata.download_url.clone(),
            created_at: existing.map(|f| f.created_at).unwrap_or(now),
            updated_at: now,
        }
    }

    /// Document key in the saved files collection.
    pub fn key(&self) -> String {
        saved_file_key(&self.user_id, self.provider, &self.file_id)
    }
}

/// Storage key for a saved file.
pub fn saved_file_key(user_id: &str, provider: Provider, file_id: &str) -> String {
    format!(
        "{}:{}:{}",
        user_id,
        provider.as_str(),
        urlencoding::encode(file_id)
    )
}
