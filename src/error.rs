// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::Provider;
use crate::services::provider::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired session")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("No {0} tokens for user")]
    NoTokenRecord(Provider),

    #[error("No {0} refresh token stored")]
    RefreshUnavailable(Provider),

    #[error("Failed to refresh {provider} access token: {source}")]
    RefreshFailed {
        provider: Provider,
        #[source]
        source: ProviderError,
    },

    #[error("Provider API call failed: {0}")]
    ProviderCallFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the provider rejected the stored credentials, meaning the
    /// user has to go through the consent flow again.
    pub fn requires_reauthorization(&self) -> bool {
        match self {
            AppError::RefreshUnavailable(_) => true,
            AppError::RefreshFailed { source, .. } => source.is_invalid_grant(),
            _ => false,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "not_authenticated", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_session", None),
            AppError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                Some("User not found".to_string()),
            ),
            AppError::NoTokenRecord(_) => {
                (StatusCode::NOT_FOUND, "no_token_record", Some(self.to_string()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::RefreshUnavailable(provider) => {
                tracing::warn!(provider = %provider, "No refresh token available");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "refresh_unavailable",
                    Some(self.to_string()),
                )
            }
            AppError::RefreshFailed { provider, source } => {
                tracing::error!(provider = %provider, error = %source, "Token refresh failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "refresh_failed",
                    Some(format!("Failed to refresh {} access token", provider)),
                )
            }
            AppError::ProviderCallFailed(msg) => {
                tracing::warn!(error = %msg, "Provider API call failed");
                (StatusCode::BAD_GATEWAY, "provider_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
