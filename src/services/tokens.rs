// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle management.
//!
//! `TokenManager` hands out usable access tokens for a (user, provider)
//! pair, refreshing them through the provider when they are about to
//! expire, and keeps the credential store consistent with what the
//! provider returned.
//!
//! Refreshes are not serialized: two concurrent requests that both see a
//! stale token will both refresh and the last write wins.

use super::provider::TokenProvider;
use crate::db::CredentialStore;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{Provider, TokenRecord, User};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Result of handling an OAuth callback.
#[derive(Debug, Clone)]
pub struct OAuthResult {
    pub user: User,
    pub tokens: TokenRecord,
    /// True when this login created the user.
    pub created: bool,
}

/// Token lifecycle manager shared by all providers.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    providers: HashMap<Provider, Arc<dyn TokenProvider>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            providers: HashMap::new(),
        }
    }

    /// Register the client used for `provider.provider()`.
    pub fn with_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.providers.insert(provider.provider(), provider);
        self
    }

    /// Registered client for a provider.
    pub fn provider(&self, provider: Provider) -> Result<&Arc<dyn TokenProvider>, AppError> {
        self.providers.get(&provider).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("No client configured for {}", provider))
        })
    }

    // ─── Token Lifecycle ─────────────────────────────────────────────────────

    /// Get a usable access token, refreshing it first if it is stale.
    pub async fn get_valid_access_token(
        &self,
        user: &AuthUser,
        provider: Provider,
    ) -> Result<String, AppError> {
        self.get_valid_access_token_at(user, provider, Utc::now())
            .await
    }

    /// [`get_valid_access_token`](Self::get_valid_access_token) with an explicit clock.
    ///
    /// A token is stale when less than five minutes of validity remain at
    /// `now`. Fresh tokens are returned without touching the store; stale
    /// ones cost exactly one provider call and one store write.
    pub async fn get_valid_access_token_at(
        &self,
        user: &AuthUser,
        provider: Provider,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let record = self.require_tokens(user, provider).await?;

        if !record.expires_within(Duration::seconds(TOKEN_REFRESH_MARGIN_SECS), now) {
            return Ok(record.access_token);
        }

        tracing::info!(
            user_id = %user.user_id,
            provider = %provider,
            expires_at = %record.expires_at,
            "Access token stale, refreshing"
        );

        let refreshed = self.refresh(&record, now).await?;
        Ok(refreshed.access_token)
    }

    /// Refresh regardless of remaining validity and return the new record.
    pub async fn force_refresh(
        &self,
        user: &AuthUser,
        provider: Provider,
    ) -> Result<TokenRecord, AppError> {
        self.force_refresh_at(user, provider, Utc::now()).await
    }

    /// [`force_refresh`](Self::force_refresh) with an explicit clock.
    pub async fn force_refresh_at(
        &self,
        user: &AuthUser,
        provider: Provider,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, AppError> {
        let record = self.require_tokens(user, provider).await?;
        tracing::info!(user_id = %user.user_id, provider = %provider, "Forced token refresh");
        self.refresh(&record, now).await
    }

    /// Store tokens from a grant, creating or updating the record.
    ///
    /// An existing refresh token is kept unless a new one is supplied.
    pub async fn save_tokens(
        &self,
        user: &AuthUser,
        provider: Provider,
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: i64,
    ) -> Result<TokenRecord, AppError> {
        self.save_tokens_at(
            user,
            provider,
            access_token,
            refresh_token,
            expires_in_seconds,
            Utc::now(),
        )
        .await
    }

    /// [`save_tokens`](Self::save_tokens) with an explicit clock.
    pub async fn save_tokens_at(
        &self,
        user: &AuthUser,
        provider: Provider,
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, AppError> {
        let record = match self.store.get_tokens(&user.user_id, provider).await? {
            Some(existing) => {
                existing.reissued(access_token, refresh_token, expires_in_seconds, now)
            }
            None => TokenRecord::issue(
                &user.user_id,
                provider,
                access_token,
                refresh_token,
                expires_in_seconds,
                now,
            ),
        };

        if record.refresh_token.is_none() {
            tracing::warn!(
                user_id = %user.user_id,
                provider = %provider,
                "Saved tokens without a refresh token; access will lapse at expiry"
            );
        }

        self.store.upsert_tokens(&record).await?;
        tracing::debug!(user_id = %user.user_id, provider = %provider, "Tokens saved");
        Ok(record)
    }

    /// Remove stored tokens. Missing records are not an error.
    pub async fn delete_tokens(&self, user: &AuthUser, provider: Provider) -> Result<(), AppError> {
        self.store.delete_tokens(&user.user_id, provider).await?;
        tracing::info!(user_id = %user.user_id, provider = %provider, "Tokens deleted");
        Ok(())
    }

    /// Stored record, if any, without refreshing.
    pub async fn get_token_record(
        &self,
        user: &AuthUser,
        provider: Provider,
    ) -> Result<Option<TokenRecord>, AppError> {
        self.store.get_tokens(&user.user_id, provider).await
    }

    async fn require_tokens(
        &self,
        user: &AuthUser,
        provider: Provider,
    ) -> Result<TokenRecord, AppError> {
        self.store
            .get_tokens(&user.user_id, provider)
            .await?
            .ok_or(AppError::NoTokenRecord(provider))
    }

    /// Exchange the stored refresh token and persist the result.
    ///
    /// Nothing is written unless the exchange succeeds.
    async fn refresh(&self, record: &TokenRecord, now: DateTime<Utc>) -> Result<TokenRecord, AppError> {
        let provider = record.provider;
        let refresh_token = record
            .refresh_token
            .as_deref()
            .ok_or(AppError::RefreshUnavailable(provider))?;

        let grant = self
            .provider(provider)?
            .exchange_refresh_token(refresh_token)
            .await
            .map_err(|source| AppError::RefreshFailed { provider, source })?;

        let rotated = grant.refresh_token.is_some();
        let updated = record.refreshed(grant, now);
        self.store.upsert_tokens(&updated).await?;

        tracing::info!(
            user_id = %record.user_id,
            provider = %provider,
            rotated,
            expires_at = %updated.expires_at,
            "Token refreshed"
        );
        Ok(updated)
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Exchange an authorization code, then create or update the user and
    /// store their tokens.
    pub async fn handle_oauth_callback(
        &self,
        provider: Provider,
        code: &str,
    ) -> Result<OAuthResult, AppError> {
        let client = self.provider(provider)?;

        let grant = client.exchange_code(code).await.map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "Authorization code exchange failed");
            AppError::ProviderCallFailed(format!("{} token exchange failed", provider.display_name()))
        })?;

        let profile = client.fetch_profile(&grant.access_token).await.map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "Profile lookup failed");
            AppError::ProviderCallFailed(format!(
                "Failed to get {} user info",
                provider.display_name()
            ))
        })?;

        let now = Utc::now();
        let existing = match self
            .store
            .find_user_by_external_id(provider, &profile.external_id)
            .await?
        {
            Some(user) => Some(user),
            None => self.store.find_user_by_email(&profile.email).await?,
        };

        let created = existing.is_none();
        let user = match existing {
            Some(user) => user.merged_with(&profile, provider, now),
            None => User::from_profile(&profile, provider, now),
        };
        self.store.upsert_user(&user).await?;

        let auth_user = AuthUser::new(&user.id);
        let tokens = self
            .save_tokens_at(
                &auth_user,
                provider,
                grant.access_token,
                grant.refresh_token,
                grant.expires_in,
                now,
            )
            .await?;

        tracing::info!(
            user_id = %user.id,
            provider = %provider,
            created,
            "OAuth callback handled, user and tokens stored"
        );

        Ok(OAuthResult {
            user,
            tokens,
            created,
        })
    }
}
