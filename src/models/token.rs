// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token records.
//!
//! A `TokenRecord` is never mutated in place: every save or refresh builds
//! a new value from the previous one and the store replaces the document
//! wholesale.

use super::Provider;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens returned by a provider token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the provider keeps the previous refresh token valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl TokenGrant {
    /// Absolute expiry for a grant received at `now`.
    ///
    /// `None` when `expires_in` is not positive or does not fit a timestamp.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.expires_in <= 0 {
            return None;
        }
        Duration::try_seconds(self.expires_in).and_then(|d| now.checked_add_signed(d))
    }
}

/// `now + expires_in`, saturating at the latest representable instant.
fn expiry(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    Duration::try_seconds(expires_in)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(if expires_in < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Stored tokens for one (user, provider) pair.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: String,
    pub provider: Provider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl TokenRecord {
    /// Build a brand new record from freshly issued tokens.
    pub fn issue(
        user_id: &str,
        provider: Provider,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            provider,
            access_token,
            refresh_token,
            expires_at: expiry(now, expires_in),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record after a new grant: access token and expiry always replaced,
    /// refresh token only when a new one was supplied.
    pub fn reissued(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: self.user_id.clone(),
            provider: self.provider,
            access_token,
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: expiry(now, expires_in),
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// Record after a successful refresh exchange.
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        self.reissued(grant.access_token, grant.refresh_token, grant.expires_in, now)
    }

    /// True when the access token expires less than `margin` after `now`.
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - now < margin
    }

    /// Whole seconds of validity left (negative once expired).
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }

    /// Document key in the token collection.
    pub fn key(&self) -> String {
        token_key(&self.user_id, self.provider)
    }
}

/// Storage key for a (user, provider) pair.
pub fn token_key(user_id: &str, provider: Provider) -> String {
    format!("{}:{}", user_id, provider.as_str())
}
