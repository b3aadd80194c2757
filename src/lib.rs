// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Drive Token Broker: OAuth2 tokens for Google Drive and Microsoft Graph
//!
//! This crate authenticates users against Google and Microsoft, stores
//! their tokens per provider, and renews access tokens before they expire
//! so file API calls keep working.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::CredentialStore;
use services::{GoogleProvider, MicrosoftProvider, TokenManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn CredentialStore>,
    pub tokens: TokenManager,
    pub google: Arc<GoogleProvider>,
    pub microsoft: Arc<MicrosoftProvider>,
}

impl AppState {
    /// Wire the token manager to the store and both provider clients.
    pub fn new(
        config: Config,
        db: Arc<dyn CredentialStore>,
        google: GoogleProvider,
        microsoft: MicrosoftProvider,
    ) -> Self {
        let google = Arc::new(google);
        let microsoft = Arc::new(microsoft);
        let tokens = TokenManager::new(db.clone())
            .with_provider(google.clone())
            .with_provider(microsoft.clone());

        Self {
            config,
            db,
            tokens,
            google,
            microsoft,
        }
    }

    /// Build provider clients from configuration.
    pub fn from_config(config: Config, db: Arc<dyn CredentialStore>) -> Self {
        let google = GoogleProvider::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.google_redirect_uri.clone(),
        );
        let microsoft = MicrosoftProvider::new(
            config.microsoft_client_id.clone(),
            config.microsoft_client_secret.clone(),
            config.microsoft_redirect_uri.clone(),
            &config.microsoft_tenant,
        );
        Self::new(config, db, google, microsoft)
    }
}
