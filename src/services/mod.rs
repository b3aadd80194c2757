// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google;
pub mod microsoft;
pub mod oauth_state;
pub mod provider;
pub mod tokens;

pub use google::GoogleProvider;
pub use microsoft::MicrosoftProvider;
pub use provider::{ProviderError, TokenProvider};
pub use tokens::{OAuthResult, TokenManager};
