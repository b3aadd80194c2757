// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod file;
pub mod provider;
pub mod token;
pub mod user;

pub use file::{FileMetadata, SavedFile};
pub use provider::Provider;
pub use token::{TokenGrant, TokenRecord};
pub use user::{ProviderProfile, User};
