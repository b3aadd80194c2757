// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory credential store.
//!
//! Backed by `DashMap`s so it can be shared across request tasks without a
//! global lock. Used for local development and tests.

use super::CredentialStore;
use crate::error::AppError;
use crate::models::file::saved_file_key;
use crate::models::token::token_key;
use crate::models::{Provider, SavedFile, TokenRecord, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local credential store.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    tokens: Arc<DashMap<String, TokenRecord>>,
    saved_files: Arc<DashMap<String, SavedFile>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored token records (all users, all providers).
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn find_user_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.external_id(provider) == Some(external_id))
            .map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_tokens(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<TokenRecord>, AppError> {
        Ok(self
            .tokens
            .get(&token_key(user_id, provider))
            .map(|t| t.clone()))
    }

    async fn upsert_tokens(&self, record: &TokenRecord) -> Result<(), AppError> {
        self.tokens.insert(record.key(), record.clone());
        Ok(())
    }

    async fn delete_tokens(&self, user_id: &str, provider: Provider) -> Result<(), AppError> {
        self.tokens.remove(&token_key(user_id, provider));
        Ok(())
    }

    async fn get_saved_file(
        &self,
        user_id: &str,
        provider: Provider,
        file_id: &str,
    ) -> Result<Option<SavedFile>, AppError> {
        Ok(self
            .saved_files
            .get(&saved_file_key(user_id, provider, file_id))
            .map(|f| f.clone()))
    }

    async fn upsert_saved_file(&self, file: &SavedFile) -> Result<(), AppError> {
        self.saved_files.insert(file.key(), file.clone());
        Ok(())
    }

    async fn list_saved_files(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Vec<SavedFile>, AppError> {
        let mut files: Vec<SavedFile> = self
            .saved_files
            .iter()
            .filter(|f| f.user_id == user_id && f.provider == provider)
            .map(|f| f.clone())
            .collect();
        files.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(files)
    }
}
