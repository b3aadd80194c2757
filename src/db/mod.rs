//! Credential store (users, tokens, saved files).
//!
//! Two backends implement [`CredentialStore`]: an in-memory map for local
//! development and tests, and Firestore for deployments.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Provider, SavedFile, TokenRecord, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Token records keyed by `{user_id}:{provider}`
    pub const TOKENS: &str = "tokens";
    pub const SAVED_FILES: &str = "saved_files";
}

/// Persistent storage for users and their provider tokens.
///
/// Token records are keyed by (user ID, provider); `upsert_tokens` replaces
/// the whole record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Find the user linked to an external provider identity.
    async fn find_user_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Tokens ──────────────────────────────────────────────────

    async fn get_tokens(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<TokenRecord>, AppError>;

    async fn upsert_tokens(&self, record: &TokenRecord) -> Result<(), AppError>;

    /// Delete tokens. Deleting an absent record succeeds.
    async fn delete_tokens(&self, user_id: &str, provider: Provider) -> Result<(), AppError>;

    // ─── Saved Files ─────────────────────────────────────────────

    async fn get_saved_file(
        &self,
        user_id: &str,
        provider: Provider,
        file_id: &str,
    ) -> Result<Option<SavedFile>, AppError>;

    async fn upsert_saved_file(&self, file: &SavedFile) -> Result<(), AppError>;

    /// Saved files for a user, newest first.
    async fn list_saved_files(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Vec<SavedFile>, AppError>;
}
