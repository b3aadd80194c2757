// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::Utc;
use drive_token_broker::config::Config;
use drive_token_broker::db::{CredentialStore, FirestoreDb, MemoryDb};
use drive_token_broker::error::AppError;
use drive_token_broker::models::{
    Provider, ProviderProfile, SavedFile, TokenGrant, TokenRecord, User,
};
use drive_token_broker::routes::create_router;
use drive_token_broker::services::google::GoogleEndpoints;
use drive_token_broker::services::microsoft::MicrosoftEndpoints;
use drive_token_broker::services::{GoogleProvider, MicrosoftProvider, ProviderError, TokenProvider};
use drive_token_broker::AppState;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app whose store fails every call.
#[allow(dead_code)]
pub fn create_offline_app() -> (axum::Router, Arc<AppState>) {
    let db: Arc<dyn CredentialStore> = Arc::new(test_db_offline());
    let state = Arc::new(AppState::from_config(Config::test_default(), db));
    (create_router(state.clone()), state)
}

/// Create a test app backed by an in-memory store.
///
/// Provider clients point at the real endpoints and must not be reached.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db: Arc<dyn CredentialStore> = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::from_config(config, db));
    (create_router(state.clone()), state)
}

/// Create a test app with a specific frontend URL.
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    let db: Arc<dyn CredentialStore> = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::from_config(config, db));
    (create_router(state.clone()), state)
}

/// Create a test app whose provider clients talk to a mock server.
///
/// Google endpoints live under `{base}/google`, Microsoft under `{base}/microsoft`.
#[allow(dead_code)]
pub fn create_mock_app(base_url: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db: Arc<dyn CredentialStore> = Arc::new(MemoryDb::new());
    let google = GoogleProvider::with_endpoints(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
        GoogleEndpoints::with_base(&format!("{}/google", base_url)),
    );
    let microsoft = MicrosoftProvider::with_endpoints(
        config.microsoft_client_id.clone(),
        config.microsoft_client_secret.clone(),
        config.microsoft_redirect_uri.clone(),
        MicrosoftEndpoints::with_base(&format!("{}/microsoft", base_url)),
    );
    let state = Arc::new(AppState::new(config, db, google, microsoft));
    (create_router(state.clone()), state)
}

/// Create a test JWT for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Store a user with a fixed ID.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, user_id: &str, email: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: user_id.to_string(),
        email: email.to_string(),
        name: "Test User".to_string(),
        google_user_id: Some(format!("g-{}", user_id)),
        microsoft_user_id: None,
        created_at: now,
        updated_at: now,
    };
    state.db.upsert_user(&user).await.unwrap();
    user
}

/// Store a token record expiring `expires_in` seconds from now.
#[allow(dead_code)]
pub async fn seed_tokens(
    state: &AppState,
    user_id: &str,
    provider: Provider,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in: i64,
) -> TokenRecord {
    let record = TokenRecord::issue(
        user_id,
        provider,
        access_token.to_string(),
        refresh_token.map(str::to_string),
        expires_in,
        Utc::now(),
    );
    state.db.upsert_tokens(&record).await.unwrap();
    record
}

// ─── Fakes ───────────────────────────────────────────────────────────────────

/// Scripted provider that counts calls.
#[allow(dead_code)]
pub struct FakeProvider {
    provider: Provider,
    /// Grant returned by the next refresh; `None` rejects with `invalid_grant`.
    refresh_grant: Mutex<Option<TokenGrant>>,
    pub refresh_calls: AtomicUsize,
    pub last_refresh_token: Mutex<Option<String>>,
    profile: ProviderProfile,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            refresh_grant: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
            last_refresh_token: Mutex::new(None),
            profile: ProviderProfile {
                external_id: "ext-1".to_string(),
                email: "fake@example.com".to_string(),
                name: "Fake User".to_string(),
            },
        }
    }

    /// Answer refreshes with this grant.
    pub fn refreshes_to(self, access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> Self {
        *self.refresh_grant.lock().unwrap() = Some(TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_in,
        });
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for FakeProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("https://fake.example/authorize?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        Ok(TokenGrant {
            access_token: format!("access-for-{}", code),
            refresh_token: Some(format!("refresh-for-{}", code)),
            expires_in: 3600,
        })
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock().unwrap() = Some(refresh_token.to_string());

        self.refresh_grant
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::Status {
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.to_string(),
            })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<ProviderProfile, ProviderError> {
        Ok(self.profile.clone())
    }
}

/// Store wrapper that counts token reads and writes.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDb,
    pub token_reads: AtomicUsize,
    pub token_writes: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.token_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.inner.get_user(user_id).await
    }

    async fn find_user_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        self.inner.find_user_by_external_id(provider, external_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.inner.find_user_by_email(email).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.upsert_user(user).await
    }

    async fn get_tokens(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<TokenRecord>, AppError> {
        self.token_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_tokens(user_id, provider).await
    }

    async fn upsert_tokens(&self, record: &TokenRecord) -> Result<(), AppError> {
        self.token_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_tokens(record).await
    }

    async fn delete_tokens(&self, user_id: &str, provider: Provider) -> Result<(), AppError> {
        self.token_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_tokens(user_id, provider).await
    }

    async fn get_saved_file(
        &self,
        user_id: &str,
        provider: Provider,
        file_id: &str,
    ) -> Result<Option<SavedFile>, AppError> {
        self.inner.get_saved_file(user_id, provider, file_id).await
    }

    async fn upsert_saved_file(&self, file: &SavedFile) -> Result<(), AppError> {
        self.inner.upsert_saved_file(file).await
    }

    async fn list_saved_files(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Vec<SavedFile>, AppError> {
        self.inner.list_saved_files(user_id, provider).await
    }
}
