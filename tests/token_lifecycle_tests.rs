// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle tests.
//!
//! These drive `TokenManager` with a scripted provider and a store that
//! counts writes, using explicit clocks so staleness is deterministic.

use chrono::{Duration, TimeZone, Utc};
use drive_token_broker::db::CredentialStore;
use drive_token_broker::error::AppError;
use drive_token_broker::middleware::AuthUser;
use drive_token_broker::models::Provider;
use drive_token_broker::services::TokenManager;
use std::sync::Arc;

mod common;

use common::{CountingStore, FakeProvider};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn manager(store: Arc<CountingStore>, provider: Arc<FakeProvider>) -> TokenManager {
    TokenManager::new(store).with_provider(provider)
}

#[tokio::test]
async fn test_fresh_token_returned_without_writes() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Google).refreshes_to("new", None, 3600));
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Google, "saved".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();
    let writes_after_save = store.writes();

    let token = tokens
        .get_valid_access_token_at(&user, Provider::Google, t0() + Duration::minutes(30))
        .await
        .unwrap();

    assert_eq!(token, "saved");
    assert_eq!(store.writes(), writes_after_save);
    assert_eq!(fake.refresh_count(), 0);
}

#[tokio::test]
async fn test_stale_token_refreshed_exactly_once() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Google).refreshes_to("fresh", None, 3600));
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Google, "old".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();
    let writes_after_save = store.writes();

    let now = t0() + Duration::minutes(58);
    let token = tokens
        .get_valid_access_token_at(&user, Provider::Google, now)
        .await
        .unwrap();

    assert_eq!(token, "fresh");
    assert_eq!(fake.refresh_count(), 1);
    assert_eq!(store.writes(), writes_after_save + 1);
    assert_eq!(fake.last_refresh_token.lock().unwrap().as_deref(), Some("rt"));

    let stored = store.get_tokens("u1", Provider::Google).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.expires_at, now + Duration::seconds(3600));
    assert_eq!(stored.created_at, t0());
    assert_eq!(stored.updated_at, now);
}

#[tokio::test]
async fn test_refresh_without_new_refresh_token_keeps_old_one() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Microsoft).refreshes_to("fresh", None, 3600));
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Microsoft, "old".into(), Some("keep-me".into()), 60, t0())
        .await
        .unwrap();

    tokens
        .get_valid_access_token_at(&user, Provider::Microsoft, t0())
        .await
        .unwrap();

    let stored = store.get_tokens("u1", Provider::Microsoft).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("keep-me"));
}

#[tokio::test]
async fn test_rotated_refresh_token_replaces_old_one() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(
        FakeProvider::new(Provider::Microsoft).refreshes_to("fresh", Some("rotated"), 3600),
    );
    let tokens = manager(store.clone(), fake);
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Microsoft, "old".into(), Some("rt".into()), 60, t0())
        .await
        .unwrap();
    tokens
        .get_valid_access_token_at(&user, Provider::Microsoft, t0())
        .await
        .unwrap();

    let stored = store.get_tokens("u1", Provider::Microsoft).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("rotated"));
}

#[tokio::test]
async fn test_delete_missing_record_is_noop() {
    let store = Arc::new(CountingStore::new());
    let tokens = manager(store.clone(), Arc::new(FakeProvider::new(Provider::Google)));

    tokens
        .delete_tokens(&AuthUser::new("nobody"), Provider::Google)
        .await
        .unwrap();

    assert!(store.get_tokens("nobody", Provider::Google).await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_record_fails_without_writes() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Google));
    let tokens = manager(store.clone(), fake.clone());

    let err = tokens
        .get_valid_access_token_at(&AuthUser::new("u1"), Provider::Google, t0())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoTokenRecord(Provider::Google)));
    assert_eq!(store.writes(), 0);
    assert_eq!(fake.refresh_count(), 0);
}

#[tokio::test]
async fn test_one_hour_token_refresh_window() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Google).refreshes_to("fresh", None, 3600));
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Google, "first".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();

    // Ten seconds in: still fresh
    let token = tokens
        .get_valid_access_token_at(&user, Provider::Google, t0() + Duration::seconds(10))
        .await
        .unwrap();
    assert_eq!(token, "first");
    assert_eq!(fake.refresh_count(), 0);

    // Exactly five minutes left is not yet stale
    let token = tokens
        .get_valid_access_token_at(&user, Provider::Google, t0() + Duration::seconds(3300))
        .await
        .unwrap();
    assert_eq!(token, "first");
    assert_eq!(fake.refresh_count(), 0);

    // Any later within the window refreshes
    let token = tokens
        .get_valid_access_token_at(
            &user,
            Provider::Google,
            t0() + Duration::seconds(3300) + Duration::milliseconds(1),
        )
        .await
        .unwrap();
    assert_eq!(token, "fresh");
    assert_eq!(fake.refresh_count(), 1);
}

#[tokio::test]
async fn test_refresh_failure_leaves_record_unchanged() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Google)); // rejects refreshes
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    let saved = tokens
        .save_tokens_at(&user, Provider::Google, "old".into(), Some("revoked".into()), 60, t0())
        .await
        .unwrap();
    let writes_after_save = store.writes();

    let err = tokens
        .get_valid_access_token_at(&user, Provider::Google, t0())
        .await
        .unwrap_err();

    match err {
        AppError::RefreshFailed { provider, source } => {
            assert_eq!(provider, Provider::Google);
            assert!(source.is_invalid_grant());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err_requires_reauth(&tokens, &user).await);
    assert_eq!(store.writes(), writes_after_save);

    let stored = store.get_tokens("u1", Provider::Google).await.unwrap().unwrap();
    assert_eq!(stored, saved);
}

async fn err_requires_reauth(tokens: &TokenManager, user: &AuthUser) -> bool {
    tokens
        .get_valid_access_token_at(user, Provider::Google, t0())
        .await
        .unwrap_err()
        .requires_reauthorization()
}

#[tokio::test]
async fn test_stale_record_without_refresh_token() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Google).refreshes_to("fresh", None, 3600));
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Google, "old".into(), None, 60, t0())
        .await
        .unwrap();

    let err = tokens
        .get_valid_access_token_at(&user, Provider::Google, t0())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RefreshUnavailable(Provider::Google)));
    assert_eq!(fake.refresh_count(), 0);
}

#[tokio::test]
async fn test_save_is_idempotent_and_keeps_created_at() {
    let store = Arc::new(CountingStore::new());
    let tokens = manager(store.clone(), Arc::new(FakeProvider::new(Provider::Google)));
    let user = AuthUser::new("u1");

    let first = tokens
        .save_tokens_at(&user, Provider::Google, "at".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();
    let later = t0() + Duration::minutes(1);
    let second = tokens
        .save_tokens_at(&user, Provider::Google, "at".into(), None, 3600, later)
        .await
        .unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.refresh_token.as_deref(), Some("rt"));
    assert_eq!(second.updated_at, later);
}

#[tokio::test]
async fn test_providers_are_keyed_separately() {
    let store = Arc::new(CountingStore::new());
    let tokens = TokenManager::new(store.clone())
        .with_provider(Arc::new(FakeProvider::new(Provider::Google)))
        .with_provider(Arc::new(FakeProvider::new(Provider::Microsoft)));
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Google, "g".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();
    tokens
        .save_tokens_at(&user, Provider::Microsoft, "m".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();
    tokens.delete_tokens(&user, Provider::Google).await.unwrap();

    assert!(tokens.get_token_record(&user, Provider::Google).await.unwrap().is_none());
    let token = tokens
        .get_valid_access_token_at(&user, Provider::Microsoft, t0())
        .await
        .unwrap();
    assert_eq!(token, "m");
}

#[tokio::test]
async fn test_force_refresh_ignores_freshness() {
    let store = Arc::new(CountingStore::new());
    let fake = Arc::new(FakeProvider::new(Provider::Microsoft).refreshes_to("forced", None, 3600));
    let tokens = manager(store.clone(), fake.clone());
    let user = AuthUser::new("u1");

    tokens
        .save_tokens_at(&user, Provider::Microsoft, "fresh".into(), Some("rt".into()), 3600, t0())
        .await
        .unwrap();

    let record = tokens
        .force_refresh_at(&user, Provider::Microsoft, t0())
        .await
        .unwrap();

    assert_eq!(record.access_token, "forced");
    assert_eq!(fake.refresh_count(), 1);
}

#[tokio::test]
async fn test_oauth_callback_creates_then_reuses_user() {
    let store = Arc::new(CountingStore::new());
    let tokens = manager(store.clone(), Arc::new(FakeProvider::new(Provider::Google)));

    let first = tokens
        .handle_oauth_callback(Provider::Google, "code1")
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.user.email, "fake@example.com");
    assert_eq!(first.user.google_user_id.as_deref(), Some("ext-1"));
    assert_eq!(first.tokens.access_token, "access-for-code1");

    let second = tokens
        .handle_oauth_callback(Provider::Google, "code2")
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.user.id, first.user.id);
    assert_eq!(second.tokens.created_at, first.tokens.created_at);

    let stored = store
        .get_tokens(&first.user.id, Provider::Google)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "access-for-code2");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-for-code2"));
}

#[tokio::test]
async fn test_oauth_callback_links_second_provider_by_email() {
    let store = Arc::new(CountingStore::new());
    let tokens = TokenManager::new(store.clone())
        .with_provider(Arc::new(FakeProvider::new(Provider::Google)))
        .with_provider(Arc::new(FakeProvider::new(Provider::Microsoft)));

    let google = tokens
        .handle_oauth_callback(Provider::Google, "g")
        .await
        .unwrap();
    let microsoft = tokens
        .handle_oauth_callback(Provider::Microsoft, "m")
        .await
        .unwrap();

    assert!(!microsoft.created);
    assert_eq!(microsoft.user.id, google.user.id);
    assert_eq!(microsoft.user.microsoft_user_id.as_deref(), Some("ext-1"));
    assert_eq!(microsoft.user.google_user_id.as_deref(), Some("ext-1"));
}
