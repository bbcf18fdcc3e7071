//! REST access, session teardown and error toasts against an in-process backend.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{FakeBackend, FakeOptions};
use openautomate::auth::{MemoryTokenStorage, StaticToken};
use openautomate::notify::CollectingSink;
use openautomate::types::BotAgent;
use openautomate::{
    AccountApi, ApiClient, ApiError, ListQuery, Notifier, QueryCache, SessionEvent, SessionStore,
    TenantApi, TokenProvider,
};

async fn signed_in(backend: &FakeBackend) -> (SessionStore, AccountApi, TenantApi) {
    let session = SessionStore::new(MemoryTokenStorage::new());
    let client = ApiClient::new(backend.url.clone(), Arc::new(session.clone()));
    let account = AccountApi::new(client.clone());
    session
        .login(&account, "ops@acme.test", "correct-horse")
        .await
        .expect("login succeeds");
    (session, account, TenantApi::new(client, "acme"))
}

#[tokio::test]
async fn test_login_then_list_agents() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let (session, _, api) = signed_in(&backend).await;

    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().display_name(), "Ops Team");

    let agents = api.list_agents(&ListQuery::new()).await.unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["acme-runner-1", "acme-runner-2"]);

    // Bare-array list endpoints decode the same way.
    let executions = api.list_executions(&ListQuery::new()).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].package_name.as_deref(), Some("Invoices"));
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized_and_not_toasted() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let session = SessionStore::new(MemoryTokenStorage::new());
    let account = AccountApi::new(ApiClient::new(backend.url.clone(), Arc::new(session.clone())));

    let err = session
        .login(&account, "ops@acme.test", "wrong")
        .await
        .unwrap_err();
    assert!(!session.is_authenticated());

    let sink = Arc::new(CollectingSink::new());
    let notifier = Notifier::new(sink.clone());
    assert!(!notifier.report_unhandled(&anyhow::Error::new(err)));
    assert!(sink.toasts().is_empty());
}

#[tokio::test]
async fn test_not_found_becomes_one_titled_toast() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let (_, _, api) = signed_in(&backend).await;

    let err = api.get_agent("missing").await.unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Agent missing not found");

    let sink = Arc::new(CollectingSink::new());
    let notifier = Notifier::new(sink.clone());
    assert!(notifier.api_error(&err, "Load agent"));

    let toasts = sink.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "Not Found");
    assert_eq!(toasts[0].description, "Load agent: Agent missing not found");
}

#[tokio::test]
async fn test_rejected_token_ends_session_without_toast() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let (session, _, api) = signed_in(&backend).await;
    let mut events = session.events();

    let err = api.list_assets(&ListQuery::new()).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.is_authenticated());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::TokenExpired);

    let sink = Arc::new(CollectingSink::new());
    assert!(!Notifier::new(sink.clone()).api_error(&err, "Load assets"));
    assert!(sink.toasts().is_empty());
}

#[tokio::test]
async fn test_unauthorized_list_reports_401() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken("revoked".into()));
    let api = TenantApi::new(ApiClient::new(backend.url.clone(), tokens), "acme");

    let err = api.list_agents(&ListQuery::new()).await.unwrap_err();
    assert_eq!(err.status, 401);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let (session, account, _) = signed_in(&backend).await;

    session.logout(Some(&account)).await;
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_cached_list_is_served_until_invalidated() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let (_, _, api) = signed_in(&backend).await;
    let cache = QueryCache::new(Duration::from_secs(60));
    let key = api.cache_key("agents");
    let query = ListQuery::new();

    let first: Vec<BotAgent> = cache
        .get_or_fetch(&key, || api.list_agents(&query))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    // Fresh entries never reach the fetcher.
    let cached: Vec<BotAgent> = cache
        .get_or_fetch(&key, || async { Err(ApiError::new(500, "fetch on fresh entry")) })
        .await
        .unwrap();
    assert_eq!(cached, first);

    assert_eq!(cache.invalidate_prefix("acme:").await, 1);
    assert!(!cache.is_fresh(&key).await);
    let refetched: Vec<BotAgent> = cache
        .get_or_fetch(&key, || api.list_agents(&query))
        .await
        .unwrap();
    assert_eq!(refetched, first);
}
