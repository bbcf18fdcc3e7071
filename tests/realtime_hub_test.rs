//! Live status feed against an in-process backend over a real WebSocket.

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use url::Url;

use helpers::{invocation, jwt, FakeBackend, FakeOptions};
use openautomate::auth::StaticToken;
use openautomate::config::HubConfig;
use openautomate::realtime::{RetryPolicy, StatusStore, UpdateCallback};
use openautomate::{ClientConfig, HubHandle, HubState, RealtimeHub};

const WAIT: Duration = Duration::from_secs(10);

fn config(frontend: &Url) -> ClientConfig {
    ClientConfig::default()
        .with_frontend_url(frontend.clone())
        .with_hub(HubConfig {
            start_retry: RetryPolicy::fixed(1, Duration::from_millis(20)),
            reconnect: RetryPolicy::exponential(2, Duration::from_millis(20), Duration::from_millis(50)),
            keep_alive_interval: Duration::from_secs(1),
            server_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
        })
}

async fn wait_for_state(handle: &HubHandle, want: impl Fn(&HubState) -> bool) -> HubState {
    let mut rx = handle.subscribe_state();
    let state = tokio::time::timeout(WAIT, rx.wait_for(|s| want(s)))
        .await
        .expect("state change in time")
        .expect("hub task alive")
        .clone();
    state
}

async fn wait_for_entries(store: &StatusStore, count: usize) {
    let mut rx = store.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|map| map.len() >= count))
        .await
        .expect("updates in time")
        .expect("store alive");
}

#[tokio::test]
async fn test_discovery_negotiate_and_live_updates() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let callback: UpdateCallback = Arc::new(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let hub = RealtimeHub::new(
        &config(&backend.url),
        reqwest::Client::new(),
        Arc::new(StaticToken(jwt(3600))),
    );
    let handle = hub.start("acme", Some(callback));
    wait_for_state(&handle, HubState::is_live).await;
    assert_eq!(backend.negotiations(), 1);
    assert_eq!(backend.connections(), 1);

    backend.push(&[
        invocation(
            "BotStatusUpdate",
            json!({"BotAgentId": "a1", "AgentName": "runner-1", "Status": "Busy"}),
        ),
        invocation(
            "ExecutionStatusUpdate",
            json!({"executionId": "e1", "botAgentId": "a1", "status": "Running",
                   "timestamp": "2025-03-01T10:00:00Z"}),
        ),
    ]);
    wait_for_entries(handle.agents(), 1).await;
    wait_for_entries(handle.executions(), 1).await;

    let agent = handle.agents().get("a1").unwrap();
    assert_eq!(agent.status, "Busy");
    assert_eq!(agent.agent_name.as_deref(), Some("runner-1"));
    assert_eq!(handle.executions().get("e1").unwrap().status, "Running");

    // Later update for the same agent replaces the earlier one.
    backend.push(&[invocation(
        "BotStatusUpdate",
        json!({"botAgentId": "a1", "status": "Available"}),
    )]);
    let mut rx = handle.agents().subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|map| map.get("a1").is_some_and(|u| u.status == "Available")))
        .await
        .expect("second update in time")
        .expect("store alive");
    assert_eq!(handle.agents().len(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 3);

    let agents = handle.agents().clone();
    handle.shutdown().await;
    assert!(agents.is_closed());

    backend.push(&[invocation(
        "BotStatusUpdate",
        json!({"botAgentId": "a2", "status": "Busy"}),
    )]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(agents.get("a2").is_none());
}

#[tokio::test]
async fn test_discovery_failure_disables_without_negotiating() {
    let backend = FakeBackend::spawn(FakeOptions {
        connection_info_status: StatusCode::INTERNAL_SERVER_ERROR,
    })
    .await;

    let hub = RealtimeHub::new(
        &config(&backend.url),
        reqwest::Client::new(),
        Arc::new(StaticToken(jwt(3600))),
    );
    let handle = hub.start("acme", None);
    let state = wait_for_state(&handle, |s| matches!(s, HubState::Disabled(_))).await;

    assert!(matches!(state, HubState::Disabled(reason) if reason.contains("500")));
    assert_eq!(backend.negotiations(), 0);
    assert!(handle.agents().is_empty());
    handle.shutdown().await;
}

#[tokio::test]
async fn test_rejected_token_is_retried_once_then_disabled() {
    let backend = FakeBackend::spawn(FakeOptions::default()).await;

    let hub = RealtimeHub::new(
        &config(&backend.url),
        reqwest::Client::new(),
        Arc::new(StaticToken("revoked".into())),
    );
    let handle = hub.start("acme", None);
    wait_for_state(&handle, |s| matches!(s, HubState::Disabled(_))).await;

    assert_eq!(backend.negotiations(), 2);
    assert_eq!(backend.connections(), 0);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_pinned_api_url_skips_discovery() {
    let backend = FakeBackend::spawn(FakeOptions {
        connection_info_status: StatusCode::INTERNAL_SERVER_ERROR,
    })
    .await;

    let config = config(&Url::parse("http://127.0.0.1:9").unwrap()).with_api_url(backend.url.clone());
    let hub = RealtimeHub::new(&config, reqwest::Client::new(), Arc::new(StaticToken(jwt(3600))));
    let handle = hub.start("acme", None);
    wait_for_state(&handle, HubState::is_live).await;
    assert_eq!(backend.negotiations(), 1);
    handle.shutdown().await;
}
