//! In-process fake of the OpenAutomate front end + backend.
//!
//! One axum server plays both roles: `/api/connection-info` points back at
//! itself, REST routes live under `/{tenant}/api/...`, and the hub speaks
//! the JSON hub protocol over a real WebSocket.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use url::Url;

pub const GOOD_TOKEN_SUB: &str = "u1";
pub const RS: char = '\u{1e}';

#[derive(Clone)]
pub struct FakeOptions {
    pub connection_info_status: StatusCode,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            connection_info_status: StatusCode::OK,
        }
    }
}

#[derive(Clone)]
struct AppState {
    base_url: String,
    options: FakeOptions,
    hub_tx: broadcast::Sender<String>,
    negotiations: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
}

pub struct FakeBackend {
    pub url: Url,
    hub_tx: broadcast::Sender<String>,
    negotiations: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub async fn spawn(options: FakeOptions) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);
        let (hub_tx, _) = broadcast::channel(64);
        let negotiations = Arc::new(AtomicUsize::new(0));
        let connections = Arc::new(AtomicUsize::new(0));

        let state = AppState {
            base_url: base_url.clone(),
            options,
            hub_tx: hub_tx.clone(),
            negotiations: negotiations.clone(),
            connections: connections.clone(),
        };

        let app = Router::new()
            .route("/api/connection-info", get(connection_info))
            .route("/api/authen/login", post(login))
            .route("/api/authen/revoke-token", post(revoke))
            .route("/:tenant/hubs/botagent/negotiate", post(negotiate))
            .route("/:tenant/hubs/botagent", get(hub_socket))
            .route("/:tenant/api/agents", get(list_agents))
            .route("/:tenant/api/agents/:id", get(get_agent))
            .route("/:tenant/api/executions", get(list_executions))
            .route("/:tenant/api/assets", get(assets_unauthorized))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: Url::parse(&base_url).unwrap(),
            hub_tx,
            negotiations,
            connections,
        }
    }

    /// Send frames to every connected hub client.
    pub fn push(&self, frames: &[Value]) {
        let mut text = String::new();
        for frame in frames {
            text.push_str(&frame.to_string());
            text.push(RS);
        }
        let _ = self.hub_tx.send(text);
    }

    pub fn negotiations(&self) -> usize {
        self.negotiations.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Unsigned JWT expiring `secs_from_now` seconds from now.
pub fn jwt(secs_from_now: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + secs_from_now;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"sub":"{}","exp":{}}}"#,
        GOOD_TOKEN_SUB, exp
    ));
    format!("{}.{}.sig", header, payload)
}

pub fn invocation(target: &str, argument: Value) -> Value {
    json!({"type": 1, "target": target, "arguments": [argument]})
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token != "revoked")
}

async fn connection_info(State(state): State<AppState>) -> Response {
    if state.options.connection_info_status != StatusCode::OK {
        return (state.options.connection_info_status, "discovery unavailable").into_response();
    }
    Json(json!({"apiUrl": state.base_url})).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "correct-horse" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid email or password"})),
        )
            .into_response();
    }
    Json(json!({
        "id": "u1",
        "email": body["email"],
        "firstName": "Ops",
        "lastName": "Team",
        "systemRole": 0,
        "token": jwt(3600),
        "refreshToken": "refresh-1",
        "refreshTokenExpiration": "2099-01-01T00:00:00Z"
    }))
    .into_response()
}

async fn revoke() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn negotiate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.negotiations.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "connectionId": "conn-1",
        "connectionToken": "conn-token-1",
        "negotiateVersion": 1,
        "availableTransports": [
            {"transport": "WebSockets", "transferFormats": ["Text", "Binary"]}
        ]
    }))
    .into_response()
}

async fn hub_socket(
    State(state): State<AppState>,
    Path(_tenant): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let rx = state.hub_tx.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| serve_hub(socket, rx))
}

async fn serve_hub(mut socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    // Handshake: client speaks first.
    match socket.recv().await {
        Some(Ok(Message::Text(text))) if text.contains("\"protocol\":\"json\"") => {}
        _ => return,
    }
    if socket.send(Message::Text(format!("{{}}{}", RS))).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            pushed = rx.recv() => match pushed {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn list_agents(Path(tenant): Path<String>, headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "@odata.count": 2,
        "value": [
            {"id": "a1", "name": format!("{}-runner-1", tenant), "machineName": "host-1", "status": "Available", "isActive": true},
            {"id": "a2", "name": format!("{}-runner-2", tenant), "machineName": "host-2", "status": "Offline", "isActive": true}
        ]
    }))
    .into_response()
}

async fn get_agent(Path((_tenant, id)): Path<(String, String)>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": format!("Agent {} not found", id)})),
    )
        .into_response()
}

async fn list_executions() -> Response {
    Json(json!([
        {"id": "e1", "botAgentId": "a1", "packageName": "Invoices", "status": "Running"}
    ]))
    .into_response()
}

async fn assets_unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Token expired"})),
    )
        .into_response()
}
