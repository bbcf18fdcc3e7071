//! Hub connection task.
//!
//! One spawned task per tenant subscription:
//!
//! ```text
//! token? ──no──► Disabled
//!   │
//! discover apiUrl ──fail──► Disabled
//!   │
//! open (negotiate + handshake) ──benign──► retry (start policy) ──► Disabled
//!   │                          └─other───► Disabled
//!   ▼
//! Connected ◄──────────────┐
//!   │ dropped              │
//!   ▼                      │
//! Reconnecting{n} ─────────┘ (reconnect policy, then Disabled)
//! ```
//!
//! Errors never escape the task: they are logged and folded into
//! `HubState`. The REST snapshot keeps working whatever happens here.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

use openautomate_types::{StatusChannel, StatusUpdate};

use super::discovery::discover_api_url;
use super::message::normalize_status_update;
use super::protocol::{
    handshake_request, hub_url, parse_handshake_response, parse_message, ping_frame,
    split_frames, HubMessage,
};
use super::store::StatusStore;
use super::transport::{HubConnector, HubTransport, WebSocketConnector};
use crate::auth::TokenProvider;
use crate::config::{ClientConfig, HubConfig};
use crate::error::HubError;

const MIN_KEEP_ALIVE: Duration = Duration::from_millis(100);

/// Called once per update that landed in a store.
pub type UpdateCallback = Arc<dyn Fn(StatusChannel, &StatusUpdate) + Send + Sync>;

/// Observable connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubState {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// No live updates; the reason is for display only.
    Disabled(String),
    Stopped,
}

impl HubState {
    pub fn is_live(&self) -> bool {
        matches!(self, HubState::Connected)
    }
}

/// Factory for per-tenant hub subscriptions.
#[derive(Clone)]
pub struct RealtimeHub {
    frontend_url: Url,
    api_url: Option<Url>,
    config: HubConfig,
    http: reqwest::Client,
    connector: Arc<dyn HubConnector>,
    tokens: Arc<dyn TokenProvider>,
}

impl RealtimeHub {
    pub fn new(config: &ClientConfig, http: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        let connector = Arc::new(WebSocketConnector::new(
            http.clone(),
            config.hub.connect_timeout,
        ));
        Self {
            frontend_url: config.frontend_url.clone(),
            api_url: config.api_url.clone(),
            config: config.hub.clone(),
            http,
            connector,
            tokens,
        }
    }

    /// Replace the transport (in-memory hubs, alternative WebSocket stacks).
    pub fn with_connector(mut self, connector: Arc<dyn HubConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Subscribe to live status for `tenant`.
    ///
    /// Returns immediately; the connection is established in the background.
    /// Must be called inside a tokio runtime.
    pub fn start(&self, tenant: &str, on_update: Option<UpdateCallback>) -> HubHandle {
        let agents = StatusStore::new(StatusChannel::Agent);
        let executions = StatusStore::new(StatusChannel::Execution);
        let (state_tx, state_rx) = watch::channel(HubState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = HubTask {
            tenant: tenant.to_string(),
            frontend_url: self.frontend_url.clone(),
            api_url: self.api_url.clone(),
            config: self.config.clone(),
            http: self.http.clone(),
            connector: self.connector.clone(),
            tokens: self.tokens.clone(),
            agents: agents.clone(),
            executions: executions.clone(),
            state: state_tx,
            on_update,
        };
        let join = tokio::spawn(task.run(shutdown_rx));

        HubHandle {
            agents,
            executions,
            state: state_rx,
            shutdown: shutdown_tx,
            task: Some(join),
        }
    }
}

/// Live subscription. Dropping it tears the connection down.
pub struct HubHandle {
    agents: StatusStore,
    executions: StatusStore,
    state: watch::Receiver<HubState>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl HubHandle {
    /// Agent id → latest agent status.
    pub fn agents(&self) -> &StatusStore {
        &self.agents
    }

    /// Execution id → latest execution status.
    pub fn executions(&self) -> &StatusStore {
        &self.executions
    }

    pub fn state(&self) -> HubState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<HubState> {
        self.state.clone()
    }

    /// Close the connection, cancel pending retries and wait for the task.
    ///
    /// The stores are closed first, so nothing lands after this is called.
    pub async fn shutdown(mut self) {
        self.signal_shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "hub task ended abnormally");
            }
        }
    }

    fn signal_shutdown(&self) {
        self.agents.close();
        self.executions.close();
        // Receiver gone means the task already finished.
        let _ = self.shutdown.send(true);
    }
}

impl Drop for HubHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.signal_shutdown();
        }
    }
}

impl std::fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubHandle")
            .field("state", &*self.state.borrow())
            .field("agents", &self.agents)
            .field("executions", &self.executions)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

struct HubTask {
    tenant: String,
    frontend_url: Url,
    api_url: Option<Url>,
    config: HubConfig,
    http: reqwest::Client,
    connector: Arc<dyn HubConnector>,
    tokens: Arc<dyn TokenProvider>,
    agents: StatusStore,
    executions: StatusStore,
    state: watch::Sender<HubState>,
    on_update: Option<UpdateCallback>,
}

/// An open, handshaken connection plus frames that arrived with the
/// handshake response.
struct HubSession {
    transport: Box<dyn HubTransport>,
    pending: Vec<String>,
}

enum SessionEnd {
    Shutdown,
    /// Dropped: eligible for reconnect.
    Lost(HubError),
    /// Server said not to come back.
    Closed(Option<String>),
}

enum LoopEvent {
    Shutdown,
    KeepAlive,
    Received(Result<Option<String>, HubError>),
}

enum FrameAction {
    Continue,
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
}

impl HubTask {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(tenant = %self.tenant, "hub task started");

        if self.tokens.access_token().is_none() {
            tracing::debug!(tenant = %self.tenant, "no auth token, live updates disabled");
            self.disable("not signed in");
            return;
        }

        let hub = match self.resolve_hub_url(&mut shutdown).await {
            Some(Ok(hub)) => hub,
            Some(Err(e)) => {
                self.log_failure(&e, "hub discovery failed");
                self.disable(e.to_string());
                return;
            }
            None => return self.stopped(),
        };

        let Some(mut session) = self.start_session(&hub, &mut shutdown).await else {
            return self.stop_unless_disabled();
        };

        loop {
            self.set_state(HubState::Connected);
            tracing::info!(tenant = %self.tenant, hub = %hub, "hub connected");

            match self.run_session(session, &mut shutdown).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Closed(error) => {
                    tracing::info!(tenant = %self.tenant, error = ?error, "hub closed by server");
                    self.disable(error.unwrap_or_else(|| "closed by server".to_string()));
                    return;
                }
                SessionEnd::Lost(e) => {
                    self.log_failure(&e, "hub connection lost");
                }
            }

            match self.reconnect(&hub, &mut shutdown).await {
                Some(next) => session = next,
                None => return self.stop_unless_disabled(),
            }
        }

        self.stopped();
    }

    /// `None` on shutdown.
    async fn resolve_hub_url(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Result<Url, HubError>> {
        let api_url = match &self.api_url {
            Some(url) => url.clone(),
            None => {
                let discovery =
                    discover_api_url(&self.http, &self.frontend_url, self.config.connect_timeout);
                let discovered = tokio::select! {
                    result = discovery => result,
                    _ = shutdown.changed() => return None,
                };
                match discovered {
                    Ok(url) => url,
                    Err(e) => return Some(Err(e)),
                }
            }
        };
        Some(hub_url(&api_url, &self.tenant))
    }

    /// First connection, retried under the start policy for benign errors.
    async fn start_session(
        &self,
        hub: &Url,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<HubSession> {
        let policy = self.config.start_retry;
        let mut attempt = 0;
        loop {
            let error = match self.open_or_shutdown(hub, shutdown).await? {
                Ok(session) => return Some(session),
                Err(e) => e,
            };
            self.log_failure(&error, "hub start failed");
            if !error.is_benign() {
                self.disable(error.to_string());
                return None;
            }

            attempt += 1;
            let Some(delay) = policy.delay_for(attempt) else {
                self.disable(error.to_string());
                return None;
            };
            tracing::debug!(tenant = %self.tenant, attempt, delay_ms = delay.as_millis() as u64, "retrying hub start");
            if !wait_or_shutdown(delay, shutdown).await {
                return None;
            }
        }
    }

    /// Reconnect after an established connection dropped.
    async fn reconnect(
        &self,
        hub: &Url,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<HubSession> {
        let policy = self.config.reconnect;
        let mut attempt = 1;
        loop {
            let Some(delay) = policy.delay_for(attempt) else {
                tracing::warn!(tenant = %self.tenant, attempts = attempt - 1, "hub reconnect attempts exhausted");
                self.disable("reconnect attempts exhausted");
                return None;
            };
            self.set_state(HubState::Reconnecting { attempt });
            if !wait_or_shutdown(delay, shutdown).await {
                return None;
            }

            match self.open_or_shutdown(hub, shutdown).await? {
                Ok(session) => return Some(session),
                Err(e) => {
                    self.log_failure(&e, "hub reconnect failed");
                    if !e.is_benign() {
                        self.disable(e.to_string());
                        return None;
                    }
                }
            }
            attempt += 1;
        }
    }

    /// `None` on shutdown.
    async fn open_or_shutdown(
        &self,
        hub: &Url,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Result<HubSession, HubError>> {
        if *shutdown.borrow() {
            return None;
        }
        tokio::select! {
            result = self.open(hub) => Some(result),
            _ = shutdown.changed() => None,
        }
    }

    async fn open(&self, hub: &Url) -> Result<HubSession, HubError> {
        // Read per attempt: the session may have refreshed the token.
        let token = self.tokens.access_token().ok_or(HubError::MissingToken)?;
        let mut transport = self.connector.connect(hub, &token).await?;

        let handshake =
            tokio::time::timeout(self.config.connect_timeout, handshake(transport.as_mut())).await;
        match handshake {
            Ok(Ok(pending)) => Ok(HubSession { transport, pending }),
            Ok(Err(e)) => {
                transport.close().await;
                Err(e)
            }
            Err(_) => {
                transport.close().await;
                Err(HubError::Timeout)
            }
        }
    }

    async fn run_session(
        &self,
        session: HubSession,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let HubSession {
            mut transport,
            pending,
        } = session;

        let keep_alive = self.config.keep_alive_interval.max(MIN_KEEP_ALIVE);
        let mut ticker = tokio::time::interval_at(Instant::now() + keep_alive, keep_alive);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_seen = Instant::now();

        for frame in &pending {
            if let Some(end) = self.handle_frame(frame, transport.as_mut()).await {
                return end;
            }
        }

        loop {
            let event = tokio::select! {
                _ = shutdown.changed() => LoopEvent::Shutdown,
                _ = ticker.tick() => LoopEvent::KeepAlive,
                received = transport.recv() => LoopEvent::Received(received),
            };

            match event {
                LoopEvent::Shutdown => {
                    transport.close().await;
                    return SessionEnd::Shutdown;
                }
                LoopEvent::KeepAlive => {
                    if last_seen.elapsed() >= self.config.server_timeout {
                        transport.close().await;
                        return SessionEnd::Lost(HubError::Timeout);
                    }
                    if let Err(e) = transport.send(ping_frame()).await {
                        return SessionEnd::Lost(e);
                    }
                }
                LoopEvent::Received(Ok(Some(text))) => {
                    last_seen = Instant::now();
                    for frame in split_frames(&text) {
                        if let Some(end) = self.handle_frame(frame, transport.as_mut()).await {
                            return end;
                        }
                    }
                }
                LoopEvent::Received(Ok(None)) => {
                    return SessionEnd::Lost(HubError::Network(
                        "connection closed by peer".to_string(),
                    ));
                }
                LoopEvent::Received(Err(e)) => return SessionEnd::Lost(e),
            }
        }
    }

    async fn handle_frame(
        &self,
        frame: &str,
        transport: &mut dyn HubTransport,
    ) -> Option<SessionEnd> {
        match self.dispatch_frame(frame) {
            FrameAction::Continue => None,
            FrameAction::Ping => match transport.send(ping_frame()).await {
                Ok(()) => None,
                Err(e) => Some(SessionEnd::Lost(e)),
            },
            FrameAction::Close {
                error,
                allow_reconnect,
            } => {
                transport.close().await;
                Some(if allow_reconnect {
                    SessionEnd::Lost(HubError::ServerClosed(error))
                } else {
                    SessionEnd::Closed(error)
                })
            }
        }
    }

    fn dispatch_frame(&self, frame: &str) -> FrameAction {
        let message = match parse_message(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(tenant = %self.tenant, error = %e, "skipping hub frame");
                return FrameAction::Continue;
            }
        };

        match message {
            HubMessage::Invocation { target, arguments } => {
                match StatusChannel::from_hub_method(&target) {
                    Some(channel) => {
                        for argument in &arguments {
                            self.deliver(channel, argument);
                        }
                    }
                    None => tracing::trace!(method = %target, "ignoring hub method"),
                }
                FrameAction::Continue
            }
            HubMessage::Ping => FrameAction::Ping,
            HubMessage::Close {
                error,
                allow_reconnect,
            } => FrameAction::Close {
                error,
                allow_reconnect,
            },
            HubMessage::Other(kind) => {
                tracing::trace!(kind, "ignoring hub message");
                FrameAction::Continue
            }
        }
    }

    fn deliver(&self, channel: StatusChannel, raw: &serde_json::Value) {
        let update = match normalize_status_update(channel, raw, Utc::now()) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(tenant = %self.tenant, error = %e, "dropping status payload");
                return;
            }
        };

        let store = match channel {
            StatusChannel::Agent => &self.agents,
            StatusChannel::Execution => &self.executions,
        };
        if !store.apply(update.clone()) {
            return;
        }
        tracing::debug!(
            tenant = %self.tenant,
            channel = ?channel,
            key = update.key(channel).unwrap_or_default(),
            status = %update.status,
            "status update"
        );
        if let Some(callback) = &self.on_update {
            callback(channel, &update);
        }
    }

    fn log_failure(&self, error: &HubError, what: &str) {
        if error.is_benign() {
            tracing::debug!(tenant = %self.tenant, error = %error, "{}", what);
        } else {
            tracing::error!(tenant = %self.tenant, error = %error, "{}", what);
        }
    }

    fn set_state(&self, state: HubState) {
        self.state.send_replace(state);
    }

    fn disable(&self, reason: impl Into<String>) {
        self.set_state(HubState::Disabled(reason.into()));
    }

    fn stopped(&self) {
        self.set_state(HubState::Stopped);
        tracing::info!(tenant = %self.tenant, "hub task stopped");
    }

    fn stop_unless_disabled(&self) {
        if !matches!(*self.state.borrow(), HubState::Disabled(_)) {
            self.stopped();
        }
    }
}

async fn handshake(transport: &mut dyn HubTransport) -> Result<Vec<String>, HubError> {
    transport.send(handshake_request()).await?;
    let text = transport
        .recv()
        .await?
        .ok_or_else(|| HubError::Handshake("connection closed during handshake".to_string()))?;
    let mut frames = split_frames(&text);
    let first = frames
        .next()
        .ok_or_else(|| HubError::Handshake("empty handshake response".to_string()))?;
    parse_handshake_response(first)?;
    Ok(frames.map(str::to_string).collect())
}

/// `false` when shutdown arrived first.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.changed() => false,
    }
}
