//! Hub transport: negotiate over HTTP, then a WebSocket carrying text frames.
//!
//! `HubConnector` is the seam the hub loop talks to, so the loop can be
//! driven by an in-memory transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::protocol::{negotiate_url, websocket_url, NegotiateResponse};
use crate::error::HubError;

/// Bidirectional text-frame transport.
#[async_trait]
pub trait HubTransport: Send {
    async fn send(&mut self, text: String) -> Result<(), HubError>;

    /// Next text message. `Ok(None)` when the peer closed the connection.
    async fn recv(&mut self) -> Result<Option<String>, HubError>;

    async fn close(&mut self);
}

/// Opens authenticated transports to a hub URL.
#[async_trait]
pub trait HubConnector: Send + Sync {
    async fn connect(&self, hub: &Url, access_token: &str)
        -> Result<Box<dyn HubTransport>, HubError>;
}

/// Negotiate + WebSocket connector.
#[derive(Clone)]
pub struct WebSocketConnector {
    http: reqwest::Client,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(http: reqwest::Client, connect_timeout: Duration) -> Self {
        Self {
            http,
            connect_timeout,
        }
    }

    async fn negotiate(&self, hub: &Url, access_token: &str) -> Result<String, HubError> {
        let response = self
            .http
            .post(negotiate_url(hub))
            .bearer_auth(access_token)
            .timeout(self.connect_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HubError::Timeout
                } else {
                    HubError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(HubError::Unauthorized);
        }
        if !status.is_success() {
            return Err(HubError::Negotiation(format!("HTTP {}", status)));
        }

        let body: NegotiateResponse = response
            .json()
            .await
            .map_err(|e| HubError::Negotiation(format!("unreadable response: {}", e)))?;
        body.connection_id().map(str::to_string)
    }
}

#[async_trait]
impl HubConnector for WebSocketConnector {
    async fn connect(
        &self,
        hub: &Url,
        access_token: &str,
    ) -> Result<Box<dyn HubTransport>, HubError> {
        let connection_id = self.negotiate(hub, access_token).await?;
        let url = websocket_url(hub, &connection_id, access_token)?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(map_ws_error)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| HubError::Unauthorized)?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| HubError::Timeout)?
                .map_err(map_ws_error)?;

        tracing::debug!(hub = %hub, "hub websocket open");
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl HubTransport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), HubError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(map_ws_error)
    }

    async fn recv(&mut self) -> Result<Option<String>, HubError> {
        while let Some(message) = self.stream.next().await {
            match message.map_err(map_ws_error)? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => {
                    let text = String::from_utf8(bytes).map_err(|_| {
                        HubError::Protocol("binary frame is not UTF-8 JSON".to_string())
                    })?;
                    return Ok(Some(text));
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "hub websocket close");
        }
    }
}

fn map_ws_error(error: tungstenite::Error) -> HubError {
    match error {
        tungstenite::Error::Http(response) if response.status().as_u16() == 401 => {
            HubError::Unauthorized
        }
        tungstenite::Error::Http(response) => {
            HubError::Negotiation(format!("WebSocket upgrade rejected: HTTP {}", response.status()))
        }
        tungstenite::Error::Io(e) => HubError::Network(e.to_string()),
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            HubError::Network("connection closed".to_string())
        }
        other => HubError::Protocol(other.to_string()),
    }
}
