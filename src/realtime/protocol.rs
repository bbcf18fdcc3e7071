//! SignalR JSON hub protocol, client side.
//!
//! Only what a receive-mostly client needs: negotiate, handshake, record
//! framing, and the Invocation / Ping / Close message types.
//!
//! ```text
//! POST {hub}/negotiate?negotiateVersion=1     -> { connectionToken, ... }
//! WS   {hub}?id={token}&access_token={jwt}
//! C->S {"protocol":"json","version":1}<RS>
//! S->C {}<RS>
//! S->C {"type":1,"target":"BotStatusUpdate","arguments":[{...}]}<RS>
//! ```

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::HubError;

/// Frame terminator.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const MESSAGE_INVOCATION: u64 = 1;
const MESSAGE_PING: u64 = 6;
const MESSAGE_CLOSE: u64 = 7;

/// Negotiate response (v0 and v1 servers).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub connection_token: Option<String>,
    #[serde(default)]
    pub negotiate_version: Option<u32>,
    #[serde(default)]
    pub available_transports: Vec<AvailableTransport>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTransport {
    pub transport: String,
    #[serde(default)]
    pub transfer_formats: Vec<String>,
}

impl NegotiateResponse {
    /// Id to put on the WebSocket URL: v1 servers use the token, v0 the id.
    pub fn connection_id(&self) -> Result<&str, HubError> {
        if let Some(error) = &self.error {
            return Err(HubError::Negotiation(error.clone()));
        }
        if !self.supports_websockets() {
            return Err(HubError::Negotiation(
                "server does not offer the WebSockets transport".to_string(),
            ));
        }
        self.connection_token
            .as_deref()
            .or(self.connection_id.as_deref())
            .ok_or_else(|| HubError::Negotiation("response carried no connection id".to_string()))
    }

    fn supports_websockets(&self) -> bool {
        // Servers that skip transport listing accept WebSockets.
        self.available_transports.is_empty()
            || self
                .available_transports
                .iter()
                .any(|t| t.transport.eq_ignore_ascii_case("WebSockets"))
    }
}

/// Parsed server-to-client message.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation { target: String, arguments: Vec<Value> },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Completion, stream items and anything newer: ignored by this client.
    Other(u64),
}

/// `{apiUrl}/{tenant}/hubs/botagent`
pub fn hub_url(api_url: &Url, tenant: &str) -> Result<Url, HubError> {
    let base = api_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{}/{}/hubs/botagent", base, tenant))
        .map_err(|e| HubError::Discovery(format!("invalid hub URL: {}", e)))
}

pub fn negotiate_url(hub: &Url) -> Url {
    let mut url = hub.clone();
    url.set_path(&format!("{}/negotiate", hub.path().trim_end_matches('/')));
    url.query_pairs_mut().append_pair("negotiateVersion", "1");
    url
}

/// WebSocket endpoint for a negotiated connection.
pub fn websocket_url(hub: &Url, connection_id: &str, access_token: &str) -> Result<Url, HubError> {
    let mut url = hub.clone();
    let scheme = match hub.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| HubError::Discovery(format!("cannot use {} for a WebSocket", hub)))?;
    url.query_pairs_mut()
        .append_pair("id", connection_id)
        .append_pair("access_token", access_token);
    Ok(url)
}

fn frame(value: Value) -> String {
    let mut text = value.to_string();
    text.push(RECORD_SEPARATOR);
    text
}

pub fn handshake_request() -> String {
    frame(json!({"protocol": "json", "version": 1}))
}

pub fn ping_frame() -> String {
    frame(json!({"type": MESSAGE_PING}))
}

/// Split a transport message into protocol frames.
pub fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty())
}

/// `{}` accepts the handshake; `{"error": ...}` rejects it.
pub fn parse_handshake_response(frame: &str) -> Result<(), HubError> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| HubError::Handshake(format!("malformed handshake response: {}", e)))?;
    match value.get("error").and_then(Value::as_str) {
        Some(error) => Err(HubError::Handshake(error.to_string())),
        None => Ok(()),
    }
}

pub fn parse_message(frame: &str) -> Result<HubMessage, HubError> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| HubError::Protocol(format!("malformed frame: {}", e)))?;
    let message_type = value
        .get("type")
        .and_then(Value::as_u64)
        .ok_or_else(|| HubError::Protocol("frame has no message type".to_string()))?;

    Ok(match message_type {
        MESSAGE_INVOCATION => {
            let target = value
                .get("target")
                .and_then(Value::as_str)
                .ok_or_else(|| HubError::Protocol("invocation without target".to_string()))?
                .to_string();
            let arguments = value
                .get("arguments")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            HubMessage::Invocation { target, arguments }
        }
        MESSAGE_PING => HubMessage::Ping,
        MESSAGE_CLOSE => HubMessage::Close {
            error: value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string),
            allow_reconnect: value
                .get("allowReconnect")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        other => HubMessage::Other(other),
    })
}
