//! Real-time Types
//!
//! Canonical status record produced from hub messages. Hub payloads arrive
//! with inconsistent field casing; they are normalized into `StatusUpdate`
//! before anything else sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hub methods the server invokes on the client.
pub const BOT_STATUS_UPDATE: &str = "BotStatusUpdate";
pub const EXECUTION_STATUS_UPDATE: &str = "ExecutionStatusUpdate";

/// Which stream a status update belongs to, and therefore what it is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChannel {
    /// Keyed by bot agent id.
    Agent,
    /// Keyed by execution id.
    Execution,
}

impl StatusChannel {
    /// Hub method carrying this channel's updates.
    pub fn hub_method(&self) -> &'static str {
        match self {
            StatusChannel::Agent => BOT_STATUS_UPDATE,
            StatusChannel::Execution => EXECUTION_STATUS_UPDATE,
        }
    }

    pub fn from_hub_method(method: &str) -> Option<Self> {
        if method.eq_ignore_ascii_case(BOT_STATUS_UPDATE) {
            Some(StatusChannel::Agent)
        } else if method.eq_ignore_ascii_case(EXECUTION_STATUS_UPDATE) {
            Some(StatusChannel::Execution)
        } else {
            None
        }
    }
}

/// Canonical status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default)]
    pub bot_agent_id: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusUpdate {
    /// Key this update is merged under for the given channel.
    pub fn key(&self, channel: StatusChannel) -> Option<&str> {
        match channel {
            StatusChannel::Agent => self.bot_agent_id.as_deref(),
            StatusChannel::Execution => self.execution_id.as_deref(),
        }
    }
}
