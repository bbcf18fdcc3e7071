//! Client configuration.
//!
//! Loaded once at startup from environment variables (a `.env` file is
//! honoured by the binary through `dotenvy`). Every value has a default so
//! an empty environment yields a working local-development setup.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::realtime::RetryPolicy;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3001";
const DEFAULT_SESSION_FILE: &str = ".openautomate/session.json";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin serving `/api/connection-info`.
    pub frontend_url: Url,

    /// Backend base URL. When set, discovery is skipped.
    pub api_url: Option<Url>,

    /// Where the session store persists token and user.
    pub session_file: PathBuf,

    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,

    /// How long a cached query stays fresh.
    pub query_stale_time: Duration,

    /// Real-time hub settings.
    pub hub: HubConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frontend_url: Url::parse(DEFAULT_FRONTEND_URL).expect("default frontend URL is valid"),
            api_url: None,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            request_timeout: Duration::from_secs(30),
            query_stale_time: Duration::from_secs(30),
            hub: HubConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load from `OPENAUTOMATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let frontend_url = match env_string("OPENAUTOMATE_FRONTEND_URL") {
            Some(raw) => parse_url("OPENAUTOMATE_FRONTEND_URL", &raw)?,
            None => defaults.frontend_url,
        };
        let api_url = env_string("OPENAUTOMATE_API_URL")
            .map(|raw| parse_url("OPENAUTOMATE_API_URL", &raw))
            .transpose()?;
        let session_file = env_string("OPENAUTOMATE_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);
        let request_timeout = Duration::from_secs(env_u64(
            "OPENAUTOMATE_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )?);
        let query_stale_time = Duration::from_secs(env_u64(
            "OPENAUTOMATE_QUERY_STALE_SECS",
            defaults.query_stale_time.as_secs(),
        )?);

        let mut hub = defaults.hub;
        hub.start_retry.max_attempts = env_u32(
            "OPENAUTOMATE_HUB_START_RETRIES",
            hub.start_retry.max_attempts,
        )?;
        hub.start_retry.initial_delay = Duration::from_secs(env_u64(
            "OPENAUTOMATE_HUB_RETRY_DELAY_SECS",
            hub.start_retry.initial_delay.as_secs(),
        )?);

        Ok(Self {
            frontend_url,
            api_url,
            session_file,
            request_timeout,
            query_stale_time,
            hub,
        })
    }

    /// Override the discovery origin.
    pub fn with_frontend_url(mut self, url: Url) -> Self {
        self.frontend_url = url;
        self
    }

    /// Pin the backend URL and skip discovery.
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }
}

/// Real-time hub settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Retries when the first connection attempt fails with a benign error.
    pub start_retry: RetryPolicy,

    /// Reconnect schedule after an established connection drops.
    pub reconnect: RetryPolicy,

    /// Interval between client pings.
    pub keep_alive_interval: Duration,

    /// Server silence after which the connection is considered dead.
    pub server_timeout: Duration,

    /// Bound on discovery, negotiate and handshake.
    pub connect_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            start_retry: RetryPolicy::fixed(1, Duration::from_secs(5)),
            reconnect: RetryPolicy::exponential(
                10,
                Duration::from_secs(1),
                Duration::from_secs(60),
            ),
            keep_alive_interval: Duration::from_secs(15),
            server_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_string(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: name,
            value: raw,
            expected: "a non-negative integer",
        }),
        None => Ok(default),
    }
}

fn env_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let value = env_u64(name, u64::from(default))?;
    u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
        var: name,
        value: value.to_string(),
        expected: "an integer no larger than 4294967295",
    })
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { var, source })
}
