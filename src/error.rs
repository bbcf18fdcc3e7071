//! Error types for the OpenAutomate client
//!
//! `ApiError` is the one shape every failed backend call is reduced to
//! (`status` + `message`), so the notifier can route it without knowing
//! which call failed. The remaining enums cover configuration, the session
//! store and the real-time hub.

use std::fmt;

use thiserror::Error;

/// Failed backend call.
///
/// `status` is the HTTP status code, or `0` when no response was received.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} ({}): {}", StatusClass::from_status(*.status), .status, .message)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Transport failure, no HTTP response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Recognize an API-error shape inside an arbitrary JSON value.
    ///
    /// Requires a numeric `status` and a string `message`; anything else is
    /// not an API error.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let status = obj.get("status")?.as_u64()?;
        let status = u16::try_from(status).ok()?;
        let message = obj.get("message")?.as_str()?;
        let mut error = Self::new(status, message);
        if let Some(details) = obj.get("details") {
            error.details = Some(details.clone());
        }
        Some(error)
    }

    pub fn class(&self) -> StatusClass {
        StatusClass::from_status(self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => ApiError::new(status.as_u16(), error.to_string()),
            None if error.is_timeout() => ApiError::network("Request timed out"),
            None if error.is_decode() => {
                ApiError::new(200, format!("Unexpected response body: {}", error))
            }
            None => ApiError::network(error.to_string()),
        }
    }
}

/// Classification of an API status code, used for toast titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Network,
    InvalidRequest,
    Unauthorized,
    AccessDenied,
    NotFound,
    Conflict,
    Validation,
    RateLimited,
    OtherClient,
    Server,
    /// 1xx-3xx surfaced as an error (unexpected body, redirect loop).
    Unexpected,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => StatusClass::Network,
            400 => StatusClass::InvalidRequest,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::AccessDenied,
            404 => StatusClass::NotFound,
            409 => StatusClass::Conflict,
            422 => StatusClass::Validation,
            429 => StatusClass::RateLimited,
            402..=499 => StatusClass::OtherClient,
            500..=599 => StatusClass::Server,
            _ => StatusClass::Unexpected,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StatusClass::Network => "Network Error",
            StatusClass::InvalidRequest => "Invalid Request",
            StatusClass::Unauthorized => "Unauthorized",
            StatusClass::AccessDenied => "Access Denied",
            StatusClass::NotFound => "Not Found",
            StatusClass::Conflict => "Conflict",
            StatusClass::Validation => "Validation Error",
            StatusClass::RateLimited => "Rate Limited",
            StatusClass::OtherClient => "Request Failed",
            StatusClass::Server => "Server Error",
            StatusClass::Unexpected => "Error",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid value '{value}' for {var}: expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Session store errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired")]
    Expired,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Tenant selection errors
#[derive(Error, Debug)]
pub enum TenantError {
    #[error("Invalid tenant slug '{0}'")]
    InvalidSlug(String),

    #[error("No organization unit '{0}' for this user")]
    NotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Real-time hub errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubError {
    #[error("Backend discovery failed: {0}")]
    Discovery(String),

    #[error("No auth token available")]
    MissingToken,

    #[error("Hub connection timed out")]
    Timeout,

    #[error("Hub negotiation failed: {0}")]
    Negotiation(String),

    #[error("Hub rejected credentials")]
    Unauthorized,

    #[error("Hub network error: {0}")]
    Network(String),

    #[error("Hub handshake failed: {0}")]
    Handshake(String),

    #[error("Hub protocol error: {0}")]
    Protocol(String),

    #[error("Hub closed the connection{}", .0.as_ref().map(|e| format!(": {}", e)).unwrap_or_default())]
    ServerClosed(Option<String>),
}

impl HubError {
    /// Expected transport failures: logged at debug and retried.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            HubError::Timeout
                | HubError::Negotiation(_)
                | HubError::Unauthorized
                | HubError::Network(_)
        )
    }
}
