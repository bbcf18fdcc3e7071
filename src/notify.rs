//! Toast notifications and error routing.
//!
//! Two tiers:
//!
//! - [`Notifier::report_unhandled`] / [`Notifier::report_rejection`]: the
//!   catch-all for errors nothing else handled. API-shaped errors get a
//!   status-specific title, anything else a generic one.
//! - [`Notifier::api_error`]: call sites that know what they were doing
//!   and want that in the message.
//!
//! 401 never produces a toast: the session teardown handles it. Every other
//! reported error produces exactly one.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{ApiError, SessionError};

const GENERIC_TITLE: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Where toasts are displayed.
pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Forwards toasts to a UI task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Toast>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Toast>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ToastSink for ChannelSink {
    fn show(&self, toast: Toast) {
        if self.tx.send(toast).is_err() {
            tracing::debug!("toast receiver gone");
        }
    }
}

/// Keeps every toast, for assertions.
#[derive(Debug, Default)]
pub struct CollectingSink {
    toasts: Mutex<Vec<Toast>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ToastSink for CollectingSink {
    fn show(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(toast);
    }
}

/// Toasts as log lines (headless use).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ToastSink for TracingSink {
    fn show(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => {
                tracing::error!(title = %toast.title, "{}", toast.description)
            }
            ToastLevel::Warning => {
                tracing::warn!(title = %toast.title, "{}", toast.description)
            }
            ToastLevel::Success | ToastLevel::Info => {
                tracing::info!(title = %toast.title, "{}", toast.description)
            }
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn ToastSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn ToastSink>) -> Self {
        Self { sink }
    }

    /// Catch-all for an unhandled error. Returns whether a toast was shown.
    pub fn report_unhandled(&self, error: &anyhow::Error) -> bool {
        match find_api_error(error) {
            Some(api) => self.route_api_error(api, None),
            None => {
                tracing::warn!(error = %format!("{:#}", error), "unhandled error");
                self.sink.show(Toast::error(GENERIC_TITLE, error.to_string()));
                true
            }
        }
    }

    /// Catch-all for a rejected value that may or may not be an API error.
    pub fn report_rejection(&self, value: &serde_json::Value) -> bool {
        if let Some(api) = ApiError::from_value(value) {
            return self.route_api_error(&api, None);
        }
        let description = match value {
            serde_json::Value::String(text) => text.clone(),
            other => other
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "An unexpected error occurred".to_string()),
        };
        tracing::warn!(rejection = %value, "unhandled rejection");
        self.sink.show(Toast::error(GENERIC_TITLE, description));
        true
    }

    /// Contextual report: `context` says what was being attempted.
    pub fn api_error(&self, error: &ApiError, context: &str) -> bool {
        self.route_api_error(error, Some(context))
    }

    pub fn success(&self, title: &str, description: &str) {
        self.sink.show(Toast::success(title, description));
    }

    fn route_api_error(&self, error: &ApiError, context: Option<&str>) -> bool {
        if error.is_unauthorized() {
            tracing::debug!(message = %error.message, "401 not toasted");
            return false;
        }
        tracing::warn!(status = error.status, message = %error.message, context = ?context, "api error");
        let description = match context.filter(|c| !c.trim().is_empty()) {
            Some(context) => format!("{}: {}", context, error.message),
            None => error.message.clone(),
        };
        self.sink.show(Toast::error(error.class().title(), description));
        true
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

/// First `ApiError` anywhere in the chain, including one wrapped by a
/// session failure.
fn find_api_error(error: &anyhow::Error) -> Option<&ApiError> {
    error.chain().find_map(|cause| {
        cause.downcast_ref::<ApiError>().or_else(|| {
            match cause.downcast_ref::<SessionError>() {
                Some(SessionError::Api(api)) => Some(api),
                _ => None,
            }
        })
    })
}
