//! Shared API Types for OpenAutomate
//!
//! This crate is the SINGLE SOURCE OF TRUTH for all types crossing the
//! HTTP and hub boundaries of the OpenAutomate client.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐  JSON / REST   ┌──────────────────┐
//! │  OpenAutomate    │ ◄────────────► │  Client core     │
//! │  backend (.NET)  │  SignalR hub   │  (openautomate)  │
//! └──────────────────┘ ─────────────► └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. All API types live here - no inline struct definitions in clients
//! 2. camelCase on the wire (`#[serde(rename_all = "camelCase")]`)
//! 3. Identifiers as strings (the backend mixes GUIDs and slugs)

pub mod account;
pub mod admin;
pub mod automation;
pub mod permissions;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use account::*;
pub use admin::*;
pub use automation::*;
pub use permissions::*;
pub use realtime::*;

// ============================================================================
// COMMON
// ============================================================================

/// Response of the front end's backend-discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub api_url: String,
}

/// Error body returned by the backend.
///
/// The backend is inconsistent: controllers return `{ "message": ... }`,
/// model validation returns ProblemDetails (`title` / `detail` / `errors`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Best human-readable message the body carries.
    pub fn best_message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.detail.clone())
            .or_else(|| self.title.clone())
            .filter(|m| !m.trim().is_empty())
    }
}

/// OData collection envelope used by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataPage<T> {
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
    pub value: Vec<T>,
}

/// List endpoints return either a bare array or an OData envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Page(ODataPage<T>),
    Items(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Page(page) => page.value,
            ListResponse::Items(items) => items,
        }
    }

    /// Total count when the server reported one, otherwise the item count.
    pub fn total(&self) -> u64 {
        match self {
            ListResponse::Page(page) => page.count.unwrap_or(page.value.len() as u64),
            ListResponse::Items(items) => items.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_accepts_both_shapes() {
        let bare: ListResponse<u32> = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(bare.total(), 3);
        assert_eq!(bare.into_items(), vec![1, 2, 3]);

        let page: ListResponse<u32> =
            serde_json::from_str(r#"{"@odata.count": 40, "value": [1, 2]}"#).unwrap();
        assert_eq!(page.total(), 40);
        assert_eq!(page.into_items(), vec![1, 2]);
    }

    #[test]
    fn test_error_body_prefers_message_over_problem_details() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"title": "One or more validation errors occurred.", "detail": "Name is required"}"#,
        )
        .unwrap();
        assert_eq!(body.best_message().as_deref(), Some("Name is required"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "Package not found", "title": "x"}"#).unwrap();
        assert_eq!(body.best_message().as_deref(), Some("Package not found"));

        let empty: ErrorBody = serde_json::from_str(r#"{"message": "  "}"#).unwrap();
        assert_eq!(empty.best_message(), None);
    }
}
