//! Live agent and execution status.
//!
//! A hub connection per tenant feeds two `StatusStore`s (agents keyed by
//! agent id, executions keyed by execution id). Payloads are normalized at
//! the boundary in [`message`]; the overlays in [`overlay`] write live
//! values onto REST snapshots.

pub mod discovery;
pub mod hub;
pub mod message;
pub mod overlay;
pub mod protocol;
pub mod retry;
pub mod store;
pub mod transport;

pub use discovery::discover_api_url;
pub use hub::{HubHandle, HubState, RealtimeHub, UpdateCallback};
pub use message::{normalize_status_update, NormalizeError};
pub use overlay::{apply_agent_statuses, apply_execution_statuses};
pub use retry::RetryPolicy;
pub use store::{StatusMap, StatusStore};
pub use transport::{HubConnector, HubTransport, WebSocketConnector};
