//! OpenAutomate client core
//!
//! Headless core of the OpenAutomate web front end: session lifecycle,
//! tenant selection, typed REST access with a query cache, permission-gated
//! navigation, error-to-toast routing and the live agent/execution status
//! feed from the backend hub.
//!
//! ## Layout
//!
//! - [`config`]: client configuration loaded from the environment
//! - [`error`]: API error shape and crate error enums
//! - [`auth`]: session store with explicit init and teardown
//! - [`tenant`]: tenant slug handling and organization-unit selection
//! - [`api`]: fetch wrapper and typed resource clients
//! - [`cache`]: keyed query cache with stale-time and invalidation
//! - [`permissions`] / [`navigation`]: capability checks and nav pruning
//! - [`notify`]: toasts and the two-tier error reporter
//! - [`realtime`]: hub connection and the status merge

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod navigation;
pub mod notify;
pub mod permissions;
pub mod realtime;
pub mod tenant;

pub use openautomate_types as types;

pub use api::{AccountApi, ApiClient, ListQuery, TenantApi};
pub use auth::{SessionEvent, SessionStore, TokenProvider};
pub use cache::QueryCache;
pub use config::ClientConfig;
pub use error::{ApiError, HubError, SessionError, TenantError};
pub use navigation::{filter_navigation, NavItem};
pub use notify::{Notifier, Toast, ToastSink};
pub use realtime::{HubHandle, HubState, RealtimeHub, StatusStore};
pub use tenant::{tenant_from_path, TenantSelector};
