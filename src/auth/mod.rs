//! Authentication and session state.
//!
//! One `SessionStore` owns the token, the signed-in user and the selected
//! tenant, with explicit `init` (read what was persisted) and teardown
//! (`logout` / `token_expired`). Everything that needs a bearer token asks a
//! `TokenProvider` rather than reaching into the store.

pub mod jwt;
pub mod session;
pub mod storage;

pub use session::{PersistedSession, SessionEvent, SessionStore};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};

/// Source of the current bearer token.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;

    /// The backend answered 401 to a request carrying this provider's token.
    fn token_rejected(&self) {}
}

/// Fixed token, for service accounts and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// No credentials at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl TokenProvider for Anonymous {
    fn access_token(&self) -> Option<String> {
        None
    }
}
