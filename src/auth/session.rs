//! Session store.
//!
//! Lifecycle:
//!
//! ```text
//! init() ──► [persisted, valid token] ──► Authenticated
//!        └─► [nothing / expired]      ──► Anonymous (TokenExpired if it was expired)
//! login()  ──► Authenticated (LoggedIn)
//! refresh()──► Authenticated (TokenRefreshed) | Anonymous (TokenExpired)
//! logout() ──► Anonymous (LoggedOut)
//! token_expired() ──► Anonymous (TokenExpired)
//! ```

use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use openautomate_types::{AuthResponse, LoginRequest, User};

use super::jwt;
use super::storage::TokenStorage;
use super::TokenProvider;
use crate::api::AccountApi;
use crate::error::SessionError;

const EVENT_CAPACITY: usize = 16;

/// What survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
    /// Last selected tenant slug.
    #[serde(default)]
    pub tenant: Option<String>,
}

impl PersistedSession {
    fn from_auth(auth: &AuthResponse, tenant: Option<String>) -> Self {
        Self {
            token: auth.token.clone(),
            refresh_token: auth.refresh_token.clone(),
            user: auth.user(),
            tenant,
        }
    }
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(User),
    TokenRefreshed,
    TenantSelected(String),
    LoggedOut,
    TokenExpired,
}

/// Process-wide session state with explicit lifecycle.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    storage: Box<dyn TokenStorage>,
    current: RwLock<Option<PersistedSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                storage: Box::new(storage),
                current: RwLock::new(None),
                events,
            }),
        }
    }

    /// Load the persisted session. An expired token is discarded.
    pub fn init(&self) -> Result<Option<User>, SessionError> {
        let Some(persisted) = self.inner.storage.load()? else {
            tracing::debug!("no persisted session");
            return Ok(None);
        };

        if jwt::is_expired(&persisted.token, Utc::now()) {
            tracing::info!(user = %persisted.user.email, "persisted token expired, discarding session");
            self.inner.storage.clear()?;
            self.set_current(None);
            self.emit(SessionEvent::TokenExpired);
            return Ok(None);
        }

        let user = persisted.user.clone();
        tracing::info!(user = %user.email, tenant = ?persisted.tenant, "session restored");
        self.set_current(Some(persisted));
        Ok(Some(user))
    }

    pub async fn login(
        &self,
        api: &AccountApi,
        email: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let auth = api.login(&request).await?;
        let persisted = PersistedSession::from_auth(&auth, None);
        self.inner.storage.save(&persisted)?;

        let user = persisted.user.clone();
        self.set_current(Some(persisted));
        tracing::info!(user = %user.email, "logged in");
        self.emit(SessionEvent::LoggedIn(user.clone()));
        Ok(user)
    }

    /// Exchange the refresh token. Any failure ends the session.
    pub async fn refresh(&self, api: &AccountApi) -> Result<(), SessionError> {
        let (refresh_token, tenant) = {
            let current = self.read();
            let session = current.as_ref().ok_or(SessionError::NotAuthenticated)?;
            let refresh = session
                .refresh_token
                .clone()
                .ok_or(SessionError::NoRefreshToken)?;
            (refresh, session.tenant.clone())
        };

        match api.refresh(&refresh_token).await {
            Ok(auth) => {
                let persisted = PersistedSession::from_auth(&auth, tenant);
                self.inner.storage.save(&persisted)?;
                self.set_current(Some(persisted));
                tracing::debug!("token refreshed");
                self.emit(SessionEvent::TokenRefreshed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, ending session");
                self.token_expired();
                Err(SessionError::Expired)
            }
        }
    }

    /// Teardown on user request. Server-side revoke is best effort.
    pub async fn logout(&self, api: Option<&AccountApi>) {
        let token = self.read().as_ref().and_then(|s| s.refresh_token.clone());
        if let (Some(api), Some(token)) = (api, token) {
            if let Err(e) = api.revoke(&token).await {
                tracing::debug!(error = %e, "token revoke failed");
            }
        }
        self.clear_local();
        tracing::info!("logged out");
        self.emit(SessionEvent::LoggedOut);
    }

    /// Teardown when the backend rejects the token.
    pub fn token_expired(&self) {
        if self.read().is_none() {
            return;
        }
        self.clear_local();
        tracing::info!("session expired");
        self.emit(SessionEvent::TokenExpired);
    }

    /// Remember the tenant the user is working in.
    pub fn select_tenant(&self, slug: &str) -> Result<(), SessionError> {
        let updated = {
            let mut current = self.write();
            let session = current.as_mut().ok_or(SessionError::NotAuthenticated)?;
            session.tenant = Some(slug.to_string());
            session.clone()
        };
        self.inner.storage.save(&updated)?;
        self.emit(SessionEvent::TenantSelected(slug.to_string()));
        Ok(())
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn tenant(&self) -> Option<String> {
        self.read().as_ref().and_then(|s| s.tenant.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn clear_local(&self) {
        if let Err(e) = self.inner.storage.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        self.set_current(None);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn set_current(&self, session: Option<PersistedSession>) {
        *self.write() = session;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<PersistedSession>> {
        self.inner.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<PersistedSession>> {
        self.inner.current.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenProvider for SessionStore {
    fn access_token(&self) -> Option<String> {
        self.read()
            .as_ref()
            .map(|s| s.token.clone())
            .filter(|token| !jwt::is_expired(token, Utc::now()))
    }

    fn token_rejected(&self) {
        self.token_expired();
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.read();
        f.debug_struct("SessionStore")
            .field("user", &current.as_ref().map(|s| &s.user.email))
            .field("tenant", &current.as_ref().and_then(|s| s.tenant.as_deref()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::token_with_exp;
    use crate::auth::storage::MemoryTokenStorage;
    use openautomate_types::SystemRole;

    fn persisted(token: String) -> PersistedSession {
        PersistedSession {
            token,
            refresh_token: Some("refresh".into()),
            user: User {
                id: "u1".into(),
                email: "ops@acme.test".into(),
                first_name: "Ops".into(),
                last_name: "Team".into(),
                system_role: SystemRole::User,
            },
            tenant: Some("acme".into()),
        }
    }

    fn in_one_hour() -> i64 {
        (Utc::now() + chrono::Duration::hours(1)).timestamp()
    }

    #[test]
    fn test_init_restores_valid_session() {
        let token = token_with_exp(in_one_hour());
        let store = SessionStore::new(MemoryTokenStorage::with_session(persisted(token.clone())));

        let user = store.init().unwrap().unwrap();
        assert_eq!(user.email, "ops@acme.test");
        assert_eq!(store.access_token(), Some(token));
        assert_eq!(store.tenant().as_deref(), Some("acme"));
    }

    #[test]
    fn test_init_discards_expired_token() {
        let expired = token_with_exp(Utc::now().timestamp() - 60);
        let store = SessionStore::new(MemoryTokenStorage::with_session(persisted(expired)));
        let mut events = store.events();

        assert!(store.init().unwrap().is_none());
        assert!(!store.is_authenticated());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::TokenExpired);
        assert!(store.inner.storage.load().unwrap().is_none());
    }

    #[test]
    fn test_token_expired_clears_once() {
        let store = SessionStore::new(MemoryTokenStorage::with_session(persisted(
            token_with_exp(in_one_hour()),
        )));
        store.init().unwrap();
        let mut events = store.events();

        store.token_expired();
        store.token_expired();

        assert!(store.user().is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::TokenExpired);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_select_tenant_requires_session() {
        let store = SessionStore::new(MemoryTokenStorage::new());
        assert!(matches!(
            store.select_tenant("acme"),
            Err(SessionError::NotAuthenticated)
        ));

        let store = SessionStore::new(MemoryTokenStorage::with_session(persisted(
            token_with_exp(in_one_hour()),
        )));
        store.init().unwrap();
        store.select_tenant("globex").unwrap();
        assert_eq!(store.tenant().as_deref(), Some("globex"));
        assert_eq!(
            store.inner.storage.load().unwrap().unwrap().tenant.as_deref(),
            Some("globex")
        );
    }

    #[tokio::test]
    async fn test_logout_without_api_clears_locally() {
        let store = SessionStore::new(MemoryTokenStorage::with_session(persisted(
            token_with_exp(in_one_hour()),
        )));
        store.init().unwrap();
        let mut events = store.events();

        store.logout(None).await;

        assert!(!store.is_authenticated());
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
