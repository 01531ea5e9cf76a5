//! Admin Session Store
//!
//! Holds the admin bearer token and drives the three-stage admin gate:
//!
//! 1. **Warning**: an "admin only" interstitial that must be acknowledged
//! 2. **Login**: username/password form
//! 3. **Dashboard**: authenticated views
//!
//! The token is persisted under [`ADMIN_TOKEN_KEY`]. A restored token still
//! lands on the warning stage; the dashboard is only reachable once the
//! warning has been acknowledged or a fresh login succeeded.

use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::local_storage::{LocalStorage, ADMIN_TOKEN_KEY};
use crate::remote::AuthClient;
use crate::routes::Route;

/// Shown when the username field is empty
pub const USERNAME_REQUIRED: &str = "Please enter your username";

/// Shown when the password field is empty
pub const PASSWORD_REQUIRED: &str = "Please enter your password";

/// Shown when an authenticated action runs without a session
pub const NOT_LOGGED_IN: &str = "Please log in first";

/// In-memory session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    /// The admin warning was acknowledged or a login succeeded
    pub login_confirmed: bool,
}

/// Which admin view is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Warning,
    Login,
    Dashboard,
}

impl Session {
    pub fn stage(&self) -> LoginStage {
        match (self.login_confirmed, self.token.is_some()) {
            (false, _) => LoginStage::Warning,
            (true, false) => LoginStage::Login,
            (true, true) => LoginStage::Dashboard,
        }
    }
}

/// Session state plus its persistence and auth collaborators
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
    auth: AuthClient,
    session: Session,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStorage>, auth: AuthClient) -> Self {
        Self {
            storage,
            auth,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stage(&self) -> LoginStage {
        self.session.stage()
    }

    /// Rehydrate from storage; a stored token starts unconfirmed
    pub fn restore(&mut self) -> ClientResult<()> {
        let token = self
            .storage
            .get_item(ADMIN_TOKEN_KEY)?
            .filter(|t| !t.is_empty());

        tracing::debug!(restored = token.is_some(), "Restored admin session");

        self.session = Session {
            token,
            login_confirmed: false,
        };
        Ok(())
    }

    /// Pass the admin-only warning
    pub fn acknowledge_warning(&mut self) -> LoginStage {
        self.session.login_confirmed = true;
        self.session.stage()
    }

    /// Log in; on failure the session is left untouched
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<String> {
        if username.trim().is_empty() {
            return Err(ClientError::required(USERNAME_REQUIRED));
        }
        if password.is_empty() {
            return Err(ClientError::required(PASSWORD_REQUIRED));
        }

        let token = self.auth.login(username, password).await?;
        self.storage.set_item(ADMIN_TOKEN_KEY, &token)?;

        self.session = Session {
            token: Some(token.clone()),
            login_confirmed: true,
        };

        tracing::info!(username, "Admin logged in");
        Ok(token)
    }

    /// Clear the session and the persisted token; navigates to the landing page
    pub fn logout(&mut self) -> ClientResult<Route> {
        self.session = Session::default();
        self.storage.remove_item(ADMIN_TOKEN_KEY)?;

        tracing::info!("Admin logged out");
        Ok(Route::Landing)
    }

    /// Token to attach to authenticated requests
    ///
    /// Expiry is not checked here; a stale token shows up as a server error.
    pub fn bearer(&self) -> ClientResult<&str> {
        match (self.stage(), self.session.token.as_deref()) {
            (LoginStage::Dashboard, Some(token)) => Ok(token),
            _ => Err(ClientError::required(NOT_LOGGED_IN)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_storage::MemoryStorage;
    use crate::remote::ApiClient;
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    fn store() -> (Arc<MemoryStorage>, Arc<MockTransport>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let transport = Arc::new(MockTransport::new());
        let auth = AuthClient::new(ApiClient::new(transport.clone()));
        let store = SessionStore::new(storage.clone(), auth);
        (storage, transport, store)
    }

    #[tokio::test]
    async fn test_login_logout_restore_cycle() {
        let (storage, transport, mut store) = store();
        transport.respond(200, json!({ "access_token": "tok-9" }));

        assert_eq!(store.stage(), LoginStage::Warning);
        assert_eq!(store.acknowledge_warning(), LoginStage::Login);

        store.login("admin", "pw").await.unwrap();
        assert_eq!(store.stage(), LoginStage::Dashboard);
        assert_eq!(store.bearer().unwrap(), "tok-9");
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap().as_deref(), Some("tok-9"));

        assert_eq!(store.logout().unwrap(), Route::Landing);
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.session(), &Session::default());

        store.restore().unwrap();
        assert_eq!(store.session().token, None);
        assert!(store.bearer().is_err());
    }

    #[tokio::test]
    async fn test_restore_requires_warning_acknowledgement() {
        let (storage, _transport, mut store) = store();
        storage.set_item(ADMIN_TOKEN_KEY, "persisted").unwrap();

        store.restore().unwrap();
        assert_eq!(store.session().token.as_deref(), Some("persisted"));
        assert_eq!(store.stage(), LoginStage::Warning);
        assert_eq!(store.bearer().unwrap_err().to_string(), NOT_LOGGED_IN);

        assert_eq!(store.acknowledge_warning(), LoginStage::Dashboard);
        assert_eq!(store.bearer().unwrap(), "persisted");
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session() {
        let (storage, transport, mut store) = store();
        transport.respond(401, json!({ "detail": "Invalid credentials" }));
        store.acknowledge_warning();
        let before = store.session().clone();

        let err = store.login("admin", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(store.session(), &before);
        assert_eq!(storage.get_item(ADMIN_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_required_fields() {
        let (_storage, transport, mut store) = store();

        let err = store.login("", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), USERNAME_REQUIRED);
        let err = store.login("admin", "").await.unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_REQUIRED);

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_login_network_error() {
        let (_storage, transport, mut store) = store();
        transport.fail("dns error");

        let err = store.login("admin", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Network error: dns error");
    }
}
