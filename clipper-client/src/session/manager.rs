use std::sync::{Arc, Mutex};

use futures::FutureExt;
use shared::{
    config::TestLoginConfig,
    models::{TestLoginRequest, User},
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::state::SessionState;
use crate::{
    services::{Collaborators, IdentifyProperties},
    unauthorized::{RegistrationId, UnauthorizedHook},
};

/// Analytics event emitted at the start of every logout.
pub const LOGOUT_EVENT: &str = "logout";

/// Owns the current-user state and drives the session lifecycle.
///
/// Every mutation goes through a synchronous `send_modify`/`send_if_modified`
/// on the state channel, so guard checks and sets complete before the next
/// suspension point. No public operation returns an error: collaborator
/// failures are logged and resolved into a definite state.
pub struct SessionManager {
    state: watch::Sender<SessionState>,
    collaborators: Collaborators,
    test_login: TestLoginConfig,
    registration: Mutex<Option<RegistrationId>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .field("test_login_enabled", &self.test_login.enabled)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager in the bootstrapping state.
    ///
    /// `test_login` is captured once; later configuration changes are not seen.
    #[must_use]
    pub fn new(collaborators: Collaborators, test_login: TestLoginConfig) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        Arc::new(Self {
            state,
            collaborators,
            test_login,
            registration: Mutex::new(None),
        })
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every committed transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve once bootstrap has settled.
    pub async fn wait_until_loaded(&self) -> SessionState {
        let mut receiver = self.state.subscribe();
        if receiver.wait_for(|state| !state.is_loading()).await.is_err() {
            debug!("session state channel closed while waiting");
        }
        self.state()
    }

    /// Register as the HTTP layer's unauthorized handler.
    ///
    /// The handler only holds a weak reference, so the hook never keeps the
    /// manager alive.
    pub fn attach(self: &Arc<Self>, hook: &UnauthorizedHook) {
        let manager = Arc::downgrade(self);
        let id = hook.register(Arc::new(move || {
            let manager = manager.clone();
            async move {
                if let Some(manager) = manager.upgrade() {
                    manager.handle_unauthorized().await;
                }
            }
            .boxed()
        }));

        if let Ok(mut guard) = self.registration.lock() {
            *guard = Some(id);
        }
    }

    /// Remove this manager's handler from `hook`, if it is still installed.
    pub fn detach(&self, hook: &UnauthorizedHook) -> bool {
        let id = self
            .registration
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        id.is_some_and(|id| hook.unregister(id))
    }

    /// Initial session check. Runs at most once per manager.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) {
        let first = self.state.send_if_modified(|state| {
            if state.bootstrap_started {
                false
            } else {
                state.bootstrap_started = true;
                true
            }
        });
        if !first {
            debug!("bootstrap already ran; ignoring");
            return;
        }

        match self.collaborators.session.fetch_current_user().await {
            Ok(user) => self.apply_user(user),
            Err(err) => {
                debug!(error = %err, "no active session during bootstrap");
                self.clear_storage().await;
                match self.try_auto_login().await {
                    Some(user) => self.apply_user(user),
                    None => self.state.send_modify(SessionState::clear_user),
                }
            }
        }

        self.state.send_if_modified(SessionState::finish_loading);
        info!(phase = ?self.state.borrow().phase(), "session bootstrap settled");
    }

    /// Start the OAuth redirect flow.
    ///
    /// Returns the URL the user agent must visit, or `None` when the flow
    /// could not be started. Session state is untouched; the new session is
    /// picked up by the next bootstrap or refresh.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Option<Url> {
        match self.collaborators.session.initiate_oauth().await {
            Ok(url) => {
                info!(%url, "redirecting to OAuth provider");
                Some(url)
            }
            Err(err) => {
                warn!(error = %err, "failed to initiate OAuth login");
                None
            }
        }
    }

    /// Log out. Local state is always cleared, whatever the backend says.
    #[instrument(skip(self))]
    pub async fn logout(&self, current_path: Option<&str>) {
        let mut properties = serde_json::Map::new();
        if let Some(path) = current_path {
            properties.insert("page_path".to_string(), path.into());
        }
        self.collaborators
            .analytics
            .track_event(LOGOUT_EVENT, serde_json::Value::Object(properties));

        if let Err(err) = self.collaborators.session.logout().await {
            warn!(error = %err, "logout request failed; clearing local session anyway");
        }

        self.clear_storage().await;
        self.clear_identity();
        info!("logged out");
    }

    /// Re-fetch the current user. Failure leaves the session anonymous; it
    /// never falls back to test login.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        match self.collaborators.session.fetch_current_user().await {
            Ok(user) => self.apply_user(user),
            Err(err) if err.is_unauthorized() => {
                info!("session expired during refresh");
                self.clear_identity();
            }
            Err(err) => {
                warn!(error = %err, "session refresh failed");
                self.clear_identity();
            }
        }
    }

    /// Authorization-failure handler. Only the first call after an applied
    /// user does any work.
    #[instrument(skip(self))]
    pub async fn handle_unauthorized(&self) {
        let first = self.state.send_if_modified(|state| {
            if state.unauthorized_handled {
                false
            } else {
                state.unauthorized_handled = true;
                true
            }
        });
        if !first {
            debug!("unauthorized already handled");
            return;
        }

        warn!("request failed authorization; clearing session");
        self.clear_storage().await;
        self.clear_identity();
    }

    async fn try_auto_login(&self) -> Option<User> {
        if !self.test_login.enabled {
            return None;
        }

        let first = self.state.send_if_modified(|state| {
            if state.auto_login_attempted {
                false
            } else {
                state.auto_login_attempted = true;
                true
            }
        });
        if !first {
            debug!("automatic test login already attempted");
            return None;
        }

        let request = TestLoginRequest {
            username: self.test_login.username.clone(),
            user_id: self.test_login.user_id.clone(),
        };
        match self.collaborators.session.test_login(&request).await {
            Ok(user) => {
                info!(username = %user.username, "automatic test login succeeded");
                Some(user)
            }
            Err(err) => {
                warn!(error = %err, username = %request.username, "automatic test login failed");
                None
            }
        }
    }

    fn apply_user(&self, user: User) {
        let id = user.id.to_string();
        let username = user.username.clone();
        let properties = IdentifyProperties::from(&user);

        self.state.send_modify(|state| state.apply_user(user));
        info!(user_id = %id, %username, "session user applied");

        self.collaborators.error_telemetry.set_user(&id, &username);
        self.collaborators.analytics.identify_user(&id, &properties);
    }

    fn clear_identity(&self) {
        self.state.send_modify(SessionState::clear_user);
        self.collaborators.error_telemetry.clear_user();
        self.collaborators.analytics.reset_user();
    }

    async fn clear_storage(&self) {
        if let Err(err) = self.collaborators.storage.clear_auth_storage().await {
            warn!(error = %err, "failed to clear auth storage");
        }
    }
}
