use shared::models::{Permission, User};

/// Coarse lifecycle position of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial check against the session service has not settled yet.
    Bootstrapping,
    Authenticated,
    Anonymous,
}

/// The single, process-wide session record.
///
/// Only [`super::SessionManager`] mutates it; consumers get clones or a
/// watch receiver. The guard flags are internal and never exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    current_user: Option<User>,
    is_loading: bool,
    pub(super) unauthorized_handled: bool,
    pub(super) auto_login_attempted: bool,
    pub(super) bootstrap_started: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_user: None,
            is_loading: true,
            unauthorized_handled: false,
            auto_login_attempted: false,
            bootstrap_started: false,
        }
    }
}

impl SessionState {
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// True only until the bootstrap sequence settles.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (self.is_loading, &self.current_user) {
            (true, _) => SessionPhase::Bootstrapping,
            (false, Some(_)) => SessionPhase::Authenticated,
            (false, None) => SessionPhase::Anonymous,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().is_some_and(User::is_admin)
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.current_user.as_ref().is_some_and(User::is_moderator)
    }

    #[must_use]
    pub fn is_moderator_or_admin(&self) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(User::is_moderator_or_admin)
    }

    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|user| user.can(permission))
    }

    /// Replace the user wholesale and re-arm unauthorized handling.
    pub(super) fn apply_user(&mut self, user: User) {
        self.current_user = Some(user);
        self.unauthorized_handled = false;
    }

    pub(super) fn clear_user(&mut self) {
        self.current_user = None;
    }

    pub(super) fn finish_loading(&mut self) -> bool {
        std::mem::replace(&mut self.is_loading, false)
    }
}
