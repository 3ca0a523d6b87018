//! Collaborator contracts consumed by the session manager.
//!
//! The session service and storage clearer are asynchronous and may fail; the
//! telemetry sinks are synchronous fire-and-forget notifications that cannot
//! report failure back into session state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use shared::models::{TestLoginRequest, User};
use url::Url;

use crate::errors::ClientResult;

/// Backend session endpoints.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Fetch the authenticated user.
    ///
    /// # Errors
    /// Fails when no valid session exists or the backend is unreachable.
    async fn fetch_current_user(&self) -> ClientResult<User>;

    /// Begin the redirect-based OAuth flow and return the URL the user agent
    /// must be sent to.
    ///
    /// # Errors
    /// Fails when the authorization URL cannot be produced.
    async fn initiate_oauth(&self) -> ClientResult<Url>;

    /// Invalidate the server-side session.
    ///
    /// # Errors
    /// Fails on transport errors or non-success statuses.
    async fn logout(&self) -> ClientResult<()>;

    /// Sign in as a fixture account in automated environments.
    ///
    /// # Errors
    /// Fails when the backend rejects the request or test login is disabled.
    async fn test_login(&self, request: &TestLoginRequest) -> ClientResult<User>;
}

/// Erases client-persisted auth artifacts.
#[async_trait]
pub trait StorageClearer: Send + Sync {
    /// # Errors
    /// Fails when persisted artifacts exist but cannot be removed.
    async fn clear_auth_storage(&self) -> ClientResult<()>;
}

/// Crash-reporting identity tagging.
pub trait ErrorTelemetry: Send + Sync {
    fn set_user(&self, id: &str, username: &str);
    fn clear_user(&self);
}

/// Product-analytics identity and events.
pub trait Analytics: Send + Sync {
    fn identify_user(&self, id: &str, properties: &IdentifyProperties);
    fn reset_user(&self);
    fn track_event(&self, event_name: &str, properties: serde_json::Value);
}

/// Identity record pushed to the analytics sink when a user is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifyProperties {
    pub user_id: String,
    pub username: String,
    pub is_premium: bool,
    pub premium_tier: Option<String>,
    pub signup_date: String,
    pub is_verified: bool,
}

impl From<&User> for IdentifyProperties {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.to_string(),
            username: user.username.clone(),
            is_premium: user.is_premium,
            premium_tier: user.premium_tier.clone(),
            signup_date: user.created_at.to_rfc3339(),
            is_verified: user.is_verified,
        }
    }
}

/// Handles to every collaborator the session manager drives.
#[derive(Clone)]
pub struct Collaborators {
    pub session: Arc<dyn SessionService>,
    pub storage: Arc<dyn StorageClearer>,
    pub error_telemetry: Arc<dyn ErrorTelemetry>,
    pub analytics: Arc<dyn Analytics>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
