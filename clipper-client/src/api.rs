use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, cookie::Jar};
use serde::de::DeserializeOwned;
use shared::{
    config::ClientConfig,
    models::{AuthMessage, ErrorResponse, TestLoginRequest, User},
};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{
    errors::{ClientError, ClientResult},
    services::SessionService,
    unauthorized::UnauthorizedHook,
};

const USER_AGENT: &str = concat!("clipper-client/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Clipper auth endpoints.
///
/// Cookies are kept in a shared jar so the backend's rotated access and
/// refresh tokens are picked up automatically.
#[derive(Clone, Debug)]
pub struct ClipperClient {
    base_url: Url,
    client: Client,
    unauthorized: UnauthorizedHook,
    test_login_enabled: bool,
    oauth_state: Option<String>,
}

impl ClipperClient {
    /// Create a client rooted at `base_url` (for example
    /// `http://localhost:8080/api/v1/`).
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be built.
    pub fn new(base_url: Url, jar: Arc<Jar>) -> ClientResult<Self> {
        let client = Client::builder()
            .cookie_provider(jar)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            client,
            unauthorized: UnauthorizedHook::new(),
            test_login_enabled: false,
            oauth_state: None,
        })
    }

    /// Create a client from resolved configuration.
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, jar: Arc<Jar>) -> ClientResult<Self> {
        Ok(Self::new(config.api_base_url.clone(), jar)?.with_test_login(config.test_login.enabled))
    }

    /// Allow or forbid `POST auth/test-login`.
    #[must_use]
    pub fn with_test_login(mut self, enabled: bool) -> Self {
        self.test_login_enabled = enabled;
        self
    }

    /// Opaque `state` value forwarded on the OAuth redirect.
    #[must_use]
    pub fn with_oauth_state(mut self, state: Option<String>) -> Self {
        self.oauth_state = state.filter(|value| !value.is_empty());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Hook notified when a request fails authorization after its refresh.
    #[must_use]
    pub fn unauthorized_hook(&self) -> &UnauthorizedHook {
        &self.unauthorized
    }

    fn api_url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request; on 401 refresh once and retry. A second rejection
    /// notifies the unauthorized hook.
    async fn send_with_refresh<F>(&self, build: F) -> ClientResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let response = build().send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        drop(response);

        match self.refresh_session().await {
            Ok(()) => {
                let retried = build().send().await?;
                if retried.status() != StatusCode::UNAUTHORIZED {
                    return Ok(retried);
                }
                debug!("request still unauthorized after refresh");
            }
            Err(err) => debug!(error = %err, "session refresh failed"),
        }

        self.unauthorized.notify().await;
        Err(ClientError::Unauthorized)
    }

    /// Rotate the session cookies.
    ///
    /// # Errors
    /// Fails when the backend rejects the refresh token or is unreachable.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> ClientResult<()> {
        let url = self.api_url("auth/refresh")?;
        let response = self.client.post(url).send().await?;
        if response.status().is_success() {
            debug!("session cookies rotated");
            Ok(())
        } else {
            Err(error_from(response).await)
        }
    }

    /// Retrieve the authenticated user.
    ///
    /// # Errors
    /// Fails with [`ClientError::Unauthorized`] when no valid session exists.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> ClientResult<User> {
        let url = self.api_url("auth/me")?;
        let response = self
            .send_with_refresh(move || self.client.get(url.clone()))
            .await?;
        decode(response).await
    }

    /// The URL that starts the Twitch OAuth redirect flow.
    ///
    /// # Errors
    /// Fails when the endpoint cannot be joined onto the base URL.
    pub fn oauth_url(&self) -> ClientResult<Url> {
        let mut url = self.api_url("auth/twitch")?;
        if let Some(state) = &self.oauth_state {
            url.query_pairs_mut().append_pair("state", state);
        }
        Ok(url)
    }

    /// Revoke the refresh token and have the backend clear its cookies.
    /// An already-expired session counts as logged out.
    ///
    /// # Errors
    /// Fails on transport errors or non-success statuses other than 401.
    #[instrument(skip(self))]
    pub async fn logout_session(&self) -> ClientResult<()> {
        let url = self.api_url("auth/logout")?;
        let response = self.client.post(url).send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => {
                debug!("logout with no active session");
                Ok(())
            }
            status if status.is_success() => {
                match response.json::<AuthMessage>().await {
                    Ok(body) => debug!(message = %body.message, "logged out on backend"),
                    Err(err) => debug!(error = %err, "logout acknowledged without a message body"),
                }
                Ok(())
            }
            _ => Err(error_from(response).await),
        }
    }

    /// Sign in as a fixture account.
    ///
    /// # Errors
    /// Fails with [`ClientError::TestLoginDisabled`] unless enabled, or when
    /// the backend rejects the request.
    #[instrument(skip(self), fields(username = %request.username))]
    pub async fn login_as_test_user(&self, request: &TestLoginRequest) -> ClientResult<User> {
        if !self.test_login_enabled {
            return Err(ClientError::TestLoginDisabled);
        }

        let url = self.api_url("auth/test-login")?;
        let response = self.client.post(url).json(request).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl SessionService for ClipperClient {
    async fn fetch_current_user(&self) -> ClientResult<User> {
        self.current_user().await
    }

    async fn initiate_oauth(&self) -> ClientResult<Url> {
        self.oauth_url()
    }

    async fn logout(&self) -> ClientResult<()> {
        self.logout_session().await
    }

    async fn test_login(&self, request: &TestLoginRequest) -> ClientResult<User> {
        self.login_as_test_user(request).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(error_from(response).await)
    }
}

async fn error_from(response: Response) -> ClientError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return ClientError::Unauthorized;
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => error.to_string(),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };
    warn!(%status, %message, "request failed");
    ClientError::Status { status, message }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ClipperClient {
        ClipperClient::new(Url::parse(base).unwrap(), Arc::new(Jar::default())).unwrap()
    }

    #[test]
    fn endpoints_resolve_under_base_path() {
        let client = client("http://localhost:8080/api/v1");
        assert_eq!(
            client.api_url("auth/me").unwrap().as_str(),
            "http://localhost:8080/api/v1/auth/me"
        );
        assert_eq!(
            client.api_url("/auth/refresh").unwrap().as_str(),
            "http://localhost:8080/api/v1/auth/refresh"
        );
    }

    #[test]
    fn oauth_url_carries_optional_state() {
        let plain = client("http://localhost:8080/api/v1/");
        assert_eq!(
            plain.oauth_url().unwrap().as_str(),
            "http://localhost:8080/api/v1/auth/twitch"
        );

        let with_state = plain.clone().with_oauth_state(Some("abc 123".into()));
        assert_eq!(
            with_state.oauth_url().unwrap().as_str(),
            "http://localhost:8080/api/v1/auth/twitch?state=abc+123"
        );

        let empty = plain.with_oauth_state(Some(String::new()));
        assert!(empty.oauth_url().unwrap().query().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_opt_in() {
        let client = client("http://localhost:8080/api/v1/");
        let request = TestLoginRequest {
            username: "e2e_test_user".into(),
            user_id: None,
        };
        let err = client.login_as_test_user(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::TestLoginDisabled));
    }
}
