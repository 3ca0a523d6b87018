//! Persisted auth cookies.
//!
//! The backend keeps the session in two HTTP-only cookies. Between processes
//! they live in a single file holding a `Cookie` header line.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, info};
use url::Url;

use crate::{
    errors::{ClientError, ClientResult},
    services::StorageClearer,
};

/// Short-lived access token cookie set by the backend.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Long-lived refresh token cookie set by the backend.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const AUTH_COOKIES: [&str; 2] = [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE];

/// Cookie jar shared with the HTTP client plus the file it is persisted to.
#[derive(Debug, Clone)]
pub struct CookieSessionStore {
    jar: Arc<Jar>,
    origin: Url,
    path: PathBuf,
}

impl CookieSessionStore {
    /// Wrap an existing jar. `base_url` may carry a path; cookies are scoped
    /// to its origin root.
    ///
    /// # Errors
    /// Fails when `base_url` cannot be reduced to an origin.
    pub fn new(jar: Arc<Jar>, base_url: &Url, path: impl Into<PathBuf>) -> ClientResult<Self> {
        Ok(Self {
            jar,
            origin: base_url.join("/")?,
            path: path.into(),
        })
    }

    /// Create a fresh jar and seed it from `path` when the file exists.
    ///
    /// # Errors
    /// Fails when the file exists but cannot be read.
    pub fn load(base_url: &Url, path: impl Into<PathBuf>) -> ClientResult<Self> {
        let store = Self::new(Arc::new(Jar::default()), base_url, path)?;

        match fs::read_to_string(&store.path) {
            Ok(contents) => {
                for entry in contents.split(';') {
                    let cookie = entry.trim();
                    if !cookie.is_empty() {
                        store.jar.add_cookie_str(cookie, &store.origin);
                    }
                }
                debug!(path = %store.path.display(), "loaded session cookies");
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %store.path.display(), "no persisted session cookies");
            }
            Err(err) => return Err(ClientError::storage(&store.path, err)),
        }

        Ok(store)
    }

    /// The jar to hand to the HTTP client.
    #[must_use]
    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current `Cookie` header value for the origin, if any cookie is set.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.origin)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Whether the jar holds a cookie named `name`.
    #[must_use]
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookie_header().is_some_and(|header| {
            header
                .split(';')
                .filter_map(|entry| entry.trim().split_once('='))
                .any(|(key, value)| key == name && !value.is_empty())
        })
    }

    /// Write the jar to disk, or remove the file when the jar is empty.
    ///
    /// # Errors
    /// Fails when the file or its directory cannot be written.
    pub fn persist(&self) -> ClientResult<()> {
        let Some(header) = self.cookie_header() else {
            return self.remove_file();
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| ClientError::storage(parent, err))?;
        }
        fs::write(&self.path, header.as_bytes())
            .map_err(|err| ClientError::storage(&self.path, err))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|err| ClientError::storage(&self.path, err))?;
        }

        debug!(path = %self.path.display(), "persisted session cookies");
        Ok(())
    }

    fn expire_auth_cookies(&self) {
        for name in AUTH_COOKIES {
            self.jar
                .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &self.origin);
        }
    }

    fn remove_file(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "removed session cookies");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::storage(&self.path, err)),
        }
    }
}

#[async_trait]
impl StorageClearer for CookieSessionStore {
    async fn clear_auth_storage(&self) -> ClientResult<()> {
        self.expire_auth_cookies();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "removed session cookies");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::storage(&self.path, err)),
        }
    }
}
