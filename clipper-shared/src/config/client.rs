use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1/";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TEST_USERNAME: &str = "e2e_test_user";

/// Errors raised while resolving the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported configuration format; use 'yaml' or 'json'")]
    UnsupportedFormat,
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Automated test-login settings.
///
/// `enabled` is fixed at build time from `CLIPPER_ENABLE_TEST_LOGIN`; neither
/// config files nor the runtime environment can switch it on. The fixture
/// account may still be chosen at runtime.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TestLoginConfig {
    /// Whether bootstrap may fall back to `POST /auth/test-login`.
    #[serde(skip, default = "enabled_at_build_time")]
    pub enabled: bool,
    /// Fixture account to sign in as.
    pub username: String,
    /// Optional fixed identifier for the fixture account.
    pub user_id: Option<String>,
}

impl Default for TestLoginConfig {
    fn default() -> Self {
        Self {
            enabled: enabled_at_build_time(),
            username: option_env!("CLIPPER_TEST_USERNAME")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(DEFAULT_TEST_USERNAME)
                .to_string(),
            user_id: option_env!("CLIPPER_TEST_USER_ID")
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string),
        }
    }
}

/// Configuration for the Clipper session client, read once at start-up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the versioned API, e.g. `https://clpr.tv/api/v1/`.
    pub api_base_url: Url,

    /// Logging level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Where session cookies are persisted between runs.
    pub session_path: Option<PathBuf>,

    /// Automated test-login settings.
    pub test_login: TestLoginConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClientConfig {
    /// Generates a default configuration.
    ///
    /// # Panics
    /// Never; the default base URL is a valid constant.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default API URL is valid"),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            session_path: None,
            test_login: TestLoginConfig::default(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Environment variables only apply to values the file left at their
    /// defaults; `base_url_override` always wins.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed, has an
    /// unsupported extension, or when a resolved value fails validation.
    pub fn load_config(
        config_path: Option<PathBuf>,
        base_url_override: Option<Url>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::with_defaults();
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => defaults.clone(),
        };

        if config.api_base_url == defaults.api_base_url {
            if let Ok(value) = env::var("CLIPPER_API_BASE_URL") {
                config.api_base_url =
                    Url::parse(&value).map_err(|err| ConfigError::InvalidValue {
                        field: "CLIPPER_API_BASE_URL",
                        message: err.to_string(),
                    })?;
            }
        }
        if config.log_level == defaults.log_level {
            if let Ok(value) = env::var("CLIPPER_LOG_LEVEL") {
                config.log_level = value;
            }
        }
        if config.session_path.is_none() {
            if let Ok(value) = env::var("CLIPPER_SESSION_PATH") {
                config.session_path = Some(PathBuf::from(value));
            }
        }
        config.test_login.apply_env_overrides(&defaults.test_login);

        if let Some(url) = base_url_override {
            config.api_base_url = url;
        }
        config.api_base_url = with_trailing_slash(config.api_base_url);

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Ok(serde_yml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    /// Serialize the configuration as `yaml` or `json`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedFormat`] for any other format name.
    pub fn render(&self, format: &str) -> Result<String, ConfigError> {
        match format {
            "yaml" => Ok(serde_yml::to_string(self)?),
            "json" => Ok(serde_json::to_string_pretty(self)?),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    /// Validate the resolved configuration.
    ///
    /// # Errors
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                message: format!("unsupported scheme '{}'", self.api_base_url.scheme()),
            });
        }
        if self.test_login.enabled && self.test_login.username.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "test_login.username",
                message: "must not be empty when test login is enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Session cookie location, falling back to the platform config directory.
    #[must_use]
    pub fn resolved_session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(default_session_path)
    }
}

impl TestLoginConfig {
    fn apply_env_overrides(&mut self, defaults: &Self) {
        if self.username == defaults.username {
            if let Ok(value) = env::var("CLIPPER_TEST_USERNAME") {
                self.username = value;
            }
        }
        if self.user_id.is_none() {
            if let Ok(value) = env::var("CLIPPER_TEST_USER_ID") {
                self.user_id = Some(value).filter(|id| !id.trim().is_empty());
            }
        }
    }
}

fn enabled_at_build_time() -> bool {
    option_env!("CLIPPER_ENABLE_TEST_LOGIN")
        .and_then(parse_flag)
        .unwrap_or(false)
}

/// Default session cookie location: `<config dir>/clipper/session.cookies`.
#[must_use]
pub fn default_session_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("clipper").join("session.cookies"))
        .unwrap_or_else(|| PathBuf::from("./session.cookies"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// `Url::join` drops the last path segment unless the base ends with '/'.
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
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    fn cleanup_env_vars() {
        unsafe {
            std::env::remove_var("CLIPPER_API_BASE_URL");
            std::env::remove_var("CLIPPER_LOG_LEVEL");
            std::env::remove_var("CLIPPER_SESSION_PATH");
            std::env::remove_var("CLIPPER_ENABLE_TEST_LOGIN");
            std::env::remove_var("CLIPPER_TEST_USERNAME");
            std::env::remove_var("CLIPPER_TEST_USER_ID");
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        cleanup_env_vars();
        let config = ClientConfig::load_config(None, None).unwrap();

        assert_eq!(config.api_base_url.as_str(), DEFAULT_API_BASE_URL);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.session_path, None);
        assert_eq!(config.test_login, TestLoginConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_config_with_environment_variables() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("CLIPPER_API_BASE_URL", "https://clpr.example/api/v1");
            std::env::set_var("CLIPPER_LOG_LEVEL", "debug");
            std::env::set_var("CLIPPER_SESSION_PATH", "/tmp/clipper.cookies");
            std::env::set_var("CLIPPER_TEST_USERNAME", "e2e_bob");
            std::env::set_var("CLIPPER_TEST_USER_ID", "user-42");
        }

        let config = ClientConfig::load_config(None, None).unwrap();
        cleanup_env_vars();

        assert_eq!(config.api_base_url.as_str(), "https://clpr.example/api/v1/");
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.resolved_session_path(),
            PathBuf::from("/tmp/clipper.cookies")
        );
        assert_eq!(config.test_login.username, "e2e_bob");
        assert_eq!(config.test_login.user_id.as_deref(), Some("user-42"));
    }

    #[test]
    #[serial]
    fn test_runtime_environment_cannot_enable_test_login() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("CLIPPER_ENABLE_TEST_LOGIN", "true");
        }

        let config = ClientConfig::load_config(None, None).unwrap();
        cleanup_env_vars();

        assert_eq!(config.test_login.enabled, enabled_at_build_time());
        if option_env!("CLIPPER_ENABLE_TEST_LOGIN").is_none() {
            assert!(!config.test_login.enabled);
        }
    }

    #[test]
    #[serial]
    fn test_base_url_override_wins_over_environment() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var("CLIPPER_API_BASE_URL", "https://env.example/api/v1/");
        }

        let override_url = Url::parse("http://127.0.0.1:9000/api/v1").unwrap();
        let config = ClientConfig::load_config(None, Some(override_url)).unwrap();
        cleanup_env_vars();

        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:9000/api/v1/");
    }

    #[test]
    #[serial]
    fn test_load_config_from_yaml_file() {
        cleanup_env_vars();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clipper.yaml");
        fs::write(
            &path,
            "api_base_url: https://clpr.example/api/v1/\nlog_level: warn\ntest_login:\n  enabled: true\n  username: fixture\n",
        )
        .unwrap();

        let config = ClientConfig::load_config(Some(path), None).unwrap();

        assert_eq!(config.api_base_url.as_str(), "https://clpr.example/api/v1/");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.test_login.enabled, enabled_at_build_time());
        assert_eq!(config.test_login.username, "fixture");
        assert_eq!(config.test_login.user_id, None);
    }

    #[test]
    #[serial]
    fn test_load_config_from_json_file() {
        cleanup_env_vars();
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"log_level":"trace","session_path":"/var/tmp/jar"}}"#).unwrap();

        let config = ClientConfig::load_config(Some(file.path().to_path_buf()), None).unwrap();

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.session_path, Some(PathBuf::from("/var/tmp/jar")));
        assert_eq!(config.api_base_url.as_str(), DEFAULT_API_BASE_URL);
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_unknown_extension() {
        cleanup_env_vars();
        let file = Builder::new().suffix(".toml").tempfile().unwrap();

        let result = ClientConfig::load_config(Some(file.path().to_path_buf()), None);

        assert!(matches!(result, Err(ConfigError::UnsupportedFormat)));
    }

    #[test]
    #[serial]
    fn test_load_config_missing_file() {
        cleanup_env_vars();
        let result = ClientConfig::load_config(Some(PathBuf::from("/nonexistent/clipper.yaml")), None);

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let mut config = ClientConfig::with_defaults();
        config.api_base_url = Url::parse("ftp://clpr.example/").unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_test_username_when_enabled() {
        let mut config = ClientConfig::with_defaults();
        config.test_login.enabled = true;
        config.test_login.username = "   ".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "test_login.username",
                ..
            })
        ));
    }

    #[test]
    fn test_render_roundtrips_through_yaml_and_json() {
        let config = ClientConfig::with_defaults();

        let yaml = config.render("yaml").unwrap();
        let from_yaml: ClientConfig = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(from_yaml, config);

        let json = config.render("json").unwrap();
        assert!(json.contains("\"api_base_url\""));

        assert!(matches!(
            config.render("toml"),
            Err(ConfigError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_rendered_config_omits_test_login_switch() {
        let yaml = ClientConfig::with_defaults().render("yaml").unwrap();
        assert!(yaml.contains("test_login"));
        assert!(!yaml.contains("enabled"));
    }

    #[test]
    fn test_parse_flag_values() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
