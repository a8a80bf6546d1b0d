//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default backend URL (can be overridden at compile time via CAREBRIDGE_BASE_URL env var).
pub const DEFAULT_BASE_URL: &str = match option_env!("CAREBRIDGE_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:5000/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Session refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Identity check endpoint.
pub const DEFAULT_IDENTITY_PATH: &str = "/auth/me";

/// Logout endpoint.
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";

/// Location the application is sent to when the session ends.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Cookie the server writes the anti-forgery token into.
pub const DEFAULT_CSRF_COOKIE: &str = "csrfToken";

/// Header mutating requests echo the anti-forgery token in.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-Token";

/// Upper bound on a single refresh or identity check.
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 10_000;

/// How concurrent recovery attempts share work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Every failing call runs its own refresh or identity check.
    #[default]
    PerRequest,
    /// Concurrent failures wait on one shared in-flight refresh or identity check.
    Coalesced,
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::PerRequest => f.write_str("per_request"),
            RefreshPolicy::Coalesced => f.write_str("coalesced"),
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_request" => Ok(RefreshPolicy::PerRequest),
            "coalesced" => Ok(RefreshPolicy::Coalesced),
            other => Err(CoreError::Config(format!(
                "Unknown refresh policy: {}",
                other
            ))),
        }
    }
}

/// Settings for one session-guarded HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL; request paths are joined onto it.
    pub base_url: String,
    /// Cookie-credentialed session refresh endpoint.
    pub refresh_path: String,
    /// Identity check endpoint, also used to re-issue the CSRF cookie.
    pub identity_path: String,
    /// Logout endpoint.
    pub logout_path: String,
    /// Location to navigate to on terminal session failure.
    pub login_path: String,
    /// Name of the CSRF cookie.
    pub csrf_cookie: String,
    /// Name of the CSRF request header.
    pub csrf_header: String,
    /// Timeout applied to each refresh or identity check.
    pub refresh_timeout_ms: u64,
    /// Whether concurrent recoveries are coalesced.
    pub refresh_policy: RefreshPolicy,
    /// Optional timeout for ordinary requests.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            identity_path: DEFAULT_IDENTITY_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            refresh_timeout_ms: DEFAULT_REFRESH_TIMEOUT_MS,
            refresh_policy: RefreshPolicy::default(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given backend with every other field defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parse the base URL.
    ///
    /// A trailing slash is added so relative joins keep any path prefix
    /// (`/api` stays in `/api/activities`).
    pub fn base_url(&self) -> CoreResult<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(CoreError::from)
    }

    /// Resolve a request path against the base URL.
    pub fn resolve(&self, path: &str) -> CoreResult<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(CoreError::from);
        }
        let base = self.base_url()?;
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    /// Refresh/identity-check timeout as a `Duration`.
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    /// Request timeout as a `Duration`, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub log_json: bool,
    /// HTTP client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> CoreResult<Self> {
        let mut config = Self::default();
        config.load_from_env()?;
        Ok(config)
    }

    /// Load configuration from the default file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) -> CoreResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognised variables: `CAREBRIDGE_BASE_URL`, `CAREBRIDGE_LOG_LEVEL`,
    /// `CAREBRIDGE_REFRESH_POLICY`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = get("CAREBRIDGE_BASE_URL") {
            self.client.base_url = base_url.trim().to_string();
        }
        if let Some(log_level) = get("CAREBRIDGE_LOG_LEVEL") {
            self.log_level = log_level.trim().to_string();
        }
        if let Some(policy) = get("CAREBRIDGE_REFRESH_POLICY") {
            self.client.refresh_policy = policy.parse()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_client_config() {
        let config = ClientConfig::default();
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.identity_path, "/auth/me");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.csrf_cookie, "csrfToken");
        assert_eq!(config.csrf_header, "X-CSRF-Token");
        assert_eq!(config.refresh_policy, RefreshPolicy::PerRequest);
        assert_eq!(config.refresh_timeout(), Duration::from_secs(10));
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_resolve_keeps_base_path_prefix() {
        let config = ClientConfig::with_base_url("https://care.example.com/api");
        let url = config.resolve("/activities").unwrap();
        assert_eq!(url.as_str(), "https://care.example.com/api/activities");

        let url = config.resolve("auth/me").unwrap();
        assert_eq!(url.as_str(), "https://care.example.com/api/auth/me");
    }

    #[test]
    fn test_resolve_absolute_url_passes_through() {
        let config = ClientConfig::with_base_url("https://care.example.com/api");
        let url = config.resolve("https://media.example.com/upload").unwrap();
        assert_eq!(url.as_str(), "https://media.example.com/upload");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::with_base_url("not a valid url");
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_partial_client_config_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "client": { "base_url": "https://x.test", "refresh_policy": "coalesced" } }"#,
        )
        .unwrap();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.client.base_url, "https://x.test");
        assert_eq!(config.client.refresh_policy, RefreshPolicy::Coalesced);
        assert_eq!(config.client.csrf_cookie, DEFAULT_CSRF_COOKIE);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.log_level = "trace".to_string();
        config.client.refresh_timeout_ms = 2_500;
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.log_level, "trace");
        assert_eq!(loaded.client.refresh_timeout_ms, 2_500);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert!(!paths.config_file().exists());
        assert_eq!(config.client.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.client.identity_path, DEFAULT_IDENTITY_PATH);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                ("CAREBRIDGE_BASE_URL", "https://staging.example.com/api"),
                ("CAREBRIDGE_LOG_LEVEL", "debug"),
                ("CAREBRIDGE_REFRESH_POLICY", "coalesced"),
            ]))
            .unwrap();

        assert_eq!(config.client.base_url, "https://staging.example.com/api");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.client.refresh_policy, RefreshPolicy::Coalesced);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[("CAREBRIDGE_LOG_LEVEL", "  ")]))
            .unwrap();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_bad_refresh_policy_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup_from(&[("CAREBRIDGE_REFRESH_POLICY", "eager")]));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_refresh_policy_parse_and_display() {
        assert_eq!(
            "per-request".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::PerRequest
        );
        assert_eq!(
            "Coalesced".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::Coalesced
        );
        assert_eq!(RefreshPolicy::Coalesced.to_string(), "coalesced");
    }
}
