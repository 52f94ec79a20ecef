use std::net::IpAddr;

use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::PortalError;
use crate::session::CookieSettings;
use crate::upstream::DashboardConfig;

/// Default listen port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 4567;

/// Runtime settings shared by the pipeline and the handlers.
#[derive(Clone)]
pub(crate) struct PortalSettings {
    pub(crate) cookie_key: Key,
    pub(crate) cookie: CookieSettings,
    pub(crate) enforce_login_credentials: bool,
}

impl PortalSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            cookie: CookieSettings::default(),
            enforce_login_credentials: false,
        }
    }
}

/// Portal configuration.
///
/// The dashboard connection is a constructor parameter; everything else has
/// a default and a `with_*` override.
///
/// Use [`from_env()`](AppConfig::from_env) for convention-based setup.
pub struct AppConfig {
    pub(super) dashboard: DashboardConfig,
    pub(super) settings: PortalSettings,
    bind_address: IpAddr,
    port: u16,
}

impl AppConfig {
    #[must_use]
    pub fn new(dashboard: DashboardConfig) -> Self {
        Self {
            dashboard,
            settings: PortalSettings::defaults(),
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `API_KEY` (or `TYK_API_KEY`): dashboard API key, must not be empty
    ///
    /// # Optional env vars
    /// - `DASHBOARD_URL` (or `TYK_DASHBOARD_URL`): dashboard base URL
    /// - `PORT` (or `TYK_PORTAL_PORT`): listen port
    /// - `BIND_ADDRESS`: listen address
    /// - `COOKIE_KEY`: session cookie key bytes
    /// - `SECURE_COOKIES`: `"1"` or `"true"` to mark the session cookie `Secure`
    /// - `ENFORCE_LOGIN_CREDENTIALS`: `"1"` or `"true"` to reject unverified logins
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Config`] if the API key is missing or a value is invalid.
    pub fn from_env() -> Result<Self, PortalError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env()`](AppConfig::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Config`] if the API key is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PortalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |primary: &str, fallback: Option<&str>| {
            lookup(primary)
                .or_else(|| fallback.and_then(&lookup))
                .filter(|v| !v.trim().is_empty())
        };
        let flag = |name: &str| matches!(lookup(name).as_deref(), Some("1") | Some("true"));

        let api_key = var("API_KEY", Some("TYK_API_KEY"))
            .ok_or_else(|| PortalError::Config("API_KEY is required".into()))?;

        let mut dashboard = DashboardConfig::new(api_key);
        if let Some(url_str) = var("DASHBOARD_URL", Some("TYK_DASHBOARD_URL")) {
            let url: Url = url_str
                .parse()
                .map_err(|e| PortalError::Config(format!("DASHBOARD_URL: {e}")))?;
            dashboard = dashboard.with_base_url(url);
        }

        let mut config = Self::new(dashboard)
            .with_secure_cookies(flag("SECURE_COOKIES"))
            .with_enforce_login_credentials(flag("ENFORCE_LOGIN_CREDENTIALS"));

        if let Some(port) = var("PORT", Some("TYK_PORTAL_PORT")) {
            let port = port
                .trim()
                .parse()
                .map_err(|e| PortalError::Config(format!("PORT: {e}")))?;
            config = config.with_port(port);
        }
        if let Some(addr) = var("BIND_ADDRESS", None) {
            let addr = addr
                .trim()
                .parse()
                .map_err(|e| PortalError::Config(format!("BIND_ADDRESS: {e}")))?;
            config = config.with_bind_address(addr);
        }

        if let Some(k) = var("COOKIE_KEY", None) {
            let key = Key::try_from(k.as_bytes()).map_err(|_| {
                PortalError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?;
            config = config.with_cookie_key(key);
        } else {
            tracing::warn!("COOKIE_KEY not set; sessions will not survive a restart");
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookie.name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.cookie.ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.cookie.secure = secure;
        self
    }

    /// Require a successful credential check before logging a developer in.
    ///
    /// Off by default: the login form then trusts the submitted email.
    #[must_use]
    pub fn with_enforce_login_credentials(mut self, enforce: bool) -> Self {
        self.settings.enforce_login_credentials = enforce;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_bind_address(mut self, addr: IpAddr) -> Self {
        self.bind_address = addr;
        self
    }

    #[must_use]
    pub fn dashboard(&self) -> &DashboardConfig {
        &self.dashboard
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn bind_address(&self) -> IpAddr {
        self.bind_address
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_api_key_required() {
        let err = AppConfig::from_lookup(lookup(&[])).err().unwrap();
        assert!(matches!(err, PortalError::Config(_)));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("API_KEY", "secret")])).unwrap();

        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.bind_address(), IpAddr::from([0, 0, 0, 0]));
        assert_eq!(
            config.dashboard().base_url().as_str(),
            "https://admin.cloud.tyk.io/"
        );
        assert!(!config.settings.cookie.secure);
        assert!(!config.settings.enforce_login_credentials);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("API_KEY", "secret"),
            ("DASHBOARD_URL", "http://localhost:3000"),
            ("PORT", "8080"),
            ("BIND_ADDRESS", "127.0.0.1"),
            ("SECURE_COOKIES", "true"),
            ("ENFORCE_LOGIN_CREDENTIALS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.port(), 8080);
        assert_eq!(config.bind_address(), IpAddr::from([127, 0, 0, 1]));
        assert_eq!(
            config.dashboard().base_url().as_str(),
            "http://localhost:3000/"
        );
        assert!(config.settings.cookie.secure);
        assert!(config.settings.enforce_login_credentials);
    }

    #[test]
    fn test_session_cookie_overrides() {
        let config = AppConfig::new(DashboardConfig::new("secret"))
            .with_session_cookie_name("portal_sid")
            .with_session_ttl_days(7);

        assert_eq!(config.settings.cookie.name, "portal_sid");
        assert_eq!(config.settings.cookie.ttl_days, 7);
        assert!(!config.settings.cookie.secure);
    }

    #[test]
    fn test_legacy_names_are_fallbacks() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TYK_API_KEY", "legacy"),
            ("TYK_PORTAL_PORT", "9000"),
            ("TYK_DASHBOARD_URL", "http://dash.local/"),
        ]))
        .unwrap();

        assert_eq!(config.dashboard().api_key, "legacy");
        assert_eq!(config.port(), 9000);
        assert_eq!(config.dashboard().base_url().as_str(), "http://dash.local/");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("API_KEY", "k"), ("PORT", "http")])).is_err());
        assert!(
            AppConfig::from_lookup(lookup(&[("API_KEY", "k"), ("DASHBOARD_URL", "not a url")]))
                .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup(&[("API_KEY", "k"), ("COOKIE_KEY", "short")])).is_err()
        );
    }
}
