//! Client configuration.
//!
//! A `ClientConfig` names the backend, the route layout that backend uses,
//! request bounds, and the collection write policy. Values are public
//! endpoints plus an optional admin enrollment key, which is redacted from
//! debug output.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collection::WritePolicy;
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DEBOUNCE_MILLIS: u64 = 1_000;

/// Auth endpoint paths, relative to the API base URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ApiRoutes {
    pub sign_up: String,
    pub sign_in: String,
    pub profile: String,
    pub validate_otp: String,
    pub forgot_password: String,
    /// Prefix; the reset token is appended as the last path segment
    pub reset_password: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self {
            sign_up: "/user/signup".to_string(),
            sign_in: "/user/signin".to_string(),
            profile: "/user/profile".to_string(),
            validate_otp: "/user/validateOtp".to_string(),
            forgot_password: "/forgot-password".to_string(),
            reset_password: "/reset-password".to_string(),
        }
    }
}

impl ApiRoutes {
    /// Layout used by the flat `/signup` + `/login` backends.
    pub fn flat() -> Self {
        Self {
            sign_up: "/signup".to_string(),
            sign_in: "/login".to_string(),
            profile: "/users/profile".to_string(),
            ..Self::default()
        }
    }

    fn normalize(&mut self) -> Result<()> {
        for (name, path) in [
            ("sign_up", &mut self.sign_up),
            ("sign_in", &mut self.sign_in),
            ("profile", &mut self.profile),
            ("validate_otp", &mut self.validate_otp),
            ("forgot_password", &mut self.forgot_password),
            ("reset_password", &mut self.reset_password),
        ] {
            *path = normalize_route(path)
                .ok_or_else(|| Error::InvalidConfiguration(format!("route '{name}' is empty")))?;
        }
        Ok(())
    }
}

/// Trim a route and force a single leading slash with no trailing slash.
pub fn normalize_route(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub routes: ApiRoutes,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_debounce_millis")]
    pub debounce_millis: u64,
    #[serde(default)]
    pub write_policy: WritePolicy,
    /// When set, admin sign-ups are checked locally before any request
    #[serde(default)]
    pub admin_key: Option<String>,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_debounce_millis() -> u64 {
    DEFAULT_DEBOUNCE_MILLIS
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("routes", &self.routes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("debounce_millis", &self.debounce_millis)
            .field("write_policy", &self.write_policy)
            .field(
                "admin_key",
                &self.admin_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        Self {
            api_base_url: api_base_url.into(),
            routes: ApiRoutes::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            debounce_millis: DEFAULT_DEBOUNCE_MILLIS,
            write_policy: WritePolicy::default(),
            admin_key: None,
        }
        .normalized()
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::InvalidConfiguration(format!("invalid config JSON: {error}")))?;
        config.normalized()
    }

    /// Trim values and check the base URL, routes, and bounds.
    pub fn normalized(mut self) -> Result<Self> {
        let base = normalize_text_option(Some(self.api_base_url))
            .ok_or_else(|| Error::InvalidConfiguration("API base URL must not be empty".into()))?;
        if !is_http_url(&base) {
            return Err(Error::InvalidConfiguration(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
        self.api_base_url = base.trim_end_matches('/').to_string();
        self.routes.normalize()?;
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfiguration(
                "request timeout must be at least one second".to_string(),
            ));
        }
        self.admin_key = normalize_text_option(self.admin_key);
        Ok(self)
    }

    #[must_use]
    pub fn with_routes(mut self, routes: ApiRoutes) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_debounce_millis(mut self, millis: u64) -> Self {
        self.debounce_millis = millis;
        self
    }

    #[must_use]
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    #[must_use]
    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = normalize_text_option(Some(key.into()));
        self
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_millis)
    }

    /// Absolute URL for a route path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url,
            path.trim().trim_start_matches('/')
        )
    }
}
