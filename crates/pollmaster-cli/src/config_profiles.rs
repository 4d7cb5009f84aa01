//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use pollmaster_core::config::ApiRoutes;
use pollmaster_core::{ClientConfig, RoundingPolicy, WritePolicy};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const APP_DIR_NAME: &str = "pollmaster";
pub const PROFILE_ENV_VAR: &str = "POLLMASTER_PROFILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStyle {
    #[default]
    Nested,
    Flat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    #[default]
    Admin,
    Owner,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    #[default]
    Remote,
    Local,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub routes: Option<RouteStyle>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub write_policy: Option<PolicyName>,
    #[serde(default)]
    pub backend: Option<BackendMode>,
    #[serde(default)]
    pub rounding: Option<RoundingPolicy>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

impl fmt::Debug for CliProfile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CliProfile")
            .field("api_base_url", &self.api_base_url)
            .field("routes", &self.routes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("write_policy", &self.write_policy)
            .field("backend", &self.backend)
            .field("rounding", &self.rounding)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Directory holding one durable session/collection file per profile.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    pollmaster_core::util::normalize_text_option(value)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) =
            normalize_profile_name(std::env::var(PROFILE_ENV_VAR).ok().as_deref())
        {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn api_base_url(&self) -> Option<String> {
        normalize_text_option(self.api_base_url.clone())
    }

    pub fn backend(&self) -> BackendMode {
        self.backend.unwrap_or_default()
    }

    pub fn rounding(&self) -> RoundingPolicy {
        self.rounding.unwrap_or_default()
    }

    /// Core client settings for this profile.
    pub fn client_config(&self, profile_name: &str) -> Result<ClientConfig, CliError> {
        let base_url = self
            .api_base_url()
            .ok_or_else(|| CliError::ProfileNotConfigured(profile_name.to_string()))?;
        let routes = match self.routes.unwrap_or_default() {
            RouteStyle::Nested => ApiRoutes::default(),
            RouteStyle::Flat => ApiRoutes::flat(),
        };
        let policy = match self.write_policy.unwrap_or_default() {
            PolicyName::Admin => WritePolicy::admin_only(),
            PolicyName::Owner => WritePolicy::owner_or_admin(),
        };

        let mut config = ClientConfig::new(base_url)?
            .with_routes(routes)
            .with_write_policy(policy);
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_request_timeout(secs);
        }
        if let Some(key) = normalize_text_option(self.admin_key.clone()) {
            config = config.with_admin_key(key);
        }
        Ok(config.normalized()?)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.clone());
        self.admin_key = normalize_text_option(self.admin_key.clone());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some("default".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                api_base_url: Some(" http://localhost:5000 ".to_string()),
                routes: Some(RouteStyle::Flat),
                rounding: Some(RoundingPolicy::LargestRemainder),
                admin_key: Some("   ".to_string()),
                ..CliProfile::default()
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.api_base_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(profile.routes, Some(RouteStyle::Flat));
        assert_eq!(profile.rounding(), RoundingPolicy::LargestRemainder);
        assert_eq!(profile.admin_key, None);
    }

    #[test]
    fn missing_config_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name(Some("mobile")), "mobile");
        if std::env::var(PROFILE_ENV_VAR).is_err() {
            assert_eq!(config.resolve_profile_name(None), "work");
        }
    }

    #[test]
    fn client_config_maps_profile_choices() {
        let profile = CliProfile {
            api_base_url: Some("http://localhost:5000/".to_string()),
            routes: Some(RouteStyle::Flat),
            request_timeout_secs: Some(3),
            write_policy: Some(PolicyName::Owner),
            admin_key: Some("secret".to_string()),
            ..CliProfile::default()
        };

        let config = profile.client_config("default").unwrap();
        assert_eq!(config.routes.sign_in, "/login");
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.write_policy, WritePolicy::owner_or_admin());
        assert_eq!(config.admin_key.as_deref(), Some("secret"));
    }

    #[test]
    fn client_config_requires_base_url() {
        let error = CliProfile::default().client_config("work").unwrap_err();
        assert!(matches!(error, CliError::ProfileNotConfigured(name) if name == "work"));
    }

    #[test]
    fn debug_redacts_admin_key() {
        let profile = CliProfile {
            admin_key: Some("secret".to_string()),
            ..CliProfile::default()
        };
        let debug = format!("{profile:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
