//! Shared configuration for stovelink consumers.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `stovelink_core::StoveConfig`. The core crate never reads
//! disk -- everything file- or environment-shaped lives here.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stovelink_core::{MacAddress, StoveConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Named stove profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by explicit name or fall back to the default.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

/// One stove. The MAC address is the device identity; everything else is
/// account credentials and tuning.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Device MAC address (any common format; validated on load).
    pub mac_address: String,

    /// Cloud account username.
    pub username: String,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Refresh cadence in seconds.
    pub refresh_interval: Option<u64>,

    /// Per-cycle timeout in seconds.
    pub timeout: Option<u64>,

    /// Device API base URL override (testing / regional deployments).
    pub api_url: Option<String>,

    /// Identity provider URL override.
    pub auth_url: Option<String>,

    /// Identity pool app client id override.
    pub client_id: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "stovelink", "stovelink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("stovelink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from an explicit file path + environment.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("STOVELINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the account password from the credential chain.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new("stovelink", &format!("{profile_name}/password")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `StoveConfig` from a profile.
///
/// MAC syntax is validated here -- a malformed address never reaches the
/// coordinator. Endpoint overrides are parsed as URLs for the same reason.
pub fn profile_to_stove_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<StoveConfig, ConfigError> {
    let mac_address =
        MacAddress::parse(&profile.mac_address).map_err(|e| ConfigError::Validation {
            field: "mac_address".into(),
            reason: e.to_string(),
        })?;

    let password = resolve_password(profile, profile_name)?;

    let mut config = StoveConfig::new(mac_address, profile.username.clone(), password);

    if let Some(secs) = profile.refresh_interval {
        config.refresh_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    config.api_url = parse_url_field(profile.api_url.as_deref(), "api_url")?;
    config.auth_url = parse_url_field(profile.auth_url.as_deref(), "auth_url")?;
    config.client_id = profile.client_id.clone();

    Ok(config)
}

fn parse_url_field(raw: Option<&str>, field: &str) -> Result<Option<url::Url>, ConfigError> {
    raw.map(|s| {
        s.parse().map_err(|_| ConfigError::Validation {
            field: field.into(),
            reason: format!("invalid URL: {s}"),
        })
    })
    .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(mac: &str) -> Profile {
        Profile {
            mac_address: mac.into(),
            username: "user@example.com".into(),
            password: Some("hunter2".into()),
            password_env: None,
            refresh_interval: Some(15),
            timeout: None,
            api_url: None,
            auth_url: None,
            client_id: None,
        }
    }

    #[test]
    fn profile_translates_with_normalized_mac() {
        let config = profile_to_stove_config(&profile("AA-BB-CC-DD-EE-FF"), "default").unwrap();
        assert_eq!(config.mac_address.as_str(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert_eq!(config.timeout, stovelink_core::config::DEFAULT_TIMEOUT);
    }

    #[test]
    fn malformed_mac_is_rejected_at_load_time() {
        let err = profile_to_stove_config(&profile("kitchen-stove"), "default").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation { ref field, .. } if field == "mac_address"
        ));
    }

    #[test]
    fn missing_password_is_an_error() {
        let mut p = profile("aa:bb:cc:dd:ee:ff");
        p.password = None;
        let err = profile_to_stove_config(&p, "default").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn config_parses_from_toml() {
        let toml_str = r#"
            default_profile = "living-room"

            [profiles.living-room]
            mac_address = "AA:BB:CC:DD:EE:FF"
            username = "user@example.com"
            password = "hunter2"
            refresh_interval = 240
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "living-room");
        assert_eq!(profile.username, "user@example.com");
        assert_eq!(profile.refresh_interval, Some(240));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.profile(Some("garage")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }
}
