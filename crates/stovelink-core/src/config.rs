// ── Runtime configuration ──
//
// Describes *which* stove to coordinate and *how* to reach the cloud.
// Carries credential data and tuning, but never touches disk -- the config
// crate (or a host application) constructs a `StoveConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::MacAddress;

/// Default refresh cadence. Historical firmware variants have shipped with
/// anything from 15 s to 240 s; the interval is configuration, not contract.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(240);

/// Default per-cycle timeout covering token refresh plus the state fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for coordinating a single stove.
///
/// One config, one device -- a second stove gets its own `Coordinator`.
#[derive(Debug, Clone)]
pub struct StoveConfig {
    /// Device identity, used in API paths and command payloads.
    pub mac_address: MacAddress,
    /// Cloud account username.
    pub username: String,
    /// Cloud account password.
    pub password: SecretString,
    /// Device API base URL override (`None` = production cloud).
    pub api_url: Option<Url>,
    /// Identity provider URL override (`None` = production pool).
    pub auth_url: Option<Url>,
    /// Identity pool app client id override.
    pub client_id: Option<String>,
    /// How often the background task refreshes the snapshot.
    pub refresh_interval: Duration,
    /// Timeout for one whole refresh cycle; elapsing counts as a fetch
    /// failure, not a crash.
    pub timeout: Duration,
}

impl StoveConfig {
    /// Config with production endpoints and default tuning.
    pub fn new(
        mac_address: MacAddress,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            mac_address,
            username: username.into(),
            password,
            api_url: None,
            auth_url: None,
            client_id: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
