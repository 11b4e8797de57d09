// ── Refresh coordinator ──
//
// Owns the bearer token, the cached device snapshot, and the refresh cycle.
// One coordinator per stove. All consumer reads go through the accessor
// surface here; nothing else in the workspace holds device state.
//
// Failure contract: a refresh that goes wrong -- sign-in rejected, transport
// error, bad payload, timeout -- leaves the previous snapshot untouched and
// yields exactly one `UpdateFailed` for that cycle. The fixed interval
// governs retry cadence; there is no backoff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use stovelink_api::types::DeviceSnapshot;
use stovelink_api::{CloudClient, TransportConfig, token_expiry};

use crate::config::StoveConfig;
use crate::error::CoreError;
use crate::model::{Alarm, MacAddress, OperationalPhase};

// ── RefreshHealth ────────────────────────────────────────────────────

/// Outcome of the most recent refresh cycle, observable by consumers.
///
/// Consumers treat the cached snapshot as valid regardless; `Failed` is the
/// signal to mark derived state as unavailable until the next `Ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshHealth {
    /// No refresh attempted yet (post-construction state).
    Pending,
    Ok {
        at: DateTime<Utc>,
    },
    Failed {
        at: DateTime<Utc>,
        message: String,
    },
}

impl RefreshHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

// ── Coordinator ──────────────────────────────────────────────────────

/// The single point of truth for one stove's cloud state.
///
/// Cheaply cloneable via `Arc`. Construction does no I/O -- the snapshot
/// starts empty and every accessor returns its documented default until the
/// first successful [`refresh()`](Self::refresh).
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: StoveConfig,
    client: CloudClient,
    /// Last-issued bearer token; replaced wholesale when stale.
    token: Mutex<Option<SecretString>>,
    /// Last good snapshot. Wholly replaced on success, never merged.
    snapshot_tx: watch::Sender<Arc<DeviceSnapshot>>,
    health_tx: watch::Sender<RefreshHealth>,
    /// Held for the duration of a refresh; `try_lock` failure means a cycle
    /// is already in flight and the new request coalesces into it.
    refresh_gate: Mutex<()>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Build a coordinator from configuration. Does not fetch anything.
    pub fn new(config: StoveConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };

        let client = match (&config.api_url, &config.auth_url, &config.client_id) {
            (None, None, None) => CloudClient::new(&transport)?,
            (Some(api), Some(auth), Some(client_id)) => CloudClient::with_endpoints(
                api.as_str(),
                auth.as_str(),
                client_id.clone(),
                &transport,
            )?,
            _ => {
                return Err(CoreError::Config {
                    message: "api_url, auth_url, and client_id overrides must be set together"
                        .into(),
                });
            }
        };

        let (snapshot_tx, _) = watch::channel(Arc::new(DeviceSnapshot::default()));
        let (health_tx, _) = watch::channel(RefreshHealth::Pending);

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                token: Mutex::new(None),
                snapshot_tx,
                health_tx,
                refresh_gate: Mutex::new(()),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// The MAC address this coordinator is bound to.
    pub fn mac_address(&self) -> &MacAddress {
        &self.inner.config.mac_address
    }

    // ── Token cache ──────────────────────────────────────────────────

    /// Classify a bearer token as expired.
    ///
    /// A token with a past `exp` claim, no `exp` claim, or that fails to
    /// decode at all is expired; only a decodable future expiry is valid.
    pub fn is_token_expired(token: &str) -> bool {
        match token_expiry(token) {
            Some(expiry) => expiry <= Utc::now(),
            None => true,
        }
    }

    /// Return the cached token, signing in again only when it is stale.
    async fn valid_token(&self) -> Result<SecretString, stovelink_api::Error> {
        let mut cached = self.inner.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if !Self::is_token_expired(token.expose_secret()) {
                return Ok(token.clone());
            }
            debug!("cached token is stale");
        }

        let fresh = self
            .inner
            .client
            .sign_in(&self.inner.config.username, &self.inner.config.password)
            .await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    // ── Refresh cycle ────────────────────────────────────────────────

    /// Fetch a fresh snapshot and replace the cache.
    ///
    /// At most one cycle runs at a time: a call that arrives while another
    /// is in flight returns `Ok(())` immediately without a duplicate fetch.
    /// The whole cycle (token check + fetch) is bounded by the configured
    /// timeout; elapsing counts as a failed cycle.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let Ok(_gate) = self.inner.refresh_gate.try_lock() else {
            debug!("refresh already in flight; coalescing");
            return Ok(());
        };

        let mac = self.inner.config.mac_address.as_str();
        let cycle = async {
            let token = self.valid_token().await?;
            self.inner.client.device_info(&token, mac).await
        };

        let timeout = self.inner.config.timeout;
        let outcome = match tokio::time::timeout(timeout, cycle).await {
            Ok(result) => result,
            Err(_) => Err(stovelink_api::Error::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(snapshot) => {
                self.inner.snapshot_tx.send_replace(Arc::new(snapshot));
                self.inner
                    .health_tx
                    .send_replace(RefreshHealth::Ok { at: Utc::now() });
                debug!("snapshot refreshed");
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, "refresh failed; keeping previous snapshot");
                self.inner.health_tx.send_replace(RefreshHealth::Failed {
                    at: Utc::now(),
                    message: source.to_string(),
                });
                Err(CoreError::UpdateFailed { source })
            }
        }
    }

    /// Spawn the periodic refresh loop.
    ///
    /// Ticks at the configured interval until [`shutdown()`](Self::shutdown).
    /// Failures are logged and swallowed -- the next tick retries.
    pub fn spawn_refresh_task(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        let interval = self.inner.config.refresh_interval;
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = coordinator.refresh().await {
                            warn!(error = %e, "scheduled refresh failed");
                        }
                    }
                }
            }
        })
    }

    /// Stop the periodic refresh loop.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DeviceSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Subscribe to refresh outcomes.
    pub fn subscribe_health(&self) -> watch::Receiver<RefreshHealth> {
        self.inner.health_tx.subscribe()
    }

    /// When the last successful refresh happened, if any.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        match &*self.inner.health_tx.borrow() {
            RefreshHealth::Ok { at } => Some(*at),
            RefreshHealth::Pending | RefreshHealth::Failed { .. } => None,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────
    //
    // Each accessor is a defensive walk over the cached document: any
    // missing ancestor yields the documented default instead of an error,
    // including on the empty pre-first-fetch snapshot.

    /// The whole cached document (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    fn with_snapshot<T>(&self, read: impl FnOnce(&DeviceSnapshot) -> T) -> T {
        read(&self.inner.snapshot_tx.borrow())
    }

    /// Ambient temperature in °C.
    pub fn temperature(&self) -> Option<f64> {
        self.with_snapshot(|s| s.status.as_ref()?.temperatures.as_ref()?.enviroment)
    }

    /// Target (setpoint) temperature in °C.
    pub fn target_temperature(&self) -> Option<f64> {
        self.with_snapshot(|s| {
            s.nvm
                .as_ref()?
                .user_parameters
                .as_ref()?
                .enviroment_1_temperature
        })
    }

    /// Configured ventilation level for fan `index` (1-based).
    pub fn fan_speed(&self, index: usize) -> Option<i64> {
        self.with_snapshot(|s| {
            s.nvm
                .as_ref()?
                .user_parameters
                .as_ref()?
                .fan_ventilation(index)
        })
    }

    /// Live speed of fan `index` as reported under `status.fans`.
    pub fn live_fan_speed(&self, index: usize) -> Option<i64> {
        self.with_snapshot(|s| s.status.as_ref()?.fans.as_ref()?.speed(index))
    }

    /// Number of installed fans.
    pub fn nb_fans(&self) -> Option<i64> {
        self.with_snapshot(|s| s.nvm.as_ref()?.installer_parameters.as_ref()?.fans_number)
    }

    /// Commanded power state.
    pub fn power(&self) -> Option<bool> {
        self.with_snapshot(|s| s.status.as_ref()?.commands.as_ref()?.power)
    }

    /// Power level actually being delivered.
    pub fn actual_power(&self) -> Option<i64> {
        self.with_snapshot(|s| s.status.as_ref()?.state.as_ref()?.actual_power)
    }

    /// Whether the pellet tank has dropped to reserve.
    pub fn pellet_in_reserve(&self) -> Option<bool> {
        self.with_snapshot(|s| s.status.as_ref()?.flags.as_ref()?.is_pellet_in_reserve)
    }

    pub fn airkare_active(&self) -> Option<bool> {
        self.with_snapshot(|s| s.status.as_ref()?.flags.as_ref()?.is_airkare_active)
    }

    pub fn relax_active(&self) -> Option<bool> {
        self.with_snapshot(|s| s.status.as_ref()?.flags.as_ref()?.is_relax_active)
    }

    /// Whether the weekly programmer (chrono mode) is active.
    pub fn chrono_mode_active(&self) -> Option<bool> {
        self.with_snapshot(|s| s.nvm.as_ref()?.chrono.as_ref()?.is_active)
    }

    /// Current operating phase, mapped from the wire integer code.
    pub fn operational_phase(&self) -> Option<OperationalPhase> {
        self.with_snapshot(|s| {
            s.status
                .as_ref()?
                .state
                .as_ref()?
                .operational_phase
                .map(OperationalPhase::from_code)
        })
    }

    /// Remaining pellet autonomy in seconds.
    pub fn autonomy_seconds(&self) -> Option<i64> {
        self.with_snapshot(|s| s.status.as_ref()?.pellet.as_ref()?.autonomy_time)
    }

    /// Whether standby mode is active. Defaults to `false` when unreported.
    pub fn standby_mode(&self) -> bool {
        self.with_snapshot(|s| {
            s.status
                .as_ref()
                .and_then(|status| status.flags.as_ref())
                .and_then(|flags| flags.is_standby_active)
                .unwrap_or(false)
        })
    }

    /// Standby trigger delay in seconds.
    pub fn standby_waiting_time(&self) -> Option<i64> {
        self.with_snapshot(|s| {
            s.nvm
                .as_ref()?
                .user_parameters
                .as_ref()?
                .standby_waiting_time
        })
    }

    /// Lifetime ignition count.
    pub fn power_ons(&self) -> Option<i64> {
        self.with_snapshot(|s| s.nvm.as_ref()?.total_counters.as_ref()?.power_ons)
    }

    /// Whether the stove runs in automatic mode. Defaults to `false`.
    pub fn is_auto(&self) -> bool {
        self.with_snapshot(|s| {
            s.nvm
                .as_ref()
                .and_then(|nvm| nvm.user_parameters.as_ref())
                .and_then(|params| params.is_auto)
                .unwrap_or(false)
        })
    }

    /// Manual power level (1-5), meaningful when not in automatic mode.
    pub fn manual_power(&self) -> Option<i64> {
        self.with_snapshot(|s| s.nvm.as_ref()?.user_parameters.as_ref()?.manual_power)
    }

    /// Live entries of the alarm log.
    ///
    /// The log's `index` says how many entries are live; it is clamped to
    /// the physically present array, so an overstated index cannot fail.
    pub fn alarms(&self) -> Vec<Alarm> {
        self.with_snapshot(|s| {
            let Some(log) = s.nvm.as_ref().and_then(|nvm| nvm.alarms_log.as_ref()) else {
                return Vec::new();
            };
            let entries = log.alarms.as_deref().unwrap_or_default();
            let live = usize::try_from(log.index.unwrap_or(0)).unwrap_or(0);
            entries.iter().take(live).map(Alarm::from).collect()
        })
    }

    /// Raw alarm-log index (may overstate the stored entries).
    pub fn nb_alarms(&self) -> Option<i64> {
        self.with_snapshot(|s| s.nvm.as_ref()?.alarms_log.as_ref()?.index)
    }

    // ── Internal access for the command path ─────────────────────────

    pub(crate) fn client(&self) -> &CloudClient {
        &self.inner.client
    }

    pub(crate) async fn command_token(&self) -> Result<SecretString, CoreError> {
        self.valid_token().await.map_err(CoreError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn test_coordinator() -> Coordinator {
        let config = StoveConfig::new(
            MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap(),
            "user@example.com",
            SecretString::from("password".to_string()),
        );
        Coordinator::new(config).unwrap()
    }

    fn with_data(value: serde_json::Value) -> Coordinator {
        let coordinator = test_coordinator();
        let snapshot: DeviceSnapshot = serde_json::from_value(value).unwrap();
        coordinator
            .inner
            .snapshot_tx
            .send_replace(Arc::new(snapshot));
        coordinator
    }

    fn make_token(exp_offset_secs: i64) -> String {
        let exp = Utc::now().timestamp() + exp_offset_secs;
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": "none"}).to_string());
        let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string());
        format!("{header}.{payload}.sig")
    }

    // ── Token staleness ──────────────────────────────────────────────

    #[test]
    fn token_expired_in_the_past() {
        assert!(Coordinator::is_token_expired(&make_token(-10)));
    }

    #[test]
    fn token_valid_in_the_future() {
        assert!(!Coordinator::is_token_expired(&make_token(3600)));
    }

    #[test]
    fn token_without_exp_claim_is_expired() {
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": "none"}).to_string());
        let payload = URL_SAFE_NO_PAD.encode(json!({}).to_string());
        assert!(Coordinator::is_token_expired(&format!(
            "{header}.{payload}.sig"
        )));
    }

    #[test]
    fn undecodable_token_is_expired() {
        assert!(Coordinator::is_token_expired("not.a.jwt"));
    }

    // ── Accessor defaults on the empty snapshot ──────────────────────

    #[test]
    fn empty_snapshot_yields_documented_defaults() {
        let c = test_coordinator();

        assert_eq!(c.temperature(), None);
        assert_eq!(c.target_temperature(), None);
        assert_eq!(c.fan_speed(1), None);
        assert_eq!(c.live_fan_speed(1), None);
        assert_eq!(c.nb_fans(), None);
        assert_eq!(c.power(), None);
        assert_eq!(c.actual_power(), None);
        assert_eq!(c.pellet_in_reserve(), None);
        assert_eq!(c.airkare_active(), None);
        assert_eq!(c.relax_active(), None);
        assert_eq!(c.chrono_mode_active(), None);
        assert_eq!(c.operational_phase(), None);
        assert_eq!(c.autonomy_seconds(), None);
        assert!(!c.standby_mode());
        assert_eq!(c.standby_waiting_time(), None);
        assert_eq!(c.power_ons(), None);
        assert!(!c.is_auto());
        assert_eq!(c.manual_power(), None);
        assert!(c.alarms().is_empty());
        assert_eq!(c.nb_alarms(), None);
        assert_eq!(c.last_refresh(), None);
    }

    // ── Partial documents ────────────────────────────────────────────

    #[test]
    fn missing_intermediate_branches_degrade_to_defaults() {
        let c = with_data(json!({ "status": {} }));
        assert_eq!(c.temperature(), None);
        assert_eq!(c.fan_speed(1), None);

        let c = with_data(json!({ "nvm": {} }));
        assert_eq!(c.target_temperature(), None);
        assert_eq!(c.nb_fans(), None);
        assert!(c.alarms().is_empty());
    }

    // ── Populated documents ──────────────────────────────────────────

    #[test]
    fn temperature_reads_nested_value() {
        let c = with_data(json!({
            "status": { "temperatures": { "enviroment": 22.5 } }
        }));
        assert_eq!(c.temperature(), Some(22.5));
    }

    #[test]
    fn fan_accessors_read_both_surfaces() {
        let c = with_data(json!({
            "status": { "fans": { "fan_1_speed": 2 } },
            "nvm": {
                "user_parameters": { "fan_1_ventilation": 3 },
                "installer_parameters": { "fans_number": 2 },
            },
        }));
        assert_eq!(c.fan_speed(1), Some(3));
        assert_eq!(c.live_fan_speed(1), Some(2));
        assert_eq!(c.nb_fans(), Some(2));
        assert_eq!(c.fan_speed(2), None);
    }

    #[test]
    fn phase_maps_through_lookup_table() {
        let c = with_data(json!({ "status": { "state": { "operational_phase": 2 } } }));
        assert_eq!(c.operational_phase(), Some(OperationalPhase::On));

        let c = with_data(json!({ "status": { "state": { "operational_phase": 99 } } }));
        assert_eq!(c.operational_phase(), Some(OperationalPhase::Unknown));
    }

    #[test]
    fn auto_and_counters_read_nvm() {
        let c = with_data(json!({
            "nvm": {
                "user_parameters": { "is_auto": true, "manual_power": 3 },
                "total_counters": { "power_ons": 42 },
            }
        }));
        assert!(c.is_auto());
        assert_eq!(c.manual_power(), Some(3));
        assert_eq!(c.power_ons(), Some(42));
    }

    // ── Alarm log clamping ───────────────────────────────────────────

    #[test]
    fn alarms_clamp_overstated_index() {
        let c = with_data(json!({
            "nvm": { "alarms_log": {
                "index": 10,
                "alarms": [
                    { "type": 1, "timestamp": 1_650_000_000 },
                    { "type": 2, "timestamp": 1_650_000_100 },
                ],
            }}
        }));
        let alarms = c.alarms();
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].code, Some(1));
        assert_eq!(alarms[1].code, Some(2));
    }

    #[test]
    fn alarms_index_zero_is_empty() {
        let c = with_data(json!({
            "nvm": { "alarms_log": {
                "index": 0,
                "alarms": [{ "type": 1, "timestamp": 1_650_000_000 }],
            }}
        }));
        assert!(c.alarms().is_empty());
        assert_eq!(c.nb_alarms(), Some(0));
    }

    #[test]
    fn alarms_window_takes_index_prefix() {
        let c = with_data(json!({
            "nvm": { "alarms_log": {
                "index": 1,
                "alarms": [
                    { "type": 1, "timestamp": 1_650_000_000 },
                    { "type": 2, "timestamp": 1_650_000_100 },
                ],
            }}
        }));
        assert_eq!(c.alarms().len(), 1);
    }

    #[test]
    fn alarms_missing_array_is_empty() {
        let c = with_data(json!({ "nvm": { "alarms_log": { "index": 5 } } }));
        assert!(c.alarms().is_empty());
        assert_eq!(c.nb_alarms(), Some(5));
    }

    // ── Idempotence ──────────────────────────────────────────────────

    #[test]
    fn accessors_are_idempotent_between_refreshes() {
        let c = with_data(json!({
            "status": { "temperatures": { "enviroment": 18.0 } },
            "nvm": { "alarms_log": { "index": 1, "alarms": [{ "type": 4 }] } },
        }));
        assert_eq!(c.temperature(), c.temperature());
        assert_eq!(c.alarms(), c.alarms());
        assert_eq!(c.snapshot(), c.snapshot());
    }
}
