//! Wire types for the consolidated device-state document.
//!
//! The cloud returns one deeply nested JSON document per device. Stoves in
//! the field run a spread of firmware revisions, so any branch of the tree
//! may be absent -- every sub-tree is `Option` with `#[serde(default)]`, and
//! unknown fields are preserved in `extra` maps where the document is known
//! to carry firmware-dependent keys (per-fan speeds, user parameters).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Snapshot root ────────────────────────────────────────────────────

/// The full device-state document from `GET /device/{mac}/info`.
///
/// Wholly replaced on each successful fetch; never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub nvm: Option<Nvm>,
}

// ── status/* ─────────────────────────────────────────────────────────

/// Live operating state (`status` sub-tree).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub temperatures: Option<Temperatures>,
    #[serde(default)]
    pub commands: Option<Commands>,
    #[serde(default)]
    pub flags: Option<Flags>,
    #[serde(default)]
    pub fans: Option<Fans>,
    #[serde(default)]
    pub state: Option<State>,
    #[serde(default)]
    pub pellet: Option<Pellet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    /// Ambient temperature in degrees Celsius. The wire spelling
    /// ("enviroment") is the vendor's, not ours.
    #[serde(default)]
    pub enviroment: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commands {
    /// Commanded power state (on/off as seen by the cloud).
    #[serde(default)]
    pub power: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub is_airkare_active: Option<bool>,
    #[serde(default)]
    pub is_relax_active: Option<bool>,
    #[serde(default)]
    pub is_pellet_in_reserve: Option<bool>,
    #[serde(default)]
    pub is_standby_active: Option<bool>,
}

/// Live per-fan speeds, keyed `fan_1_speed`, `fan_2_speed`, ...
///
/// The set of keys depends on the installed fan count, so the map is kept
/// dynamic rather than enumerating a fixed number of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fans {
    #[serde(flatten)]
    pub speeds: HashMap<String, Value>,
}

impl Fans {
    /// Speed of fan `index` (1-based), if present and numeric.
    pub fn speed(&self, index: usize) -> Option<i64> {
        self.speeds
            .get(&format!("fan_{index}_speed"))
            .and_then(Value::as_i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Integer phase code; see the core crate's phase mapping.
    #[serde(default)]
    pub operational_phase: Option<i64>,
    /// Current power level actually delivered.
    #[serde(default)]
    pub actual_power: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pellet {
    /// Remaining autonomy in seconds at the current consumption rate.
    #[serde(default)]
    pub autonomy_time: Option<i64>,
}

// ── nvm/* ────────────────────────────────────────────────────────────

/// Non-volatile settings and counters (`nvm` sub-tree).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nvm {
    #[serde(default)]
    pub user_parameters: Option<UserParameters>,
    #[serde(default)]
    pub installer_parameters: Option<InstallerParameters>,
    #[serde(default)]
    pub chrono: Option<Chrono>,
    #[serde(default)]
    pub alarms_log: Option<AlarmsLog>,
    #[serde(default)]
    pub total_counters: Option<TotalCounters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserParameters {
    #[serde(default)]
    pub enviroment_1_temperature: Option<f64>,
    #[serde(default)]
    pub is_auto: Option<bool>,
    #[serde(default)]
    pub manual_power: Option<i64>,
    #[serde(default)]
    pub standby_waiting_time: Option<i64>,
    /// Firmware-dependent keys, notably `fan_{n}_ventilation`.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl UserParameters {
    /// Configured ventilation level for fan `index` (1-based).
    pub fn fan_ventilation(&self, index: usize) -> Option<i64> {
        self.extra
            .get(&format!("fan_{index}_ventilation"))
            .and_then(Value::as_i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallerParameters {
    #[serde(default)]
    pub fans_number: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chrono {
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Alarm ring buffer. `index` counts the live entries from the front of
/// `alarms`; firmware has been observed reporting an `index` larger than
/// the physically present array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmsLog {
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub alarms: Option<Vec<AlarmEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmEntry {
    /// Vendor alarm code.
    #[serde(rename = "type", default)]
    pub alarm_type: Option<i64>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalCounters {
    /// Lifetime ignition count.
    #[serde(default)]
    pub power_ons: Option<i64>,
}

// ── Commands ─────────────────────────────────────────────────────────

/// Body of `PUT /mqtt/command`: a single named attribute mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub name: String,
    pub value: Value,
    pub mac_address: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_parses_empty_document() {
        let snap: DeviceSnapshot = serde_json::from_value(json!({})).unwrap();
        assert!(snap.status.is_none());
        assert!(snap.nvm.is_none());
    }

    #[test]
    fn snapshot_ignores_unknown_branches() {
        let snap: DeviceSnapshot = serde_json::from_value(json!({
            "status": { "temperatures": { "enviroment": 19.0 }, "future_block": 1 },
            "telemetry": { "rssi": -60 },
        }))
        .unwrap();
        let temps = snap.status.unwrap().temperatures.unwrap();
        assert_eq!(temps.enviroment, Some(19.0));
    }

    #[test]
    fn fans_speed_lookup_by_index() {
        let fans: Fans =
            serde_json::from_value(json!({ "fan_1_speed": 3, "fan_2_speed": 0 })).unwrap();
        assert_eq!(fans.speed(1), Some(3));
        assert_eq!(fans.speed(2), Some(0));
        assert_eq!(fans.speed(3), None);
    }

    #[test]
    fn user_parameters_keep_fan_ventilation_keys() {
        let params: UserParameters = serde_json::from_value(json!({
            "is_auto": true,
            "fan_1_ventilation": 4,
        }))
        .unwrap();
        assert_eq!(params.is_auto, Some(true));
        assert_eq!(params.fan_ventilation(1), Some(4));
        assert_eq!(params.fan_ventilation(2), None);
    }

    #[test]
    fn alarm_entry_maps_type_field() {
        let entry: AlarmEntry =
            serde_json::from_value(json!({ "type": 7, "timestamp": 1650000000 })).unwrap();
        assert_eq!(entry.alarm_type, Some(7));
        assert_eq!(entry.timestamp, Some(1650000000));
    }
}
