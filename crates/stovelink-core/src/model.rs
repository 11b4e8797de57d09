// ── Domain model ──
//
// MacAddress is the device identity everywhere (config, API paths, command
// payloads) and is validated at the edge -- a malformed address never makes
// it into a Coordinator. OperationalPhase and Alarm are the two places the
// wire document's raw integers get a typed reading.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stovelink_api::types::AlarmEntry;

// ── MacAddress ──────────────────────────────────────────────────────

/// Rejected MAC address string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid MAC address: {raw:?}")]
pub struct InvalidMacAddress {
    pub raw: String,
}

/// MAC address, validated and normalized to lowercase colon-separated
/// format (`aa:bb:cc:dd:ee:ff`).
///
/// Accepts colon-separated, dash-separated, or bare 12-digit hex input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse and normalize a MAC address from any common format.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, InvalidMacAddress> {
        let raw = raw.as_ref();
        let stripped: String = raw.chars().filter(|c| !matches!(c, ':' | '-')).collect();

        let has_valid_separators = {
            let groups: Vec<&str> = raw.split([':', '-']).collect();
            groups.len() == 1 || (groups.len() == 6 && groups.iter().all(|g| g.len() == 2))
        };

        if stripped.len() != 12
            || !stripped.chars().all(|c| c.is_ascii_hexdigit())
            || !has_valid_separators
        {
            return Err(InvalidMacAddress { raw: raw.into() });
        }

        let lower = stripped.to_lowercase();
        let octets: Vec<&str> = lower
            .as_bytes()
            .chunks(2)
            .map(|pair| std::str::from_utf8(pair).unwrap_or_default())
            .collect();
        Ok(Self(octets.join(":")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = InvalidMacAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = InvalidMacAddress;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

// ── OperationalPhase ────────────────────────────────────────────────

/// Operating phase reported under `status.state.operational_phase`.
///
/// Codes outside the documented table land in [`Unknown`](Self::Unknown)
/// rather than leaking a raw integer to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[non_exhaustive]
pub enum OperationalPhase {
    Off,
    Ignition,
    On,
    Shutdown,
    Cooling,
    Alarm,
    #[strum(serialize = "Final cleaning")]
    FinalCleaning,
    Unknown,
}

impl OperationalPhase {
    /// Map the wire integer code to a phase.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::Ignition,
            2 => Self::On,
            3 => Self::Shutdown,
            4 => Self::Cooling,
            5 => Self::Alarm,
            6 => Self::FinalCleaning,
            _ => Self::Unknown,
        }
    }

    pub fn is_burning(&self) -> bool {
        matches!(self, Self::Ignition | Self::On)
    }
}

// ── Alarm ───────────────────────────────────────────────────────────

/// One live entry from the device's alarm log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Vendor alarm code.
    pub code: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&AlarmEntry> for Alarm {
    fn from(entry: &AlarmEntry) -> Self {
        Self {
            code: entry.alarm_type,
            timestamp: entry
                .timestamp
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}
