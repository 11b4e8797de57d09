// ── Command API ──
//
// All write operations are a single named attribute mutation relayed by the
// cloud to the stove. Commands run out-of-band from the refresh cycle and
// never touch the cached snapshot -- callers re-refresh afterwards when they
// need the change reflected.
//
// The wire mixes 0/1 integers and booleans per attribute; the mapping here
// mirrors what the vendor app sends.

use serde_json::{Value, json};
use tracing::debug;

use stovelink_api::types::CommandPayload;

use crate::coordinator::Coordinator;
use crate::error::CoreError;

/// All mutations supported by the device endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Turn the stove on or off.
    SetPower(bool),
    /// Target temperature in °C (automatic mode setpoint).
    SetTargetTemperature(f64),
    /// Ventilation level for one fan (1-based index).
    SetFanSpeed { index: u8, value: u8 },
    SetAirkare(bool),
    SetRelax(bool),
    /// Weekly programmer on/off.
    SetChronoMode(bool),
    /// Standby on/off. Only accepted while the stove is in automatic mode.
    SetStandby(bool),
    /// Switch between automatic and manual regulation.
    SetAutoMode(bool),
    /// Manual power level (1-5), meaningful outside automatic mode.
    SetManualPower(u8),
    /// Ask the stove to re-run its configuration self-check.
    CheckConfiguration,
}

impl Command {
    /// Wire attribute name.
    pub fn name(&self) -> String {
        match self {
            Self::SetPower(_) => "power".into(),
            Self::SetTargetTemperature(_) => "enviroment_1_temperature".into(),
            Self::SetFanSpeed { index, .. } => format!("fan_{index}_speed"),
            Self::SetAirkare(_) => "airkare_function".into(),
            Self::SetRelax(_) => "relax_mode".into(),
            Self::SetChronoMode(_) => "chrono_mode".into(),
            Self::SetStandby(_) => "standby_mode".into(),
            Self::SetAutoMode(_) => "auto_mode".into(),
            Self::SetManualPower(_) => "manual_power".into(),
            Self::CheckConfiguration => "check".into(),
        }
    }

    /// Wire attribute value.
    pub fn value(&self) -> Value {
        match self {
            Self::SetPower(on) | Self::SetAirkare(on) => json!(i32::from(*on)),
            Self::SetTargetTemperature(temp) => json!(temp),
            Self::SetFanSpeed { value, .. } => json!(value),
            Self::SetRelax(on)
            | Self::SetChronoMode(on)
            | Self::SetStandby(on)
            | Self::SetAutoMode(on) => json!(on),
            Self::SetManualPower(level) => json!(level),
            Self::CheckConfiguration => json!(false),
        }
    }

    pub(crate) fn to_payload(&self, mac_address: &str) -> CommandPayload {
        CommandPayload {
            name: self.name(),
            value: self.value(),
            mac_address: mac_address.to_owned(),
        }
    }
}

impl Coordinator {
    /// Execute a command against the stove and return the raw cloud ack.
    ///
    /// Reuses the coordinator's token cache for authorization. The cached
    /// snapshot is left untouched either way -- call
    /// [`refresh()`](Coordinator::refresh) afterwards to see the effect.
    ///
    /// `SetStandby` carries a device-state precondition: the stove must be
    /// in automatic mode. The check reads a fresh document (not the cache)
    /// immediately before sending and rejects with
    /// [`CoreError::NotInAutoMode`] otherwise.
    pub async fn execute(&self, command: Command) -> Result<Value, CoreError> {
        let token = self.command_token().await?;
        let mac = self.mac_address().as_str();

        if let Command::SetStandby(_) = command {
            let fresh = self.client().device_info(&token, mac).await?;
            let auto = fresh
                .nvm
                .as_ref()
                .and_then(|nvm| nvm.user_parameters.as_ref())
                .and_then(|params| params.is_auto)
                .unwrap_or(false);
            if !auto {
                return Err(CoreError::NotInAutoMode);
            }
        }

        let payload = command.to_payload(mac);
        debug!(name = %payload.name, value = %payload.value, "sending command");
        let ack = self.client().send_command(&token, &payload).await?;
        Ok(ack)
    }
}
