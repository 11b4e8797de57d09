// ── Core error types ──
//
// User-facing errors from stovelink-core. Consumers never see raw HTTP
// details from the refresh path -- everything that goes wrong during a
// scheduled cycle collapses into `UpdateFailed` with the cause attached.
// Explicit command failures keep their shape so callers can report them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Refresh path ─────────────────────────────────────────────────
    /// A refresh cycle failed; the previously cached snapshot is retained.
    #[error("Update failed: {source}")]
    UpdateFailed {
        #[source]
        source: stovelink_api::Error,
    },

    // ── Command / auth path ──────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Standby can only be toggled while the stove runs in automatic mode.
    #[error("Stove is not in automatic mode")]
    NotInAutoMode,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cloud API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<stovelink_api::Error> for CoreError {
    fn from(err: stovelink_api::Error) -> Self {
        match err {
            stovelink_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            stovelink_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            stovelink_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            stovelink_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            stovelink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            stovelink_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<crate::model::InvalidMacAddress> for CoreError {
    fn from(err: crate::model::InvalidMacAddress) -> Self {
        CoreError::Config {
            message: err.to_string(),
        }
    }
}
