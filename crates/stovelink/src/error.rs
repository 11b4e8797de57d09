//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use stovelink_config::ConfigError;
use stovelink_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const PRECONDITION: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("No usable configuration")]
    #[diagnostic(
        code(stovelink::no_config),
        help(
            "Create {path} with a [profiles.<name>] section holding\n\
             mac_address, username, and password (or password_env)."
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(stovelink::config))]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(stovelink::auth_failed),
        help("Verify the username and password for your cloud account.")
    )]
    Auth { message: String },

    #[error("The stove is not in automatic mode")]
    #[diagnostic(
        code(stovelink::not_in_auto_mode),
        help("Standby can only be toggled in automatic mode. Run `stovelink auto` first.")
    )]
    NotInAutoMode,

    #[error("Could not refresh stove state: {message}")]
    #[diagnostic(
        code(stovelink::update_failed),
        help("The cloud or the stove may be temporarily unreachable; try again shortly.")
    )]
    UpdateFailed { message: String },

    #[error("Request timed out")]
    #[diagnostic(code(stovelink::timeout))]
    Timeout,

    #[error("{message}")]
    #[diagnostic(code(stovelink::cloud))]
    Cloud { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Auth { .. } => exit_code::AUTH,
            Self::NotInAutoMode => exit_code::PRECONDITION,
            Self::UpdateFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Cloud { .. } => exit_code::GENERAL,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UpdateFailed { source } => Self::UpdateFailed {
                message: source.to_string(),
            },
            CoreError::AuthenticationFailed { message } => Self::Auth { message },
            CoreError::NotInAutoMode => Self::NotInAutoMode,
            CoreError::Timeout { .. } => Self::Timeout,
            CoreError::Api { message, .. } => Self::Cloud { message },
            CoreError::Config { message } | CoreError::Internal(message) => {
                Self::Cloud { message }
            }
        }
    }
}
