use thiserror::Error;

/// Top-level error type for the `stovelink-api` crate.
///
/// Covers every failure mode of the vendor cloud surface: identity-provider
/// sign-in, device-info fetch, and command send. `stovelink-core` maps these
/// into domain-level variants -- consumers never branch on raw HTTP details.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Sign-in rejected (wrong credentials, disabled account) or the
    /// device endpoint refused the bearer token (401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Protocol ────────────────────────────────────────────────────
    /// Unexpected HTTP status from the device API.
    #[error("Cloud API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the bearer token was rejected
    /// and a fresh sign-in might resolve it.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next scheduled cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
