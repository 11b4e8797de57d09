// Device API HTTP client
//
// Wraps `reqwest::Client` with vendor-specific URL construction and status
// mapping. Two endpoints exist: a consolidated state document per device
// (`GET /device/{mac}/info`) and a command relay (`PUT /mqtt/command`) that
// forwards a single named attribute mutation to the stove.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{CommandPayload, DeviceSnapshot};

const DEFAULT_API_URL: &str = "https://fxtj7xkgc6.execute-api.eu-central-1.amazonaws.com/prod/";
const DEFAULT_AUTH_URL: &str = "https://cognito-idp.eu-central-1.amazonaws.com/";
const DEFAULT_CLIENT_ID: &str = "7sc1qltkqobo3ddqsk4542dg2h";

/// Async client for the vendor cloud.
///
/// Holds both the device API base URL and the identity-provider endpoint;
/// sign-in lives in [`crate::auth`] as inherent methods on this type.
pub struct CloudClient {
    http: reqwest::Client,
    api_url: Url,
    auth_url: Url,
    client_id: String,
}

impl CloudClient {
    /// Client against the production cloud endpoints.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Self::with_endpoints(DEFAULT_API_URL, DEFAULT_AUTH_URL, DEFAULT_CLIENT_ID, transport)
    }

    /// Client against explicit endpoints (tests, regional deployments).
    pub fn with_endpoints(
        api_url: &str,
        auth_url: &str,
        client_id: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            api_url: normalize_base_url(api_url)?,
            auth_url: Url::parse(auth_url)?,
            client_id: client_id.into(),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the consolidated state document for one device.
    ///
    /// A single blocking round-trip; the cloud offers no partial or delta
    /// fetch. Any non-2xx status surfaces as a typed error.
    pub async fn device_info(
        &self,
        token: &SecretString,
        mac_address: &str,
    ) -> Result<DeviceSnapshot, Error> {
        let url = self.api_url.join(&format!("device/{mac_address}/info"))?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        handle_response(resp).await
    }

    /// Send one named attribute mutation to the device.
    ///
    /// Returns the raw acknowledgement body. Does not refresh any cached
    /// state -- that is the caller's responsibility.
    pub async fn send_command(
        &self,
        token: &SecretString,
        payload: &CommandPayload,
    ) -> Result<Value, Error> {
        let url = self.api_url.join("mqtt/command")?;
        debug!("PUT {url} name={} value={}", payload.name, payload.value);

        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(payload)
            .send()
            .await?;

        handle_response(resp).await
    }
}

/// Force a trailing slash so `Url::join` treats the last path segment as a
/// directory instead of replacing it.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("bearer token rejected (HTTP {status}): {body}"),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        });
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview = &body[..body.len().min(200)];
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://example.com/prod").unwrap();
        assert_eq!(url.as_str(), "https://example.com/prod/");
        let joined = url.join("device/aa/info").unwrap();
        assert_eq!(joined.path(), "/prod/device/aa/info");
    }

    #[test]
    fn base_url_keeps_existing_slash() {
        let url = normalize_base_url("https://example.com/prod/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/prod/");
    }
}
