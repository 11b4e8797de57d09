// Identity-provider authentication
//
// Sign-in goes through the vendor's hosted identity pool (an AWS Cognito
// user pool) with the USER_PASSWORD_AUTH flow. The returned access token is
// a JWT whose `exp` claim drives the caller's staleness check -- the token
// is otherwise opaque and never verified locally.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::CloudClient;
use crate::error::Error;

const AMZ_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const AMZ_TARGET_INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";

#[derive(Deserialize)]
struct InitiateAuthResponse {
    #[serde(rename = "AuthenticationResult")]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Deserialize)]
struct AuthenticationResult {
    #[serde(rename = "AccessToken")]
    access_token: Option<String>,
}

/// Error shape from the identity provider (`{"__type": ..., "message": ...}`).
#[derive(Deserialize)]
struct IdentityError {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    message: Option<String>,
}

impl CloudClient {
    /// Sign in with username/password and return a fresh bearer token.
    ///
    /// One round-trip to the identity provider; no session state is kept
    /// here -- the caller owns the token and its expiry bookkeeping.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, Error> {
        debug!("signing in at {}", self.auth_url());

        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "AuthParameters": {
                "USERNAME": username,
                "PASSWORD": password.expose_secret(),
            },
            "ClientId": self.client_id(),
        });

        let resp = self
            .http()
            .post(self.auth_url().clone())
            .header(reqwest::header::CONTENT_TYPE, AMZ_CONTENT_TYPE)
            .header("x-amz-target", AMZ_TARGET_INITIATE_AUTH)
            .body(body.to_string())
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;

        if !status.is_success() {
            // The identity provider reports rejections as 400 with a typed body.
            let message = serde_json::from_str::<IdentityError>(&raw)
                .ok()
                .map_or_else(
                    || format!("sign-in failed (HTTP {status})"),
                    |e| {
                        format!(
                            "{}: {}",
                            e.error_type.unwrap_or_else(|| "SignInError".into()),
                            e.message.unwrap_or_else(|| status.to_string()),
                        )
                    },
                );
            return Err(Error::Authentication { message });
        }

        let parsed: InitiateAuthResponse =
            serde_json::from_str(&raw).map_err(|e| Error::Deserialization {
                message: format!("invalid sign-in response: {e}"),
                body: raw.clone(),
            })?;

        let token = parsed
            .authentication_result
            .and_then(|r| r.access_token)
            .ok_or_else(|| Error::Authentication {
                message: "sign-in response carried no access token".into(),
            })?;

        debug!("sign-in successful");
        Ok(SecretString::from(token))
    }
}

/// Decode the `exp` claim from a JWT access token.
///
/// Returns `None` for anything that is not a decodable JWT with a numeric
/// `exp` claim -- callers treat that exactly like an expired token.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}
