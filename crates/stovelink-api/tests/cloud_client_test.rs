#![allow(clippy::unwrap_used)]
// Integration tests for `CloudClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stovelink_api::types::CommandPayload;
use stovelink_api::{CloudClient, Error, TransportConfig};

const MAC: &str = "aa:bb:cc:dd:ee:ff";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudClient) {
    let server = MockServer::start().await;
    let client = CloudClient::with_endpoints(
        &format!("{}/prod", server.uri()),
        &server.uri(),
        "test-client-id",
        &TransportConfig::default(),
    )
    .expect("client should build");
    (server, client)
}

fn token() -> SecretString {
    SecretString::from("header.payload.sig".to_string())
}

// ── Device info ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_info_full_document() {
    let (server, client) = setup().await;

    let body = json!({
        "status": {
            "temperatures": { "enviroment": 21.5 },
            "commands": { "power": true },
            "flags": { "is_airkare_active": false, "is_pellet_in_reserve": true },
            "fans": { "fan_1_speed": 3 },
            "state": { "operational_phase": 2, "actual_power": 4 },
            "pellet": { "autonomy_time": 7200 },
        },
        "nvm": {
            "user_parameters": { "enviroment_1_temperature": 20.0, "is_auto": true },
            "installer_parameters": { "fans_number": 2 },
            "alarms_log": { "index": 0, "alarms": [] },
        },
    });

    Mock::given(method("GET"))
        .and(path(format!("/prod/device/{MAC}/info")))
        .and(header("authorization", "Bearer header.payload.sig"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let snap = client.device_info(&token(), MAC).await.unwrap();

    let status = snap.status.unwrap();
    assert_eq!(status.temperatures.unwrap().enviroment, Some(21.5));
    assert_eq!(status.commands.unwrap().power, Some(true));
    assert_eq!(status.fans.unwrap().speed(1), Some(3));
    assert_eq!(status.state.unwrap().operational_phase, Some(2));

    let nvm = snap.nvm.unwrap();
    assert_eq!(nvm.installer_parameters.unwrap().fans_number, Some(2));
    assert_eq!(nvm.user_parameters.unwrap().is_auto, Some(true));
}

#[tokio::test]
async fn test_device_info_partial_document() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/prod/device/{MAC}/info")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": {} })))
        .mount(&server)
        .await;

    let snap = client.device_info(&token(), MAC).await.unwrap();
    let status = snap.status.unwrap();
    assert!(status.temperatures.is_none());
    assert!(snap.nvm.is_none());
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_command_payload_shape() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/prod/mqtt/command"))
        .and(body_partial_json(json!({
            "name": "power",
            "value": true,
            "mac_address": MAC,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("Command sent")))
        .expect(1)
        .mount(&server)
        .await;

    let payload = CommandPayload {
        name: "power".into(),
        value: json!(true),
        mac_address: MAC.into(),
    };
    let ack = client.send_command(&token(), &payload).await.unwrap();
    assert_eq!(ack, json!("Command sent"));
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_error_401_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.device_info(&token(), MAC).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got {err:?}");
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_error_404_maps_to_api() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such device"))
        .mount(&server)
        .await;

    let err = client.device_info(&token(), MAC).await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such device");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_unparseable_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client.device_info(&token(), MAC).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got {err:?}");
}

// ── Sign-in ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_returns_access_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-amz-target", "AWSCognitoIdentityProviderService.InitiateAuth"))
        .and(body_partial_json(json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "AuthParameters": { "USERNAME": "user@example.com" },
            "ClientId": "test-client-id",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "AccessToken": "fresh.jwt.token",
                "ExpiresIn": 3600,
                "TokenType": "Bearer",
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client
        .sign_in("user@example.com", &SecretString::from("hunter2".to_string()))
        .await
        .unwrap();

    use secrecy::ExposeSecret;
    assert_eq!(token.expose_secret(), "fresh.jwt.token");
}

#[tokio::test]
async fn test_sign_in_rejection_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "NotAuthorizedException",
            "message": "Incorrect username or password.",
        })))
        .mount(&server)
        .await;

    let err = client
        .sign_in("user@example.com", &SecretString::from("wrong".to_string()))
        .await
        .unwrap_err();

    match err {
        Error::Authentication { message } => {
            assert!(message.contains("NotAuthorizedException"));
            assert!(message.contains("Incorrect username or password."));
        }
        other => panic!("expected Authentication error, got {other:?}"),
    }
}
