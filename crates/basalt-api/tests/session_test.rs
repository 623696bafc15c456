// Session lifecycle tests for `BasClient` using wiremock.

use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use basalt_api::{ApiVersion, BasClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BasClient) {
    let server = MockServer::start().await;
    let client =
        BasClient::new(&server.uri(), ApiVersion::V2, &TransportConfig::default()).unwrap();
    (server, client)
}

fn token_body(token: &str, expires_in_secs: i64) -> serde_json::Value {
    json!({
        "accessToken": token,
        "expires": (Utc::now() + chrono::Duration::seconds(expires_in_secs)).to_rfc3339(),
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn login_stores_token_and_authorizes_requests() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .and(body_json(json!({ "username": "api", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok1", 3600)))
        .mount(&server)
        .await;

    assert!(client.access_token().is_none());

    let token = client
        .login("api", &SecretString::from("hunter2"), false)
        .await
        .unwrap();
    assert_eq!(token.token, "tok1");
    assert_eq!(client.access_token().unwrap(), token);

    // Subsequent reads carry the stored token as a bearer header.
    let id = uuid::Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/objects/{id}/attributes/name")))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "item": { "name": "AHU-1" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let variant = client.read_property(id, "name").await.unwrap().unwrap();
    assert_eq!(variant.display, "AHU-1");
}

#[tokio::test]
async fn malformed_token_body_preserves_previous_credential() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok1", 3600)))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    client
        .login("api", &SecretString::from("hunter2"), false)
        .await
        .unwrap();

    // Second login answers 200 but without a usable token.
    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "expires": "never" })))
        .mount(&server)
        .await;

    let err = client
        .login("api", &SecretString::from("hunter2"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Token { .. }));

    // The prior credential is untouched.
    assert_eq!(client.access_token().unwrap().token, "tok1");
}

#[tokio::test]
async fn failed_login_surfaces_http_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = client
        .login("api", &SecretString::from("wrong"), false)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(client.access_token().is_none());
}

#[tokio::test]
async fn scheduled_refresh_swaps_credential_without_caller_involvement() {
    let (server, client) = setup().await;

    // Token already inside the 60s refresh lead: the schedule clamps the
    // delay to zero and refreshes immediately.
    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok1", 30)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/refreshToken"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok2", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .login("api", &SecretString::from("hunter2"), true)
        .await
        .unwrap();

    // Wait for the background refresh to land.
    let mut swapped = false;
    for _ in 0..100 {
        if client.access_token().map(|t| t.token) == Some("tok2".to_owned()) {
            swapped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(swapped, "refresh task never replaced the credential");

    // Reads now use the refreshed token with no re-authentication step.
    let id = uuid::Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/objects/{id}/attributes/name")))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "item": { "name": "VAV-3" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let variant = client.read_property(id, "name").await.unwrap().unwrap();
    assert_eq!(variant.display, "VAV-3");
}

#[tokio::test]
async fn refresh_uses_current_session_context() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok1", 3600)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/refreshToken"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok2", 3600)))
        .mount(&server)
        .await;

    client
        .login("api", &SecretString::from("hunter2"), false)
        .await
        .unwrap();

    let refreshed = client.refresh().await.unwrap();
    assert_eq!(refreshed.token, "tok2");
    assert_eq!(client.access_token().unwrap().token, "tok2");
}
