//! End-to-end tests for authentication endpoints
//!
//! Tests registration, login, token handling, and authentication requirements.

mod common;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::{
    TestClient, TestServer, OTHER_EMAIL, OTHER_PASS, OTHER_USER, TEST_EMAIL, TEST_PASS,
    TEST_USER,
};
use reqwest::StatusCode;
use serde_json::Value;

async fn error_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Error body is not JSON");
    body["error"]
        .as_str()
        .expect("Error body has no message")
        .to_string()
}

#[tokio::test]
async fn test_home_is_public() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Welcome to the Music Player API!");
    assert!(body["uptime"].is_string());
}

#[tokio::test]
async fn test_register_returns_token_and_public_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register(OTHER_USER, OTHER_EMAIL, OTHER_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "user registered successfully");
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], OTHER_USER);
    assert_eq!(body["user"]["email"], OTHER_EMAIL);
    assert!(body["user"]["id"].as_u64().is_some());

    // No password material anywhere in the response
    let raw = body.to_string();
    assert!(!raw.contains("password"));
    assert!(!raw.contains(OTHER_PASS));
}

#[tokio::test]
async fn test_register_token_authenticates_new_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register(OTHER_USER, OTHER_EMAIL, OTHER_PASS).await;
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    let user_id = body["user"]["id"].as_u64().unwrap();

    let client = TestClient::with_token(server.base_url.clone(), token);
    let response = client.get_session().await;
    assert_eq!(response.status(), StatusCode::OK);

    let session: Value = response.json().await.unwrap();
    assert_eq!(session["user_id"].as_u64(), Some(user_id));
    assert_eq!(session["username"], OTHER_USER);
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register(TEST_USER, "another@example.com", "another-pass")
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_of(response).await, "username already exists");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register(OTHER_USER, TEST_EMAIL, OTHER_PASS).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_of(response).await, "email already exists");
}

#[tokio::test]
async fn test_register_validates_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let cases = [
        ("ab", OTHER_EMAIL, OTHER_PASS),
        (OTHER_USER, "not-an-email", OTHER_PASS),
        (OTHER_USER, OTHER_EMAIL, "short"),
    ];
    for (username, email, password) in cases {
        let response = client.register(username, email, password).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{} {} {}",
            username,
            email,
            password
        );
    }

    // Nothing was created along the way
    let response = client.login(OTHER_USER, OTHER_PASS).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_malformed_body() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/auth/register", server.base_url))
        .header("Content-Type", "application/json")
        .body("{\"username\": \"nobody\"")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_of(response)
        .await
        .starts_with("invalid request format"));
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "login successful");
    assert_eq!(body["user"]["id"].as_u64(), Some(server.test_user_id as u64));
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_failures_share_generic_message() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let wrong_password = client.login(TEST_USER, "wrong_password").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

    let unknown_user = client.login("nonexistent_user", "password").await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        error_of(wrong_password).await,
        error_of(unknown_user).await
    );
}

#[tokio::test]
async fn test_protected_endpoint_requires_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_songs().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await, "authorization header required");
}

#[tokio::test]
async fn test_malformed_authorization_headers() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let token = client.token.clone().unwrap();

    for header in [
        token.clone(),
        format!("Token {}", token),
        format!("Bearer {} extra", token),
        "Bearer".to_string(),
    ] {
        let response = client.get_session_with_header(&header).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", header);
        assert_eq!(
            error_of(response).await,
            "authorization header format must be Bearer <token>"
        );
    }
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let server = TestServer::spawn().await;
    let issued_at = chrono::Utc::now().timestamp() as u64 - 25 * 60 * 60;
    let token = server
        .token_issuer
        .issue_at(server.test_user_id, TEST_USER, issued_at)
        .unwrap();

    let client = TestClient::with_token(server.base_url.clone(), token);
    let response = client.get_session().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await, "invalid or expired token");
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let token = client.token.clone().unwrap();

    // Swap the claims for another user's while keeping the signature
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);
    let mut claims: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    claims["user_id"] = Value::from(server.test_user_id + 1);
    let forged_claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

    let client = TestClient::with_token(server.base_url.clone(), forged);
    let response = client.get_session().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await, "invalid or expired token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    use music_library_server::user::{SigningSecret, TokenIssuer};

    let server = TestServer::spawn().await;
    let token = TokenIssuer::new(&SigningSecret::new("some-other-secret"))
        .issue(server.test_user_id, TEST_USER)
        .unwrap();

    let client = TestClient::with_token(server.base_url.clone(), token);
    let response = client.get_session().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
