use orca_query::auth::{authenticate, login, AuthMethod, Credential};
use orca_query::error::QueryError;
use orca_query::http::ApiClient;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Some(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn test_login_returns_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/session"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("email=analyst%40example.com"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jwt": {"access": "jwt-access-token", "refresh": "jwt-refresh-token"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = login(&client_for(&server), "analyst@example.com", "s3cret")
        .await
        .unwrap();

    assert_eq!(credential, Credential::Bearer("jwt-access-token".to_string()));
    assert_eq!(credential.authorization_header(), "Bearer jwt-access-token");
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/session"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad credentials"})))
        .mount(&server)
        .await;

    let err = login(&client_for(&server), "analyst@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::AuthenticationFailed { status: 401 }));
    assert!(err.to_string().contains("login failed, check the credentials"));
}

#[tokio::test]
async fn test_login_non_200_success_code_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/session"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"jwt": {"access": "x"}})))
        .mount(&server)
        .await;

    let err = login(&client_for(&server), "a@example.com", "pw").await.unwrap_err();
    assert!(matches!(err, QueryError::AuthenticationFailed { status: 201 }));
}

#[tokio::test]
async fn test_login_with_malformed_body_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/session"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = login(&client_for(&server), "a@example.com", "pw").await.unwrap_err();
    assert!(matches!(err, QueryError::Http(_)));
}

#[tokio::test]
async fn test_api_token_needs_no_request() {
    let server = MockServer::start().await;

    let credential = authenticate(&client_for(&server), &AuthMethod::ApiToken("static-key".to_string()))
        .await
        .unwrap();

    assert_eq!(credential.authorization_header(), "Token static-key");
    assert!(server.received_requests().await.unwrap().is_empty());
}
