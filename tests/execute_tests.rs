use orca_query::auth::AuthMethod;
use orca_query::config::ClientConfig;
use orca_query::core::{Invocation, OutputMode, QueryExecutor, QueryOutcome};
use orca_query::error::QueryError;
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor_for(server: &MockServer) -> QueryExecutor {
    QueryExecutor::new(ClientConfig::default().with_base_url(server.uri())).unwrap()
}

fn login() -> AuthMethod {
    AuthMethod::Login {
        email: "analyst@example.com".to_string(),
        password: "s3cret".to_string(),
    }
}

fn to_file(query_params: &[&str], output: PathBuf, auth: AuthMethod) -> Invocation {
    Invocation {
        auth,
        query_type: "alerts".to_string(),
        query_params: query_params.iter().map(|s| s.to_string()).collect(),
        output: OutputMode::File(output),
    }
}

#[tokio::test]
async fn test_login_then_export() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jwt": {"access": "jwt-1"}})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/query/alerts"))
        .and(header("authorization", "Bearer jwt-1"))
        .and(query_param("state.severity", "high"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success", "data": [{"id": "a1"}, {"id": "a2"}], "total_items": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("alerts.json");

    let outcome = executor_for(&server)
        .execute(&to_file(&["state.severity", "high"], output.clone(), login()))
        .await
        .unwrap();

    assert_eq!(outcome, QueryOutcome::Written { path: output.clone(), records: 2 });
    assert!(output.exists());
}

#[tokio::test]
async fn test_failed_login_sends_no_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/session"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("alerts.json");

    let err = executor_for(&server)
        .execute(&to_file(&[], output.clone(), login()))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::AuthenticationFailed { status: 403 }));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_odd_parameters_skip_the_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("alerts.json");

    let err = executor_for(&server)
        .execute(&to_file(
            &["state.severity", "high", "dangling"],
            output.clone(),
            AuthMethod::ApiToken("static-key".to_string()),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::OddParameterList { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_download_link_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query/alerts"))
        .and(header("authorization", "Token static-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success", "request_token": "req-7"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/query/status/"))
        .and(query_param("request_token", "req-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query_status": "success", "file_location": "https://downloads.example.com/alerts.json"
        })))
        .mount(&server)
        .await;

    let invocation = Invocation {
        auth: AuthMethod::ApiToken("static-key".to_string()),
        query_type: "alerts".to_string(),
        query_params: vec![],
        output: OutputMode::DownloadLink,
    };

    let outcome = executor_for(&server).execute(&invocation).await.unwrap();
    assert_eq!(
        outcome,
        QueryOutcome::DownloadLink("https://downloads.example.com/alerts.json".to_string())
    );
}
