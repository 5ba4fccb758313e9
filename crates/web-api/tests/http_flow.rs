mod support;

use reqwest::StatusCode;
use serde_json::{json, Value};

use support::TestServer;

#[tokio::test]
async fn register_and_login_issue_usable_tokens() {
    let server = TestServer::start().await;

    let health = server
        .client
        .get(server.http("/health"))
        .send()
        .await
        .expect("health");
    assert_eq!(health.status(), StatusCode::OK);

    let response = server.register("alice", "secret").await;
    assert_eq!(response.status(), StatusCode::OK);
    let registered: Value = response.json().await.expect("json");
    assert_eq!(registered["username"], "alice");

    let response = server.login("alice", "secret").await;
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in: Value = response.json().await.expect("json");
    let token = logged_in["token"].as_str().expect("token");

    let mut ws = server.join(token).await;
    ws.close(None).await.expect("close");
}

#[tokio::test]
async fn register_validates_input_and_uniqueness() {
    let server = TestServer::start().await;

    let missing = server
        .client
        .post(server.http("/auth/register"))
        .json(&json!({ "username": "alice" }))
        .send()
        .await
        .expect("register");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.register("alice", "secret").await.status(), StatusCode::OK);
    assert_eq!(
        server.register("alice", "other").await.status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let server = TestServer::start().await;
    server.register("alice", "secret").await;

    for (username, password) in [("alice", "wrong"), ("nobody", "secret")] {
        let response = server.login(username, password).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body["error"], "invalid credentials");
    }
}
