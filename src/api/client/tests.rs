use super::*;
use crate::utils::test_utils::{spawn_stub_server, StubResponse};
use serde_json::json;

#[tokio::test]
async fn fetch_conversations_sends_session_cookie_and_parses_list() {
    let server = spawn_stub_server(vec![StubResponse::json(
        200,
        json!({
            "conversations": [
                {"conversation_id": "c1", "alias": "First", "starred": false},
                {"conversation_id": "c2", "alias": "Second", "starred": true,
                 "starred_at": "2025-03-01T10:00:00Z"}
            ]
        }),
    )])
    .await;
    let client = ServiceClient::new(
        server.base_url.clone(),
        Some(SessionToken::new("access_token=abc")),
    );

    let conversations = client.fetch_conversations().await.expect("list loads");
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[1].conversation_id, "c2");
    assert!(conversations[1].starred_at.is_some());

    let requests = server.requests.lock().await;
    assert!(requests[0].request_line.starts_with("GET /conversations"));
    assert_eq!(requests[0].header("cookie"), Some("access_token=abc"));
}

#[tokio::test]
async fn unauthorized_maps_to_unauthenticated() {
    let server = spawn_stub_server(vec![StubResponse::json(
        401,
        json!({"detail": "Not authenticated"}),
    )])
    .await;
    let client = ServiceClient::new(server.base_url.clone(), None);

    let err = client.fetch_conversations().await.unwrap_err();
    assert!(err.is_unauthenticated());
}

#[tokio::test]
async fn upload_rejection_prefers_detail_then_status() {
    let server = spawn_stub_server(vec![
        StubResponse::json(500, json!({"detail": "quota exceeded"})),
        StubResponse::text(502, "<html>bad gateway</html>"),
    ])
    .await;
    let client = ServiceClient::new(server.base_url.clone(), None);
    let request = UploadPageRequest {
        unique_id: "id".into(),
        html: "<div></div>".into(),
        stylesheets: vec![],
        title: "t".into(),
    };

    match client.upload_page(&request).await {
        Err(ApiError::Rejected { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    match client.upload_page(&request).await {
        Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "502"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn login_returns_session_from_set_cookie() {
    let server = spawn_stub_server(vec![StubResponse::json(200, json!({"message": "ok"}))
        .with_header("Set-Cookie", "access_token=xyz; HttpOnly; Path=/")])
    .await;
    let client = ServiceClient::new(server.base_url.clone(), None);

    let token = client
        .login("a@b.co", "secret123")
        .await
        .expect("login succeeds")
        .expect("cookie present");
    assert_eq!(token.expose(), "access_token=xyz");

    let requests = server.requests.lock().await;
    assert_eq!(
        requests[0].json(),
        json!({"email": "a@b.co", "password": "secret123"})
    );
}

#[tokio::test]
async fn login_unauthorized_is_a_rejection_not_an_expired_session() {
    let server = spawn_stub_server(vec![
        StubResponse::json(401, json!({"detail": "Incorrect email or password"})),
        StubResponse::json(401, json!({})),
    ])
    .await;
    let client = ServiceClient::new(server.base_url.clone(), None);

    let err = client.login("a@b.co", "wrongpass").await.unwrap_err();
    assert!(!err.is_unauthenticated());
    assert!(matches!(err, ApiError::Rejected { status: 401, .. }));
    assert_eq!(err.user_message(), "Incorrect email or password");

    let err = client
        .register("Ann", "ann@example.com", "password1")
        .await
        .unwrap_err();
    assert!(!err.is_unauthenticated());
    assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
}

#[tokio::test]
async fn register_failure_without_detail_uses_generic_message() {
    let server = spawn_stub_server(vec![StubResponse::text(400, "nope")]).await;
    let client = ServiceClient::new(server.base_url.clone(), None);

    let err = client
        .register("Ann", "ann@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
}

#[tokio::test]
async fn malformed_success_body_is_not_a_raw_parse_error_for_users() {
    let server = spawn_stub_server(vec![StubResponse::text(200, "not json")]).await;
    let client = ServiceClient::new(server.base_url.clone(), None);

    let err = client.fetch_models().await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
    assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
}
