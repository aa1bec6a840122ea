use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{sign_token, test_app, TestApp, TestToken, FAKE_ACCESS_TOKEN, FAKE_EMAIL, FAKE_PASSWORD};
use crate::app;
use crate::error::UNAUTHORIZED_MESSAGE;

fn router(test: &TestApp) -> Router {
    app(test.state.clone())
}

fn bearer() -> String {
    format!(
        "Bearer {}",
        sign_token(&TestToken {
            cognito_username: Some("jdoe".into()),
            email: Some("jdoe@example.com".into()),
            ..TestToken::default()
        })
    )
}

fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    split(response).await
}

async fn split(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_missing_database_as_not_configured() {
    let test = test_app().await;
    let (status, body) = send(router(&test), request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "not configured");

    let (status, body) = send(router(&test), request(Method::GET, "/websocket/status", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "WebSocket server running");
}

#[tokio::test]
async fn guarded_routes_require_credentials() {
    let test = test_app().await;
    for uri in ["/api/users/me", "/swingers/count", "/file/list", "/api/dynamodb/stored-commands"] {
        let (status, body) = send(router(&test), request(Method::GET, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn unknown_api_key_is_rejected() {
    let test = test_app().await;
    let request = Request::builder()
        .uri("/api/users/me")
        .header("x-api-key", "not-a-real-key")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(&test), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
}

#[tokio::test]
async fn profile_creates_local_user_once() {
    let test = test_app().await;
    let auth = bearer();

    let (status, first) = send(router(&test), request(Method::GET, "/api/users/me", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["sub"], "user-123");
    assert_eq!(first["data"]["username"], "jdoe");
    assert_eq!(first["data"]["provider"], "Amazon Cognito");

    let (_, second) = send(router(&test), request(Method::GET, "/api/users/me", Some(&auth), None)).await;
    assert_eq!(first["data"]["id"], second["data"]["id"]);
    assert_eq!(test.users.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn token_in_cookie_is_accepted() {
    let test = test_app().await;
    let token = sign_token(&TestToken::default());
    let request = Request::builder()
        .uri("/api/users/me")
        .header(header::COOKIE, format!("access_token={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(&test), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sub"], "user-123");
}

#[tokio::test]
async fn issued_api_key_authenticates_until_revoked() {
    let test = test_app().await;
    let auth = bearer();

    let (status, created) = send(
        router(&test),
        request(Method::POST, "/auth/api-keys", Some(&auth), Some(json!({"label": "ci"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = created["data"]["key"].as_str().unwrap().to_string();
    let key_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["label"], "ci");

    let with_key = |method: Method, uri: &str| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-api-key", key.as_str())
            .body(Body::empty())
            .unwrap()
    };

    let (status, me) = send(router(&test), with_key(Method::GET, "/api/users/me")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["sub"], "user-123");

    // Keys cannot mint keys
    let (status, _) = send(router(&test), with_key(Method::POST, "/auth/api-keys")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = send(router(&test), request(Method::GET, "/auth/api-keys", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert!(listed["data"][0].get("keyHash").is_none());

    let uri = format!("/auth/api-keys/{}", key_id);
    let (status, _) = send(router(&test), request(Method::DELETE, &uri, Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(router(&test), with_key(Method::GET, "/api/users/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signin_sets_cookie_and_logout_clears_it() {
    let test = test_app().await;

    let (status, _) = send(
        router(&test),
        request(
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({"email": FAKE_EMAIL, "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = router(&test)
        .oneshot(request(
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({"email": FAKE_EMAIL, "password": FAKE_PASSWORD})),
        ))
        .await
        .unwrap();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let (status, body) = split(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accessToken"], FAKE_ACCESS_TOKEN);
    assert!(cookie.starts_with(&format!("access_token={}", FAKE_ACCESS_TOKEN)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=86400"));

    let (status, body) = send(router(&test), request(Method::POST, "/auth/logout", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Access token is required");

    let (status, body) = send(router(&test), request(Method::POST, "/auth/logout", Some("Bearer stale"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired access token");

    let logout = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, format!("access_token={}", FAKE_ACCESS_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = router(&test).oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("access_token="));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn cognito_admin_routes_map_errors() {
    let test = test_app().await;
    let auth = bearer();

    let (status, _) = send(router(&test), request(Method::GET, "/api/users/ghost", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/users/{}", FAKE_EMAIL);
    let (status, body) = send(router(&test), request(Method::PUT, &uri, Some(&auth), Some(json!({"attributes": []})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "attributes must be a non-empty array");

    let (status, _) = send(
        router(&test),
        request(
            Method::PUT,
            &uri,
            Some(&auth),
            Some(json!({"attributes": [{"Name": "name", "Value": "Ann"}]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(router(&test), request(Method::GET, &uri, Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["attributes"]
        .as_array()
        .unwrap()
        .contains(&json!({"Name": "name", "Value": "Ann"})));

    let (status, _) = send(
        router(&test),
        request(
            Method::POST,
            "/api/users",
            Some(&auth),
            Some(json!({"email": FAKE_EMAIL, "name": "Dup"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn swinger_crud_round() {
    let test = test_app().await;
    let auth = bearer();
    let new = json!({"email": "a@example.com", "name": "Ann", "swingerID": "42", "jsonData": {"USERID": 42}});

    let (status, created) = send(router(&test), request(Method::POST, "/swingers", Some(&auth), Some(new.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["swingerID"], "42");

    let (status, _) = send(router(&test), request(Method::POST, "/swingers", Some(&auth), Some(new))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, count) = send(router(&test), request(Method::GET, "/swingers/count", Some(&auth), None)).await;
    assert_eq!(count["data"]["count"], 1);

    let (status, updated) = send(
        router(&test),
        request(Method::PUT, "/swingers/42", Some(&auth), Some(json!({"name": "Annie"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["name"], "Annie");
    assert_eq!(updated["data"]["email"], "a@example.com");

    let (status, _) = send(
        router(&test),
        request(Method::PUT, "/swingers/404", Some(&auth), Some(json!({"name": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(router(&test), request(Method::GET, "/swingers?limit=10", Some(&auth), None)).await;
    assert_eq!(list["data"][0]["swingerID"], "42");
    assert!(list["data"][0].get("jsonData").is_none());

    let (status, full) = send(router(&test), request(Method::GET, "/swingers/42", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full["data"]["jsonData"]["USERID"], 42);

    let (status, _) = send(router(&test), request(Method::GET, "/swingers/missing", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prisma_dispatches_to_repositories() {
    let test = test_app().await;
    let auth = bearer();

    let (status, _) = send(
        router(&test),
        request(
            Method::POST,
            "/api/prisma",
            Some(&auth),
            Some(json!({"model": "swinger", "operation": "create",
                        "data": {"email": "b@example.com", "name": "Bo", "swingerID": "9"}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, count) = send(
        router(&test),
        request(Method::POST, "/api/prisma", Some(&auth), Some(json!({"model": "swinger", "operation": "count"}))),
    )
    .await;
    assert_eq!(count["data"]["count"], 1);

    let (status, found) = send(
        router(&test),
        request(
            Method::POST,
            "/api/prisma",
            Some(&auth),
            Some(json!({"model": "swinger", "operation": "findUnique", "data": {"where": {"swingerID": "9"}}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["data"]["name"], "Bo");

    let (status, many) = send(
        router(&test),
        request(
            Method::POST,
            "/api/prisma",
            Some(&auth),
            Some(json!({"model": "swinger", "operation": "findMany", "data": {"limit": -1}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(many["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        router(&test),
        request(Method::POST, "/api/prisma", Some(&auth), Some(json!({"model": "post", "operation": "count"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown model: post");

    let (status, _) = send(
        router(&test),
        request(Method::POST, "/api/prisma", Some(&auth), Some(json!({"model": "user", "operation": "drop"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(test.swingers.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn gemini_process_input_records_both_turns() {
    let test = test_app().await;
    let auth = bearer();
    let body = json!({"contents": [{"parts": [{"text": "What is Rust?"}]}]});

    let (status, processed) = send(
        router(&test),
        request(Method::POST, "/google-gemini/process-input", Some(&auth), Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["data"]["question"], "What is Rust?");
    assert_eq!(processed["data"]["answer"], "gemini: What is Rust?");

    let messages = test.chats.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[0].user_email, "jdoe");
    assert_eq!(messages[1].role, "model");
    assert_eq!(messages[0].chat_id.to_string(), processed["data"]["chatId"].as_str().unwrap());

    let uri = format!("/google-gemini/chats/{}", processed["data"]["chatId"].as_str().unwrap());
    let (status, history) = send(router(&test), request(Method::GET, &uri, Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["data"][0]["content"], "What is Rust?");
    assert_eq!(history["data"][1]["role"], "model");

    let uri = format!("/google-gemini/chats/{}", uuid::Uuid::new_v4());
    let (status, _) = send(router(&test), request(Method::GET, &uri, Some(&auth), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, raw) = send(
        router(&test),
        request(Method::POST, "/google-gemini/generate-content", Some(&auth), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(raw["candidates"][0]["content"]["parts"][0]["text"], "gemini: What is Rust?");

    let (status, _) = send(
        router(&test),
        request(Method::POST, "/google-gemini/process-input", Some(&auth), Some(json!({"contents": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chatgpt_answers_and_rejects_blank_questions() {
    let test = test_app().await;
    let auth = bearer();

    let (status, body) = send(
        router(&test),
        request(Method::POST, "/api/chatgpt/ask", Some(&auth), Some(json!({"question": "hi"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["answer"], "echo: hi");

    let (status, _) = send(
        router(&test),
        request(Method::POST, "/api/chatgpt/ask", Some(&auth), Some(json!({"question": "  "}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_command_is_broadcast() {
    let test = test_app().await;
    let auth = bearer();
    let mut events = test.state.command_events.subscribe();

    let (status, stored) = send(
        router(&test),
        request(
            Method::POST,
            "/api/dynamodb/store-command",
            Some(&auth),
            Some(json!({"command": "ls -la"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored["data"]["command"], "ls -la");

    let snapshot = events.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].command, "ls -la");
    assert_eq!(test.dynamo.commands.lock().unwrap().len(), 1);

    let (status, _) = send(
        router(&test),
        request(Method::GET, "/api/dynamodb/tables/nope", Some(&auth), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn file_routes_report_missing_paths() {
    let test = test_app().await;
    let auth = bearer();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes/todo.txt");

    let (status, _) = send(router(&test), request(Method::GET, "/file/content", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        router(&test),
        request(
            Method::POST,
            "/file/create",
            Some(&auth),
            Some(json!({"path": path.display().to_string(), "content": "milk"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/file/read?path={}", path.display());
    let (status, body) = send(router(&test), request(Method::GET, &uri, Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "milk");

    let missing = format!("/file/read?path={}/absent.txt", dir.path().display());
    let (status, body) = send(router(&test), request(Method::GET, &missing, Some(&auth), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().starts_with("File/Folder not found"));
}

#[tokio::test]
async fn log_relay_records_history() {
    let test = test_app().await;
    let auth = bearer();

    let (status, body) = send(router(&test), request(Method::GET, "/log/history", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "No logs available");

    let (status, body) = send(
        router(&test),
        request(Method::POST, "/log", Some(&auth), Some(json!({"message": "disk almost full", "level": "warn"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"status": "Logged", "level": "warn"}));

    let (status, _) = send(
        router(&test),
        request(Method::POST, "/log", Some(&auth), Some(json!({"message": "x", "level": "debug"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(router(&test), request(Method::GET, "/log/history", Some(&auth), None)).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["message"], "disk almost full");
    assert_eq!(entries[0]["level"], "warn");
    assert_eq!(entries[0]["user"], "jdoe");

    let (status, _) = send(router(&test), request(Method::POST, "/log", None, Some(json!({"message": "m", "level": "info"})))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
