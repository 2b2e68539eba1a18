//! End-to-end tests for the HTTP API, driven through the real router with
//! the in-memory storage variant and a mock Gemini adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use api_lib::adapters::MemStorage;
use api_lib::config::Config;
use api_lib::web::{self, state::AppState, SessionStore};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pdf_chat_core::ports::{DocumentQaService, PortError, PortResult};
use serde_json::{json, Value};
use tower::ServiceExt;

//=========================================================================================
// Test Harness
//=========================================================================================

/// A `DocumentQaService` that records whether it was invoked and returns a
/// canned answer.
struct MockQa {
    called: Arc<AtomicBool>,
    reply: String,
}

#[async_trait]
impl DocumentQaService for MockQa {
    async fn answer(&self, _pdf_content: &str, _message: &str) -> PortResult<String> {
        self.called.store(true, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// A `DocumentQaService` that always fails like a broken provider.
struct FailingQa;

#[async_trait]
impl DocumentQaService for FailingQa {
    async fn answer(&self, _pdf_content: &str, _message: &str) -> PortResult<String> {
        Err(PortError::Upstream("simulated provider outage".to_string()))
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        log_level: tracing::Level::INFO,
        gemini_api_key: None,
        gemini_model: "gemini-pro".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
    }
}

fn app_with_qa(qa_adapter: Option<Arc<dyn DocumentQaService>>) -> Router {
    let state = Arc::new(AppState {
        storage: Arc::new(MemStorage::new()),
        sessions: SessionStore::new(),
        qa_adapter,
        config: Arc::new(test_config()),
    });
    web::router(state)
}

fn app() -> Router {
    app_with_qa(None)
}

/// Sends one request and returns (status, session cookie if set, JSON body).
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, set_cookie, value)
}

async fn register(app: &Router, email: &str, name: &str) -> (String, i64) {
    let (status, cookie, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "hunter2!", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (cookie.unwrap(), body["id"].as_i64().unwrap())
}

//=========================================================================================
// Auth
//=========================================================================================

#[tokio::test]
async fn register_returns_user_without_password_and_sets_cookie() {
    let app = app();
    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "a@example.com", "password": "secret", "name": "Ada" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(cookie.unwrap().starts_with("session="));
    assert_eq!(body["email"], "a@example.com");
    assert_eq!(body["name"], "Ada");
    assert!(body["id"].is_i64());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn duplicate_email_registration_fails() {
    let app = app();
    register(&app, "dup@example.com", "First").await;
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "dup@example.com", "password": "other", "name": "Second" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn register_validation_enumerates_missing_fields() {
    let app = app();
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "", "password": "pw", "name": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"name"));
}

#[tokio::test]
async fn login_yields_registered_user_id() {
    let app = app();
    let (_, id) = register(&app, "login@example.com", "Lin").await;
    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "login@example.com", "password": "hunter2!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());
    assert_eq!(body["id"].as_i64().unwrap(), id);
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let app = app();
    register(&app, "known@example.com", "Known").await;

    let (wrong_status, _, wrong_body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "known@example.com", "password": "bad" })),
    )
    .await;
    let (unknown_status, _, unknown_body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "bad" })),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_stale_sessions() {
    let app = app();
    let (status, _, _) = send(&app, Method::GET, "/api/pdfs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (cookie, _) = register(&app, "out@example.com", "Out").await;
    let (status, _, _) = send(&app, Method::POST, "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, Method::GET, "/api/auth/user", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn current_user_reflects_the_session() {
    let app = app();
    let (cookie, id) = register(&app, "me@example.com", "Me").await;
    let (status, _, body) = send(&app, Method::GET, "/api/auth/user", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_i64().unwrap(), id);
    assert_eq!(body["email"], "me@example.com");
    assert!(body.get("password").is_none());
}

//=========================================================================================
// PDFs and Chats
//=========================================================================================

#[tokio::test]
async fn pdf_round_trip_preserves_name_and_content() {
    let app = app();
    let (cookie, id) = register(&app, "pdf@example.com", "Pdf").await;

    let (status, _, created) = send(
        &app,
        Method::POST,
        "/api/pdfs",
        Some(&cookie),
        Some(json!({ "name": "doc.pdf", "content": "extracted text here" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["userId"].as_i64().unwrap(), id);

    let (status, _, listed) = send(&app, Method::GET, "/api/pdfs", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let pdfs = listed.as_array().unwrap();
    assert_eq!(pdfs.len(), 1);
    assert_eq!(pdfs[0]["name"], "doc.pdf");
    assert_eq!(pdfs[0]["content"], "extracted text here");
    assert_eq!(pdfs[0]["id"], created["id"]);
}

#[tokio::test]
async fn chats_list_newest_first() {
    let app = app();
    let (cookie, _) = register(&app, "order@example.com", "Order").await;

    let mut ids = Vec::new();
    for title in ["alpha", "beta", "gamma"] {
        let (status, _, chat) = send(
            &app,
            Method::POST,
            "/api/chats",
            Some(&cookie),
            Some(json!({ "title": title })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(chat["id"].as_i64().unwrap());
    }

    let (status, _, listed) = send(&app, Method::GET, "/api/chats", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed_ids: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    ids.reverse();
    assert_eq!(listed_ids, ids);
}

#[tokio::test]
async fn chat_anchored_to_foreign_pdf_is_forbidden() {
    let app = app();
    let (cookie_a, _) = register(&app, "pdf-owner@example.com", "Owner").await;
    let (cookie_b, _) = register(&app, "intruder@example.com", "Intruder").await;

    let (_, _, pdf) = send(
        &app,
        Method::POST,
        "/api/pdfs",
        Some(&cookie_a),
        Some(json!({ "name": "private.pdf", "content": "private" })),
    )
    .await;
    let pdf_id = pdf["id"].as_i64().unwrap();

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/chats",
        Some(&cookie_b),
        Some(json!({ "title": "steal", "pdfId": pdf_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/chats",
        Some(&cookie_b),
        Some(json!({ "title": "dangling", "pdfId": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_chats_and_messages_yield_403_without_content() {
    let app = app();
    let (cookie_a, _) = register(&app, "alice@example.com", "Alice").await;
    let (cookie_b, _) = register(&app, "bob@example.com", "Bob").await;

    let (_, _, chat) = send(
        &app,
        Method::POST,
        "/api/chats",
        Some(&cookie_a),
        Some(json!({ "title": "alice's secret chat" })),
    )
    .await;
    let chat_id = chat["id"].as_i64().unwrap();

    send(
        &app,
        Method::POST,
        "/api/messages",
        Some(&cookie_a),
        Some(json!({ "chatId": chat_id, "content": "secret text", "isUser": true })),
    )
    .await;

    let uri = format!("/api/chats/{}", chat_id);
    let (status, _, body) = send(&app, Method::GET, &uri, Some(&cookie_b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");
    assert!(body.get("title").is_none());

    let uri = format!("/api/chats/{}/messages", chat_id);
    let (status, _, body) = send(&app, Method::GET, &uri, Some(&cookie_b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.to_string().contains("secret text"));

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/messages",
        Some(&cookie_b),
        Some(json!({ "chatId": chat_id, "content": "injected", "isUser": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn messages_for_missing_chat_are_not_found() {
    let app = app();
    let (cookie, _) = register(&app, "lost@example.com", "Lost").await;

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/messages",
        Some(&cookie),
        Some(json!({ "chatId": 404, "content": "hello", "isUser": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) =
        send(&app, Method::GET, "/api/chats/404/messages", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn messages_list_oldest_first() {
    let app = app();
    let (cookie, _) = register(&app, "thread@example.com", "Thread").await;
    let (_, _, chat) = send(
        &app,
        Method::POST,
        "/api/chats",
        Some(&cookie),
        Some(json!({ "title": "thread" })),
    )
    .await;
    let chat_id = chat["id"].as_i64().unwrap();

    for content in ["first", "second", "third"] {
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/messages",
            Some(&cookie),
            Some(json!({ "chatId": chat_id, "content": content, "isUser": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("/api/chats/{}/messages", chat_id);
    let (status, _, listed) = send(&app, Method::GET, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["first", "second", "third"]);
}

//=========================================================================================
// Gemini Proxy
//=========================================================================================

#[tokio::test]
async fn gemini_rejects_empty_fields_without_calling_the_provider() {
    let called = Arc::new(AtomicBool::new(false));
    let app = app_with_qa(Some(Arc::new(MockQa {
        called: called.clone(),
        reply: "unused".to_string(),
    })));
    let (cookie, _) = register(&app, "gem@example.com", "Gem").await;

    for body in [
        json!({ "pdfContent": "", "message": "question" }),
        json!({ "pdfContent": "text", "message": "" }),
        json!({ "pdfContent": "", "message": "" }),
    ] {
        let (status, _, response) =
            send(&app, Method::POST, "/api/gemini", Some(&cookie), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "PDF content and message are required");
    }
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn gemini_without_credential_is_a_configuration_error() {
    let app = app();
    let (cookie, _) = register(&app, "nokey@example.com", "NoKey").await;
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/gemini",
        Some(&cookie),
        Some(json!({ "pdfContent": "text", "message": "question" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Gemini API key is not configured");
}

#[tokio::test]
async fn gemini_provider_failure_is_surfaced_distinctly() {
    let app = app_with_qa(Some(Arc::new(FailingQa)));
    let (cookie, _) = register(&app, "broken@example.com", "Broken").await;
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/gemini",
        Some(&cookie),
        Some(json!({ "pdfContent": "text", "message": "question" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Failed to get response from Gemini API"));
    assert!(!body.to_string().contains("simulated provider outage"));
}

//=========================================================================================
// End-to-End Scenario
//=========================================================================================

#[tokio::test]
async fn upload_ask_and_persist_conversation() {
    let called = Arc::new(AtomicBool::new(false));
    let app = app_with_qa(Some(Arc::new(MockQa {
        called: called.clone(),
        reply: "X is the content of the document.".to_string(),
    })));

    let (cookie, _) = register(&app, "scenario@example.com", "Scenario").await;

    let (status, _, pdf) = send(
        &app,
        Method::POST,
        "/api/pdfs",
        Some(&cookie),
        Some(json!({ "name": "doc.pdf", "content": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, chat) = send(
        &app,
        Method::POST,
        "/api/chats",
        Some(&cookie),
        Some(json!({ "title": "doc.pdf", "pdfId": pdf["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let chat_id = chat["id"].as_i64().unwrap();

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/messages",
        Some(&cookie),
        Some(json!({ "chatId": chat_id, "content": "What is X?", "isUser": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, answer) = send(
        &app,
        Method::POST,
        "/api/gemini",
        Some(&cookie),
        Some(json!({ "pdfContent": "X", "message": "What is X?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(called.load(Ordering::SeqCst));
    let reply = answer["response"].as_str().unwrap();
    assert_eq!(reply, "X is the content of the document.");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/messages",
        Some(&cookie),
        Some(json!({ "chatId": chat_id, "content": reply, "isUser": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/chats/{}/messages", chat_id);
    let (status, _, listed) = send(&app, Method::GET, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = listed.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["isUser"], true);
    assert_eq!(messages[0]["content"], "What is X?");
    assert_eq!(messages[1]["isUser"], false);
    assert_eq!(messages[1]["content"], "X is the content of the document.");
}
