use std::sync::Arc;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ai_hub_chat::config;
use ai_hub_chat::routes::{self, app_state::AppState};
use ai_hub_chat::services::llm_service::{GenerateRequest, TextGenerator};

/// Streams the prompt back in two pieces.
struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, _request: GenerateRequest) -> String {
        "text from image".to_string()
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
        _stop: CancellationToken,
        updates: mpsc::Sender<String>,
    ) -> String {
        let _ = updates.send("echo: ".to_string()).await;
        let reply = format!("echo: {}", request.prompt);
        let _ = updates.send(reply.clone()).await;
        reply
    }
}

fn app_state() -> web::Data<AppState> {
    web::Data::new(AppState::new(config::create_ollama(), Arc::new(EchoGenerator)))
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data($state.clone())
                .configure(routes::init_routes),
        )
        .await
    };
}

macro_rules! start_session {
    ($app:expr) => {{
        let resp =
            test::call_service(&$app, test::TestRequest::get().uri("/init_session").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie: Cookie<'static> = resp
            .response()
            .cookies()
            .next()
            .expect("session cookie")
            .into_owned();
        cookie
    }};
}

macro_rules! post {
    (@send $app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let json: Value = test::read_body_json(resp).await;
        (status, json)
    }};
    ($app:expr, $cookie:expr, $uri:expr) => {
        post!(@send $app, test::TestRequest::post().uri($uri).cookie($cookie.clone()))
    };
    ($app:expr, $cookie:expr, $uri:expr, $body:expr) => {
        post!(@send $app, test::TestRequest::post().uri($uri).cookie($cookie.clone()).set_json($body))
    };
}

macro_rules! state {
    ($app:expr, $cookie:expr) => {{
        let req = test::TestRequest::get().uri("/api/state").cookie($cookie.clone()).to_request();
        let view: Value = test::call_and_read_body_json(&$app, req).await;
        view
    }};
}

#[actix_web::test]
async fn full_turn_streams_and_records_reply() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);

    let (status, view) = post!(app, cookie, "/api/chat/message", json!({"message": "ping"}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["needs_generation"], true);
    assert_eq!(view["messages"][0]["role"], "user");

    let req = test::TestRequest::post().uri("/api/chat/generate").cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let events: Vec<Value> = std::str::from_utf8(&body)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.first().unwrap()["type"], "partial");
    assert_eq!(events.last().unwrap(), &json!({"type": "done", "text": "echo: ping"}));

    let view = state!(app, cookie);
    assert_eq!(view["messages"].as_array().unwrap().len(), 2);
    assert_eq!(view["messages"][1]["content"], "echo: ping");
    assert_eq!(view["needs_generation"], false);
    assert_eq!(view["generating"], false);
}

#[actix_web::test]
async fn requests_without_session_are_rejected() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let req = test::TestRequest::post()
        .uri("/api/chat/message")
        .set_json(json!({"message": "hi"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn generate_without_pending_message_conflicts() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);
    let (status, body) = post!(app, cookie, "/api/chat/generate");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Nothing to generate");
}

#[actix_web::test]
async fn second_message_before_generation_conflicts() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);
    let (status, _) = post!(app, cookie, "/api/chat/message", json!({"message": "first"}));
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post!(app, cookie, "/api/chat/message", json!({"message": "second"}));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "The previous message has not been answered yet");

    let view = state!(app, cookie);
    assert_eq!(view["messages"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn blank_message_is_bad_request() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);
    let (status, _) = post!(app, cookie, "/api/chat/message", json!({"message": "  "}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn history_navigation() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);

    post!(app, cookie, "/api/chat/message", json!({"message": "first chat question"}));
    let (_, view) = post!(app, cookie, "/api/chat/new");
    assert_eq!(view["messages"].as_array().unwrap().len(), 0);
    assert_eq!(view["recent_chats"][0]["title"], "first chat question");
    let id = view["recent_chats"][0]["id"].as_u64().unwrap();

    let (status, view) = post!(app, cookie, "/api/chat/select", json!({"id": id}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["messages"][0]["content"], "first chat question");

    let (status, _) = post!(app, cookie, "/api/chat/select", json!({"id": 999}));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, view) = post!(app, cookie, "/api/chat/clear");
    assert_eq!(view["recent_chats"].as_array().unwrap().len(), 0);
    assert_eq!(view["messages"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn upload_replaces_context_and_returns_previews() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);

    let files = json!({"files": [
        {"name": "invoice.txt", "mime_type": "text/plain", "data": STANDARD.encode("Invoice #42\nTotal: $100")},
        {"name": "photo.png", "mime_type": "image/png", "data": STANDARD.encode([1u8, 2, 3])},
        {"name": "blob.bin", "data": STANDARD.encode("??")}
    ]});
    let (status, body) = post!(app, cookie, "/api/files", files);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["uploaded_files"], json!(["invoice.txt", "photo.png", "blob.bin"]));
    assert_eq!(body["previews"][0]["excerpt"], "Invoice #42\nTotal: $100");
    assert_eq!(body["previews"][1]["kind"], "image");
    assert_eq!(body["previews"][2]["kind"], "unsupported");
}

#[actix_web::test]
async fn empty_upload_keeps_loaded_files() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);
    let files = json!({"files": [{"name": "a.txt", "mime_type": "text/plain", "data": STANDARD.encode("alpha")}]});
    post!(app, cookie, "/api/files", files);

    let (status, body) = post!(app, cookie, "/api/files", json!({"files": []}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["previews"], json!([]));
    assert_eq!(body["state"]["uploaded_files"], json!(["a.txt"]));
}

#[actix_web::test]
async fn invalid_base64_is_bad_request() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);
    let files = json!({"files": [{"name": "a.txt", "data": "%%%"}]});
    let (status, _) = post!(app, cookie, "/api/files", files);
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn model_selection() {
    let state_data = app_state();
    let app = test_app!(state_data);
    let cookie = start_session!(app);
    let (status, view) = post!(app, cookie, "/api/models/select", json!({"model": "llama3.2"}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["model"], "llama3.2");
    let (status, _) = post!(app, cookie, "/api/models/select", json!({"model": ""}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
