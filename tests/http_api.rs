//! HTTP routes driven through the router with `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use finnest::app::{build_app, AppState};
use finnest::config::AppConfig;
use finnest::data;
use finnest::parser::HeuristicParser;

fn test_app() -> Router {
    let config = AppConfig {
        web_dir: "does-not-exist".to_string(),
        bcrypt_cost: 4,
        ..AppConfig::default()
    };
    let pool = data::build_pool(":memory:", 1, Duration::from_secs(5)).unwrap();
    data::init_schema(&pool).unwrap();
    let state = AppState::new(pool, Arc::new(HeuristicParser::new()), &config);
    build_app(state, &config)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, set_cookie, json)
}

/// Registers a user and returns the session cookie.
async fn register(app: &Router, email: &str) -> String {
    let (status, cookie, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["email"], email);
    cookie.expect("session cookie")
}

async fn import_deck(app: &Router, cookie: &str, text: &str) -> Value {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/decks",
        Some(cookie),
        Some(json!({ "title": "Eläimet", "lang": "FI", "text": text })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_requires_login() {
    let app = test_app();
    let (status, _, body) = send(&app, Method::GET, "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _, _) = send(&app, Method::GET, "/api/review/next", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_and_login() {
    let app = test_app();
    register(&app, "tiina@example.com").await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "tiina@example.com", "password": "another-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "Email already registered", "status": 409 }));

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "tiina@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "tiina@example.com", "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user_id"].is_i64());

    let (status, _, body) = send(&app, Method::GET, "/api/me", cookie.as_deref(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["known_count"], 0);
}

#[tokio::test]
async fn test_import_review_and_answer() {
    let app = test_app();
    let cookie = register(&app, "otto@example.com").await;

    let (status, _, _) = send(&app, Method::GET, "/api/review/next", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let created = import_deck(&app, &cookie, "Kissa istuu. Koira juoksee nopeasti.").await;
    assert_eq!(created["sentences_indexed"], 2);
    assert_eq!(created["cards"]["created"], 5);

    let (status, _, next) = send(&app, Method::GET, "/api/review/next", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["pick"], "new");
    assert!(next["example"]["text"].is_string());
    assert!(next["grammar"].as_str().unwrap().ends_with("(heuristic)"));
    assert_eq!(next["examples"][0]["deck_title"], "Eläimet");
    assert_eq!(next["examples"][0]["text"], next["example"]["text"]);
    assert_eq!(next["deck_counts"], json!([["Eläimet", 1]]));
    let card_id = next["card"]["id"].as_i64().unwrap();

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/review/answer",
        Some(&cookie),
        Some(json!({ "card_id": card_id, "grade": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _, outcome) = send(
        &app,
        Method::POST,
        "/api/review/answer",
        Some(&cookie),
        Some(json!({ "card_id": card_id, "quality": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["stage_before"], "new");
    assert_eq!(outcome["state"]["stage"], "learning");
    assert_eq!(outcome["grade"], "good");

    let (_, _, me) = send(&app, Method::GET, "/api/me", Some(&cookie), None).await;
    assert_eq!(me["decks"][0]["unique"], 5);
    assert_eq!(me["new_capacity_today"], 4);
}

#[tokio::test]
async fn test_other_users_card_is_not_found() {
    let app = test_app();
    let owner = register(&app, "owner@example.com").await;
    let intruder = register(&app, "intruder@example.com").await;
    import_deck(&app, &owner, "Hevonen syö.").await;

    let (_, _, next) = send(&app, Method::GET, "/api/review/next", Some(&owner), None).await;
    let card_id = next["card"]["id"].as_i64().unwrap();

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/review/answer",
        Some(&intruder),
        Some(json!({ "card_id": card_id, "grade": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/card/known",
        Some(&intruder),
        Some(json!({ "card_id": card_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_known_card_disappears_and_grading_it_conflicts() {
    let app = test_app();
    let cookie = register(&app, "kaisa@example.com").await;
    import_deck(&app, &cookie, "Lintu laulaa.").await;

    let (_, _, next) = send(&app, Method::GET, "/api/review/next", Some(&cookie), None).await;
    let card_id = next["card"]["id"].as_i64().unwrap();

    let (status, _, card) = send(
        &app,
        Method::POST,
        "/api/card/known",
        Some(&cookie),
        Some(json!({ "card_id": card_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(card["retired_at"].is_string());

    let (status, _, next) = send(&app, Method::GET, "/api/review/next", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(next["card"]["id"].as_i64().unwrap(), card_id);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/review/answer",
        Some(&cookie),
        Some(json!({ "card_id": card_id, "grade": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, me) = send(&app, Method::GET, "/api/me", Some(&cookie), None).await;
    assert_eq!(me["known_count"], 1);
}

#[tokio::test]
async fn test_lemma_import_and_unmark() {
    let app = test_app();
    let cookie = register(&app, "matti@example.com").await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/lemmas/known",
        Some(&cookie),
        Some(json!({ "lemmas": [{ "lemma": "kala", "pos": "NOUN" }, { "lemma": " ", "pos": "NOUN" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let created = import_deck(&app, &cookie, "Kala ui.").await;
    assert_eq!(created["cards"]["skipped_marked"], 1);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/lemmas/unmark",
        Some(&cookie),
        Some(json!({ "lemma": "kala", "pos": "NOUN" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_deck_validation_and_delete() {
    let app = test_app();
    let cookie = register(&app, "helmi@example.com").await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/decks",
        Some(&cookie),
        Some(json!({ "title": "Svenska", "lang": "SV", "text": "Hej då." })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/decks",
        Some(&cookie),
        Some(json!({ "title": "  ", "lang": "FI", "text": "Hei." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, Method::POST, "/api/decks", Some(&cookie), Some(json!({ "title": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let created = import_deck(&app, &cookie, "Tere hommikust.").await;
    let deck_id = created["deck_id"].as_i64().unwrap();

    let (status, _, decks) = send(&app, Method::GET, "/api/decks", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decks.as_array().unwrap().len(), 1);

    let uri = format!("/api/decks/{}", deck_id);
    let (status, _, _) = send(&app, Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_are_clamped() {
    let app = test_app();
    let cookie = register(&app, "sofia@example.com").await;

    let (status, _, body) = send(&app, Method::GET, "/api/settings", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_per_day"], 20);
    assert_eq!(body["theme"], "system");

    let (status, _, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(&cookie),
        Some(json!({ "new_per_day": 9000, "retention": 2.0, "theme": "dark" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_per_day"], 500);
    assert_eq!(body["retention"], 0.99);

    let (_, _, body) = send(&app, Method::GET, "/api/settings", Some(&cookie), None).await;
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["retention"], 0.99);
}
