//! Router tests for the catalog and the ambient middleware.
//!
//! Everything here is decided before the database would be queried.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use instant_meal_integration_tests::{ADMIN_TOKEN, TestApp};

const SOME_MEAL: &str = "6f1c1f4e-7c1e-4b7e-9f67-0b6a8f3c2d11";

fn pizza() -> serde_json::Value {
    json!({
        "name": "Margherita",
        "cuisine": "Italian",
        "category": "Veg",
        "price": 349,
        "image": "https://images.example.com/margherita.jpg",
        "description": "Tomato, mozzarella, basil.",
        "ingredients": "dough, tomato, mozzarella, basil"
    })
}

#[tokio::test]
async fn test_welcome_banner() {
    let res = TestApp::new().get("/", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Welcome to Instant Meal API!");
}

#[tokio::test]
async fn test_health() {
    let res = TestApp::new().get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "ok");
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::new();

    let res = app
        .send(Method::GET, "/health", None, &[("x-request-id", "lb-1234")])
        .await;
    assert_eq!(res.headers["x-request-id"], "lb-1234");
    assert_eq!(res.headers["x-frame-options"], "DENY");
    assert_eq!(res.headers["cache-control"], "no-store");

    let res = app.get("/health", None).await;
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_invalid_meal_id_is_bad_request() {
    let app = TestApp::new();

    for uri in ["/meal/42", "/meal/42/related"] {
        let res = app.get(uri, None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(res.body["message"], "Invalid meal id: 42");
    }
}

#[tokio::test]
async fn test_unknown_category_is_bad_request() {
    let res = TestApp::new().get("/meals/category/Fusion", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_sort_key_is_rejected() {
    let res = TestApp::new().get("/all-meals?sort=calories", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_writes_require_admin_token_when_configured() {
    let app = TestApp::with_admin_token();

    let res = app.post("/upload-meal", pizza(), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Admin token required");

    let uri = format!("/delete-meal/{SOME_MEAL}");
    let res = app
        .send(
            Method::DELETE,
            &uri,
            None,
            &[("authorization", "Bearer not-the-token")],
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_validates_after_admin_check() {
    let app = TestApp::with_admin_token();
    let bearer = format!("Bearer {ADMIN_TOKEN}");

    let mut meal = pizza();
    meal["image"] = json!("margherita.jpg");

    let res = app
        .send(
            Method::POST,
            "/upload-meal",
            Some(meal),
            &[("authorization", bearer.as_str())],
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_patch_is_bad_request() {
    let app = TestApp::new();
    let uri = format!("/update-meal/{SOME_MEAL}");

    let res = app.send(Method::PATCH, &uri, Some(json!({})), &[]).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let app = TestApp::new();

    let res = app
        .send(
            Method::OPTIONS,
            "/cart/add",
            None,
            &[
                ("origin", "https://instantmeal.example"),
                ("access-control-request-method", "POST"),
            ],
        )
        .await;
    assert!(res.status.is_success());
    assert_eq!(res.headers["access-control-allow-origin"], "*");
}
