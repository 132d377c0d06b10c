//! Router tests for sign-in state, logout and rate limiting.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use instant_meal_core::{Cart, CartItem, Email, Identity, MealId, Price};
use instant_meal_integration_tests::TestApp;

fn one_line_cart() -> Cart {
    let owner = Identity::new(None, Email::parse("owner@example.com").unwrap());
    let mut cart = Cart::new();
    let _ = cart.add_to_cart(
        &owner,
        CartItem::new(MealId::new(Uuid::from_u128(1)), Price::from_rupees(199)),
    );
    cart
}

#[tokio::test]
async fn test_me_requires_sign_in() {
    let app = TestApp::new();

    let res = app.get("/auth/me", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "You are not logged in.");
}

#[tokio::test]
async fn test_me_returns_identity() {
    let app = TestApp::new();
    let cookie = app
        .signed_in_session("meera@example.com", &Cart::new())
        .await;

    let res = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], "meera@example.com");
    // No display name given, so the email's local part stands in
    assert_eq!(res.body["displayName"], "meera");
}

#[tokio::test]
async fn test_logout_clears_cart_and_identity() {
    let app = TestApp::new();
    let cookie = app
        .signed_in_session("meera@example.com", &one_line_cart())
        .await;

    let res = app.post("/auth/logout", json!({}), Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/cart/count", Some(&cookie)).await;
    assert_eq!(res.body["count"], 0);

    // Signed out, the cart gate applies again
    let res = app.post("/cart/clear", json!({}), Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_logout_is_a_no_op() {
    let app = TestApp::new();
    let res = app.post("/auth/logout", json!({}), None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_login_with_malformed_email_is_invalid_credentials() {
    let app = TestApp::new();

    // Rejected before any lookup, with the same answer as a wrong password
    let res = app
        .post(
            "/auth/login",
            json!({ "email": "not-an-email", "password": "whatever123" }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_register_validates_before_touching_database() {
    let app = TestApp::new();

    let res = app
        .post(
            "/auth/register",
            json!({ "email": "new@example.com", "password": "short" }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/auth/register",
            json!({ "email": "new@@example.com", "password": "long enough pass" }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Invalid email address");
}

#[tokio::test]
async fn test_login_is_rate_limited_per_client() {
    let app = TestApp::new();
    let body = json!({ "email": "nope", "password": "whatever123" });

    for _ in 0..5 {
        let res = app.post("/auth/login", body.clone(), None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    let res = app.post("/auth/login", body, None).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
}
