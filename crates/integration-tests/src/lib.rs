//! Integration test harness for Instant Meal.
//!
//! Drives the real storefront router in-process with `tower::ServiceExt`.
//! Sessions live in a `MemoryStore` the tests can seed directly, and the
//! database pool is lazy, so every route that fails before touching
//! `PostgreSQL` can be tested without one.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests (no database)
//! cargo test -p instant-meal-integration-tests
//!
//! # Database-backed flows
//! TEST_DATABASE_URL=postgres://localhost/instant_meal_test \
//!     cargo test -p instant-meal-integration-tests -- --ignored
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::{
    MemoryStore, SessionStore,
    cookie::time::{Duration, OffsetDateTime},
    session::{Id, Record},
};

use instant_meal_core::{Cart, Email, Identity, UserId};
use instant_meal_storefront::{
    build_router,
    config::StorefrontConfig,
    db,
    middleware::session::SESSION_COOKIE_NAME,
    models::{CurrentUser, session_keys},
    state::AppState,
};

/// Client address sent on every request, standing in for the proxy header.
pub const CLIENT_IP: &str = "203.0.113.10";

/// Admin token accepted by [`TestApp::with_admin_token`].
pub const ADMIN_TOKEN: &str = "k7Qp2Zx9Lm4Rt8Vw3Ny6Bc1Hd5Jf0Gs";

/// Points nowhere; the pool never connects unless a test reaches the database.
const UNREACHABLE_DATABASE_URL: &str = "postgres://instant_meal@127.0.0.1:1/instant_meal_test";

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, or a JSON string for plain-text bodies, or `Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// The session cookie (`name=value`) set by this response, if any.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
            .map(str::to_owned)
    }

    /// The `message` of a notice, if the body carries one.
    #[must_use]
    pub fn notice_message(&self) -> Option<&str> {
        self.body.get("notice")?.get("message")?.as_str()
    }
}

/// The storefront router plus a handle on its session store.
pub struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    /// App with open catalog writes and an unreachable database.
    #[must_use]
    pub fn new() -> Self {
        Self::from_env(&[])
    }

    /// App whose catalog writes require [`ADMIN_TOKEN`].
    #[must_use]
    pub fn with_admin_token() -> Self {
        Self::from_env(&[("INSTANT_MEAL_ADMIN_TOKEN", ADMIN_TOKEN)])
    }

    /// App backed by a real database.
    #[must_use]
    pub fn with_database(database_url: &str) -> Self {
        Self::from_env(&[("INSTANT_MEAL_DATABASE_URL", database_url)])
    }

    fn from_env(overrides: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("INSTANT_MEAL_DATABASE_URL", UNREACHABLE_DATABASE_URL),
            ("INSTANT_MEAL_BASE_URL", "http://localhost:5000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = StorefrontConfig::from_lookup(&|key: &str| vars.get(key).cloned())
            .expect("test configuration is valid");
        let pool = db::create_lazy_pool(&config.database_url).expect("lazy pool accepts the URL");

        let store = MemoryStore::default();
        let router = build_router(AppState::new(config, pool), store.clone());

        Self { router, store }
    }

    /// Pool used by the app, for tests that seed the database themselves.
    ///
    /// # Panics
    ///
    /// Panics if `database_url` is not a valid connection string.
    #[must_use]
    pub fn pool_for(database_url: &str) -> sqlx::PgPool {
        db::create_lazy_pool(&SecretString::from(database_url.to_string()))
            .expect("lazy pool accepts the URL")
    }

    /// Store a signed-in session holding `cart` and return its cookie.
    ///
    /// # Panics
    ///
    /// Panics if the email is invalid or the store rejects the record.
    pub async fn signed_in_session(&self, email: &str, cart: &Cart) -> String {
        let user = CurrentUser {
            id: UserId::generate(),
            identity: Identity::new(None, Email::parse(email).expect("valid test email")),
        };

        let mut record = Record {
            id: Id::default(),
            data: HashMap::from([
                (
                    session_keys::CURRENT_USER.to_string(),
                    serde_json::to_value(&user).expect("user serializes"),
                ),
                (
                    session_keys::CART.to_string(),
                    serde_json::to_value(cart).expect("cart serializes"),
                ),
            ]),
            expiry_date: OffsetDateTime::now_utc() + Duration::days(1),
        };
        self.store
            .create(&mut record)
            .await
            .expect("memory store accepts the session");

        format!("{SESSION_COOKIE_NAME}={}", record.id)
    }

    /// Send a request and decode the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT_IP);
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `GET uri`, optionally with a session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let headers: Vec<(&str, &str)> = cookie.map(|c| ("cookie", c)).into_iter().collect();
        self.send(Method::GET, uri, None, &headers).await
    }

    /// `POST uri` with a JSON body, optionally with a session cookie.
    pub async fn post(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        let headers: Vec<(&str, &str)> = cookie.map(|c| ("cookie", c)).into_iter().collect();
        self.send(Method::POST, uri, Some(body), &headers).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
