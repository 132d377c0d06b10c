//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                             - Welcome banner
//! GET    /health                       - Liveness
//! GET    /health/ready                 - Readiness (database)
//!
//! # Catalog
//! POST   /upload-meal                  - Create a meal (admin)
//! GET    /all-meals                    - List meals (?sort=&direction=)
//! GET    /meal/{id}                    - Meal detail
//! GET    /meal/{id}/related            - Same-category meals (?limit=)
//! PATCH  /update-meal/{id}             - Partial update (admin)
//! DELETE /delete-meal/{id}             - Delete (admin)
//! GET    /meals/category/{category}    - Meals in a category
//! GET    /meals/search/{term}          - Search name and cuisine (?limit=)
//!
//! # Auth (login and register are rate limited)
//! POST   /auth/register                - Create account and sign in
//! POST   /auth/login                   - Sign in
//! POST   /auth/logout                  - Clear cart, sign out
//! GET    /auth/me                      - Current identity
//!
//! # Cart
//! GET    /cart                         - Cart with lines and total
//! GET    /cart/count                   - Number of lines
//! POST   /cart/add                     - Add a meal
//! POST   /cart/remove                  - Remove the first line for a meal
//! POST   /cart/clear                   - Empty the cart
//! ```

pub mod auth;
pub mod cart;
pub mod meals;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(meals::welcome))
        .route("/upload-meal", post(meals::upload_meal))
        .route("/all-meals", get(meals::all_meals))
        .route("/meal/{id}", get(meals::get_meal))
        .route("/meal/{id}/related", get(meals::related_meals))
        .route("/update-meal/{id}", patch(meals::update_meal))
        .route("/delete-meal/{id}", delete(meals::delete_meal))
        .route("/meals/category/{category}", get(meals::meals_by_category))
        .route("/meals/search/{term}", get(meals::search_meals))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .layer(api_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the health check router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Create the main routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(meal_routes())
        .nest("/auth", auth_routes())
        .nest("/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
