//! Authentication route handlers.
//!
//! Email and password accounts stored in `PostgreSQL`. A successful login or
//! registration puts a [`CurrentUser`] in the session; that is the identity
//! the cart gate consults.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use instant_meal_core::Identity;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User, session_keys};
use crate::routes::cart::{load_cart, store_cart};
use crate::services::auth::AuthService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Put `user` in the session and tag Sentry with it.
async fn sign_in(session: &Session, user: &User) -> Result<Identity> {
    let current = CurrentUser::from(user);
    end_previous_sign_in(session, &current).await?;
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.identity.email.as_str()));
    Ok(current.identity)
}

/// Signing in as someone else on this session ends the previous user's
/// session: their cart is emptied under their own identity first.
async fn end_previous_sign_in(session: &Session, incoming: &CurrentUser) -> Result<()> {
    let previous = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
        .filter(|previous| previous.id != incoming.id);

    if let Some(previous) = previous {
        let previous_id = previous.id;
        let outgoing = OptionalAuth(Some(previous));
        let mut cart = load_cart(session).await?;
        let _ = cart.clear_cart(&outgoing);
        store_cart(session, &cart).await?;
        tracing::info!(user_id = %previous_id, "Previous sign-in replaced");
    }

    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /auth/register`
///
/// Creates the account and signs it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Identity>)> {
    let user = AuthService::new(state.pool())
        .register_with_password(
            &request.email,
            &request.password,
            request.display_name.as_deref(),
        )
        .await?;

    let identity = sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(identity)))
}

/// `POST /auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Identity>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&request.email, &request.password)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");
    let identity = sign_in(&session, &user).await?;
    Ok(Json(identity))
}

/// `POST /auth/logout`
///
/// Empties the cart while the user is still signed in, then drops the
/// identity and the whole session. Logging out anonymously is a no-op.
#[instrument(skip_all)]
pub async fn logout(session: Session, auth: OptionalAuth) -> Result<StatusCode> {
    if let OptionalAuth(Some(user)) = &auth {
        let mut cart = load_cart(&session).await?;
        let _ = cart.clear_cart(&auth);
        store_cart(&session, &cart).await?;

        clear_current_user(&session).await?;
        tracing::info!(user_id = %user.id, "User logged out");
    }

    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/me`
pub async fn me(RequireAuth(user): RequireAuth) -> Json<Identity> {
    Json(user.identity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use instant_meal_core::{Cart, CartItem, Email, MealId, Price, UserId};
    use tower_sessions::MemoryStore;
    use uuid::Uuid;

    use super::*;

    fn diner(n: u128, email: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new(Uuid::from_u128(n)),
            identity: Identity::new(None, Email::parse(email).unwrap()),
        }
    }

    /// A session signed in as `user` with a two-line cart.
    async fn session_with_cart(user: &CurrentUser) -> Session {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut cart = Cart::new();
        for n in 1..=2 {
            let item = CartItem::new(MealId::new(Uuid::from_u128(n)), Price::from_rupees(150));
            let _ = cart.add_to_cart(&user.identity, item);
        }
        session
            .insert(session_keys::CURRENT_USER, user)
            .await
            .unwrap();
        store_cart(&session, &cart).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_new_user_does_not_inherit_previous_cart() {
        let asha = diner(1, "asha@example.com");
        let session = session_with_cart(&asha).await;

        end_previous_sign_in(&session, &diner(2, "ravi@example.com"))
            .await
            .unwrap();

        let cart = load_cart(&session).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_same_user_signing_in_again_keeps_cart() {
        let asha = diner(1, "asha@example.com");
        let session = session_with_cart(&asha).await;

        end_previous_sign_in(&session, &asha).await.unwrap();

        assert_eq!(load_cart(&session).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_session_is_untouched() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        end_previous_sign_in(&session, &diner(2, "ravi@example.com"))
            .await
            .unwrap();

        assert!(session.is_empty().await);
    }

    #[test]
    fn test_register_request_accepts_camel_case() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@example.com","password":"longenough","displayName":"Asha"}"#,
        )
        .unwrap();
        assert_eq!(request.display_name.as_deref(), Some("Asha"));
    }

    #[test]
    fn test_register_request_display_name_is_optional() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"longenough"}"#).unwrap();
        assert!(request.display_name.is_none());
    }
}
