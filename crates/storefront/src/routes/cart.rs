//! Cart route handlers.
//!
//! The cart lives in the session under [`session_keys::CART`]. Every
//! mutation responds with the notice for its outcome and the resulting cart,
//! so clients can show a toast and re-render in one round trip.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use instant_meal_core::{Cart, CartAction, CartItem, CartOutcome, MealId, Notice, Price};

use crate::db::MealRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::session_keys;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// One cart line as sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    /// Zero-based index in insertion order.
    pub position: usize,
    pub meal_id: MealId,
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub price: Price,
    pub image: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Price,
    pub item_count: usize,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let lines = cart
            .lines()
            .iter()
            .enumerate()
            .map(|(position, line)| {
                let item = line.item();
                CartLineView {
                    position,
                    meal_id: item.id,
                    name: item.name.clone(),
                    cuisine: item.cuisine.clone(),
                    price: item.price,
                    image: item.image.clone(),
                }
            })
            .collect();

        Self {
            lines,
            total: cart.total(),
            item_count: cart.len(),
        }
    }
}

/// Response to a cart mutation.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub notice: Option<Notice>,
    pub cart: CartView,
}

/// `GET /cart/count` response.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: usize,
}

/// Body of add and remove requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub meal_id: MealId,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the session's cart, or an empty one.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored cart is unreadable.
pub async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Turn an outcome into a response. Refusals are 401 but still carry the
/// (unchanged) cart so the client can keep rendering it.
fn respond(cart: &Cart, outcome: &CartOutcome) -> Response {
    let status = if outcome.is_rejected() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };

    let body = CartResponse {
        notice: outcome.notice(),
        cart: CartView::from(cart),
    };

    (status, Json(body)).into_response()
}

/// Persist the cart when the outcome changed it, then respond.
async fn commit(session: &Session, cart: &Cart, outcome: &CartOutcome) -> Result<Response> {
    match outcome {
        CartOutcome::Added | CartOutcome::Removed(_) | CartOutcome::Cleared => {
            store_cart(session, cart).await?;
        }
        CartOutcome::NotInCart => {}
        CartOutcome::Rejected(err) => {
            tracing::debug!(reason = %err, "Cart operation refused");
        }
    }

    Ok(respond(cart, outcome))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /cart`
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::from(&cart)))
}

/// `GET /cart/count`
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<CartCount>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartCount { count: cart.len() }))
}

/// `POST /cart/add`
///
/// The meal is looked up in the catalog so the line carries its current
/// name, price and image. The auth gate runs before the lookup.
#[instrument(skip_all, fields(meal_id = %request.meal_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(request): Json<CartItemRequest>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;

    if let Err(err) = Cart::check_gate(&auth, CartAction::Add) {
        return commit(&session, &cart, &CartOutcome::Rejected(err)).await;
    }

    let meal = MealRepository::new(state.pool())
        .get(request.meal_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Meal".to_string()))?;

    let outcome = cart.add_to_cart(&auth, CartItem::from(meal));
    commit(&session, &cart, &outcome).await
}

/// `POST /cart/remove`
#[instrument(skip_all, fields(meal_id = %request.meal_id))]
pub async fn remove(
    session: Session,
    auth: OptionalAuth,
    Json(request): Json<CartItemRequest>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    let outcome = cart.remove_from_cart(&auth, request.meal_id);
    commit(&session, &cart, &outcome).await
}

/// `POST /cart/clear`
#[instrument(skip(session, auth))]
pub async fn clear(session: Session, auth: OptionalAuth) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    let outcome = cart.clear_cart(&auth);
    commit(&session, &cart, &outcome).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use instant_meal_core::{Email, Identity};
    use uuid::Uuid;

    use super::*;
    use crate::models::CurrentUser;

    fn signed_in() -> OptionalAuth {
        OptionalAuth(Some(CurrentUser {
            id: instant_meal_core::UserId::new(Uuid::from_u128(7)),
            identity: Identity::new(None, Email::parse("asha@example.com").unwrap()),
        }))
    }

    fn item(id: u128, rupees: u32) -> CartItem {
        let mut item = CartItem::new(MealId::new(Uuid::from_u128(id)), Price::from_rupees(rupees));
        item.name = Some(format!("Meal {id}"));
        item
    }

    #[test]
    fn test_cart_view_positions_and_total() {
        let auth = signed_in();
        let mut cart = Cart::new();
        let _ = cart.add_to_cart(&auth, item(1, 120));
        let _ = cart.add_to_cart(&auth, item(2, 80));
        let _ = cart.add_to_cart(&auth, item(1, 120));

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total, Price::from_rupees(320));
        let positions: Vec<_> = view.lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(view.lines[2].name.as_deref(), Some("Meal 1"));
    }

    #[test]
    fn test_cart_view_wire_shape() {
        let auth = signed_in();
        let mut cart = Cart::new();
        let _ = cart.add_to_cart(&auth, item(3, 45));

        let json = serde_json::to_value(CartView::from(&cart)).unwrap();
        assert_eq!(json["itemCount"], 1);
        assert!(json["lines"][0]["mealId"].is_string());
        assert_eq!(json["lines"][0]["position"], 0);
    }

    #[test]
    fn test_rejected_outcome_is_unauthorized() {
        let cart = Cart::new();
        let outcome = Cart::check_gate(&OptionalAuth(None), CartAction::Clear)
            .map_or_else(CartOutcome::Rejected, |()| CartOutcome::Cleared);

        let response = respond(&cart, &outcome);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_silent_outcome_is_ok() {
        let response = respond(&Cart::new(), &CartOutcome::NotInCart);
        assert_eq!(response.status(), StatusCode::OK);
    }
}
