//! The cart store.
//!
//! A [`Cart`] is an ordered list of lines plus a running total. It is owned
//! by one session and mutated only through [`Cart::add_to_cart`],
//! [`Cart::remove_from_cart`] and [`Cart::clear_cart`], each of which first
//! asks an [`IdentityState`] whether anyone is signed in.
//!
//! Invariant: after every operation `total == sum(line.price)`, exactly.
//!
//! Adding the same meal twice yields two lines; there is no quantity merge.
//! Removal takes out the first matching line in insertion order.
//!
//! Operations never fail. An anonymous caller gets
//! [`CartOutcome::Rejected`] and an untouched cart; every outcome maps to at
//! most one user-facing [`Notice`].

use serde::{Deserialize, Serialize};

use crate::identity::IdentityState;
use crate::types::{CartItem, MealId, Price};

/// The three cart mutations, named for notices and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Add,
    Remove,
    Clear,
}

impl CartAction {
    const fn auth_required_message(self) -> &'static str {
        match self {
            Self::Add => "You need to be logged in to add items to your cart.",
            Self::Remove => "You need to be logged in to remove items from your cart.",
            Self::Clear => "You need to be logged in to clear your cart.",
        }
    }
}

/// Why a cart mutation was refused.
///
/// This is a user-facing condition, not a fault: it is reported through a
/// [`Notice`] and never escalated.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartError {
    /// The caller is not signed in.
    #[error("{}", .0.auth_required_message())]
    AuthRequired(CartAction),
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message for the user (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.to_owned(),
        }
    }

    fn error(err: &CartError) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: err.to_string(),
        }
    }
}

/// Result of a cart operation.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOutcome {
    /// A new line was appended.
    Added,
    /// This line was taken out.
    Removed(CartLine),
    /// Every line was dropped.
    Cleared,
    /// Remove was asked for a meal that is not in the cart; nothing changed.
    NotInCart,
    /// The operation was refused; nothing changed.
    Rejected(CartError),
}

impl CartOutcome {
    /// The notice to show the user, if any.
    ///
    /// `Cleared` and `NotInCart` are silent.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Added => Some(Notice::success("Item added to cart!")),
            Self::Removed(_) => Some(Notice::success("Item removed from cart!")),
            Self::Cleared | Self::NotInCart => None,
            Self::Rejected(err) => Some(Notice::error(err)),
        }
    }

    /// Whether the operation was refused by the auth gate.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// One meal in the cart. Each add produces its own line, so the
/// quantity of a line is always one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLine {
    item: CartItem,
}

impl CartLine {
    /// The item this line was created from.
    #[must_use]
    pub const fn item(&self) -> &CartItem {
        &self.item
    }

    #[must_use]
    pub const fn meal_id(&self) -> MealId {
        self.item.id
    }

    #[must_use]
    pub const fn price(&self) -> Price {
        self.item.price
    }
}

/// Per-session cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CartRecord", into = "CartRecord")]
pub struct Cart {
    lines: Vec<CartLine>,
    total: Price,
}

/// Persisted shape: only the lines. The total is derived on load.
#[derive(Serialize, Deserialize)]
struct CartRecord {
    lines: Vec<CartLine>,
}

impl From<CartRecord> for Cart {
    fn from(record: CartRecord) -> Self {
        let total = record.lines.iter().map(CartLine::price).sum();
        Self {
            lines: record.lines,
            total,
        }
    }
}

impl From<Cart> for CartRecord {
    fn from(cart: Cart) -> Self {
        Self { lines: cart.lines }
    }
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            total: Price::ZERO,
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn total(&self) -> Price {
        self.total
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line holds this meal.
    #[must_use]
    pub fn contains(&self, meal_id: MealId) -> bool {
        self.lines.iter().any(|line| line.meal_id() == meal_id)
    }

    /// The auth gate on its own, for callers that want to skip work (a
    /// catalog lookup, say) before an operation that would be refused anyway.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthRequired` if nobody is signed in.
    pub fn check_gate(
        identity: &impl IdentityState,
        action: CartAction,
    ) -> Result<(), CartError> {
        if identity.is_authenticated() {
            Ok(())
        } else {
            Err(CartError::AuthRequired(action))
        }
    }

    /// Append a line for `item` and add its price to the total.
    pub fn add_to_cart(&mut self, identity: &impl IdentityState, item: CartItem) -> CartOutcome {
        if let Err(err) = Self::check_gate(identity, CartAction::Add) {
            return CartOutcome::Rejected(err);
        }

        self.total += item.price;
        self.lines.push(CartLine { item });
        self.debug_check_total();
        CartOutcome::Added
    }

    /// Remove the first line holding `meal_id` and subtract its price.
    pub fn remove_from_cart(
        &mut self,
        identity: &impl IdentityState,
        meal_id: MealId,
    ) -> CartOutcome {
        if let Err(err) = Self::check_gate(identity, CartAction::Remove) {
            return CartOutcome::Rejected(err);
        }

        let Some(position) = self.lines.iter().position(|line| line.meal_id() == meal_id) else {
            return CartOutcome::NotInCart;
        };

        let line = self.lines.remove(position);
        self.total = self.total.saturating_sub(line.price());
        self.debug_check_total();
        CartOutcome::Removed(line)
    }

    /// Drop every line and reset the total to zero.
    pub fn clear_cart(&mut self, identity: &impl IdentityState) -> CartOutcome {
        if let Err(err) = Self::check_gate(identity, CartAction::Clear) {
            return CartOutcome::Rejected(err);
        }

        self.lines.clear();
        self.total = Price::ZERO;
        CartOutcome::Cleared
    }

    fn debug_check_total(&self) {
        debug_assert_eq!(
            self.total,
            self.lines.iter().map(CartLine::price).sum::<Price>(),
            "cart total drifted from its lines"
        );
    }
}
