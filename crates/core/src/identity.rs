//! Authentication contract consumed by the cart.
//!
//! The cart never owns identity. Whoever does (a session, a test fixture)
//! implements [`IdentityState`], and the cart asks it before every mutation.

use serde::{Deserialize, Serialize};

use crate::types::Email;

/// Display identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub display_name: String,
    pub email: Email,
}

impl Identity {
    /// Build an identity, falling back to the email's local part when the
    /// display name is blank.
    #[must_use]
    pub fn new(display_name: Option<&str>, email: Email) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.local_part())
            .to_owned();

        Self {
            display_name,
            email,
        }
    }
}

/// Read-only view of "who is signed in".
pub trait IdentityState {
    /// The signed-in identity, if any.
    fn identity(&self) -> Option<&Identity>;

    /// Whether a user is signed in.
    fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }
}

impl IdentityState for Identity {
    fn identity(&self) -> Option<&Identity> {
        Some(self)
    }
}

impl IdentityState for Option<Identity> {
    fn identity(&self) -> Option<&Identity> {
        self.as_ref()
    }
}

impl<T: IdentityState + ?Sized> IdentityState for &T {
    fn identity(&self) -> Option<&Identity> {
        (**self).identity()
    }
}

/// Nobody is signed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anonymous;

impl IdentityState for Anonymous {
    fn identity(&self) -> Option<&Identity> {
        None
    }
}
