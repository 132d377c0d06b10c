//! Core types for Instant Meal.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod meal;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use meal::{CartItem, Meal, MealCategory, MealDraft, MealError, MealPatch};
pub use price::{Price, PriceError};
