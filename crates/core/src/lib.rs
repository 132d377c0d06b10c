//! Instant Meal Core - Shared types and cart state.
//!
//! This crate provides the domain model used across all Instant Meal components:
//! - `storefront` - Catalog API, authentication and session-held carts
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types, traits and in-memory state - no I/O,
//! no database access, no HTTP clients. The cart logic lives here so it can
//! be exercised without a server.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails and meal records
//! - [`identity`] - The authentication contract the cart is gated on
//! - [`cart`] - The cart store

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod identity;
pub mod types;

pub use cart::{Cart, CartAction, CartError, CartLine, CartOutcome, Notice, NoticeLevel};
pub use identity::{Anonymous, Identity, IdentityState};
pub use types::*;
