//! Business logic services for the server.
//!
//! - `auth` - Email/password accounts

pub mod auth;
