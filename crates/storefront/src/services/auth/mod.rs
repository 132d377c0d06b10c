//! Authentication service.
//!
//! Email and password accounts, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use instant_meal_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length. Argon2 accepts more, but nobody needs it.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum display name length, in characters.
const MAX_DISPLAY_NAME_LENGTH: usize = 80;

/// Verified against when an email has no account, so a login costs one
/// Argon2 run whether or not the account exists. Same parameters as
/// `Argon2::default()`; no password matches it.
const UNKNOWN_ACCOUNT_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$\
                                    bm8tc3VjaC1hY2NvdW50$\
                                    q8Rw3Zt1Lk9Vx2Jm5Nc7Hb4Fd6Gs0Pa8Ye1Ui3Oo5Tw";

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// A blank display name falls back to the email's local part.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let display_name = normalize_display_name(display_name, &email)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_with_password(&email, &display_name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            let _ = verify_password(password, UNKNOWN_ACCOUNT_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Trim the display name, defaulting to the email's local part.
fn normalize_display_name(name: Option<&str>, email: &Email) -> Result<String, AuthError> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.local_part());

    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(AuthError::DisplayNameTooLong(MAX_DISPLAY_NAME_LENGTH));
    }
    Ok(name.to_owned())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_bounds() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("tandoori-nights").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("tandoori-nights", &hash).is_ok());
        assert!(matches!(
            verify_password("tandoori-days", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_unknown_account_hash_costs_a_real_verification() {
        // Same algorithm and cost parameters as freshly made hashes
        let fresh = hash_password("paneer-tikka").unwrap();
        let fresh_params: Vec<_> = fresh.split('$').take(4).collect();
        let dummy_params: Vec<_> = UNKNOWN_ACCOUNT_HASH.split('$').take(4).collect();
        assert_eq!(fresh_params, dummy_params);

        assert!(PasswordHash::new(UNKNOWN_ACCOUNT_HASH).is_ok());
        assert!(matches!(
            verify_password("paneer-tikka", UNKNOWN_ACCOUNT_HASH),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_display_name_defaults_to_local_part() {
        let email = Email::parse("kabir@example.com").unwrap();
        assert_eq!(normalize_display_name(None, &email).unwrap(), "kabir");
        assert_eq!(normalize_display_name(Some("   "), &email).unwrap(), "kabir");
        assert_eq!(
            normalize_display_name(Some(" Kabir S "), &email).unwrap(),
            "Kabir S"
        );
        assert!(normalize_display_name(Some(&"k".repeat(81)), &email).is_err());
    }
}
