//! Password hashing (Argon2id) and the signup password policy.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Hashing backend failure (never a wrong password).
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// First policy rule a candidate password breaks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    TooShort,
    #[error("password must be at most {} characters", MAX_PASSWORD_LENGTH)]
    TooLong,
    #[error("password must contain an upper-case letter")]
    MissingUpperCase,
    #[error("password must contain a lower-case letter")]
    MissingLowerCase,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain a symbol")]
    MissingSymbol,
}

/// Check a signup password against the complexity rules.
pub fn check_password_policy(password: &str) -> Result<(), PolicyViolation> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(PolicyViolation::TooShort);
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(PolicyViolation::TooLong);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyViolation::MissingUpperCase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyViolation::MissingLowerCase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyViolation::MissingDigit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && c != '_') {
        return Err(PolicyViolation::MissingSymbol);
    }
    Ok(())
}

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Compare a password with a stored PHC hash.
/// `Ok(false)` means the password is wrong; `Err` means the hash is unusable.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| PasswordError(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError(e.to_string())),
    }
}

/// Stand-in hash checked when a login names an unknown account, so that
/// case does the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Result<String, PasswordError>> =
    LazyLock::new(|| hash_password("placeholder-for-unknown-accounts"));

/// Like [`verify_password`], but with no stored hash it verifies against a
/// fixed dummy hash and returns `Ok(false)`.
pub fn verify_password_or_dummy(
    password: &str,
    password_hash: Option<&str>,
) -> Result<bool, PasswordError> {
    match password_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            let dummy = DUMMY_HASH
                .as_deref()
                .map_err(|e| PasswordError(e.0.clone()))?;
            verify_password(password, dummy).map(|_| false)
        }
    }
}
