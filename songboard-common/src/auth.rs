//! Credential helpers: password hashing and bearer tokens
//!
//! # Architecture
//!
//! - Passwords are stored as argon2id PHC strings (salt embedded)
//! - Bearer tokens are 40 random alphanumeric characters handed to the
//!   client once; only their SHA-256 digest is persisted
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions.
//! No HTTP framework dependencies (Axum, etc.) - those live in songboard-api.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated bearer tokens
pub const TOKEN_LENGTH: usize = 40;

// ========================================
// Error Types
// ========================================

/// Credential handling errors
#[derive(Debug, Clone)]
pub enum CredentialError {
    /// Hashing backend failure
    Hash(String),

    /// Stored hash is not a valid PHC string
    MalformedHash(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::Hash(err) => write!(f, "Password hashing failed: {}", err),
            CredentialError::MalformedHash(err) => write!(f, "Malformed password hash: {}", err),
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<CredentialError> for crate::Error {
    fn from(err: CredentialError) -> Self {
        crate::Error::Internal(err.to_string())
    }
}

// ========================================
// Passwords
// ========================================

/// Hash a password with a fresh random salt
///
/// # Examples
///
/// ```
/// use songboard_common::auth::{hash_password, verify_password};
///
/// let hash = hash_password("password123").unwrap();
/// assert!(hash.starts_with("$argon2"));
/// assert!(verify_password("password123", &hash).unwrap());
/// assert!(!verify_password("wrong", &hash).unwrap());
/// ```
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Check a password against a stored PHC hash
///
/// Returns `Ok(false)` for a wrong password, `Err` only when the stored
/// hash itself cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| CredentialError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ========================================
// Bearer Tokens
// ========================================

/// Generate a new plaintext bearer token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Digest stored in place of the plaintext token (64 hex chars)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization` header value
///
/// # Examples
///
/// ```
/// use songboard_common::auth::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
/// assert_eq!(parse_bearer("bearer abc"), Some("abc"));
/// assert_eq!(parse_bearer("Basic abc"), None);
/// assert_eq!(parse_bearer("Bearer "), None);
/// ```
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ========================================
// Tests
// ========================================
