//! Password hashing, verification and credential rules
//!
//! Hashing uses argon2id with the crate's default parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use regex::Regex;
use std::sync::OnceLock;

use crate::types::AgriError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, AgriError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AgriError::Auth(format!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AgriError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AgriError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

pub fn validate_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Every rule the password breaks; empty when acceptable
pub fn password_problems(password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        problems.push("Password must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        problems.push("Password must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Password must contain a digit".to_string());
    }
    problems
}
