//! JWT access and refresh tokens
//!
//! HS256-signed. Both token kinds carry the same claims and differ only in
//! lifetime and in the `type` claim, which every verification checks so a
//! refresh token can never be used as an access token.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::AgriError;

/// Secret used when running in dev mode without JWT_SECRET
const DEV_SECRET: &str = "agriguard-dev-secret-not-for-production-use";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Payload stored in JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Token pair handed to clients on login, register and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl JwtValidator {
    /// Returns an error if the secret is empty or shorter than 32 characters
    pub fn new(secret: String, access_ttl: u64, refresh_ttl: u64) -> Result<Self, AgriError> {
        if secret.is_empty() {
            return Err(AgriError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(AgriError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            access_ttl,
            refresh_ttl,
        })
    }

    /// Validator for dev mode, with a fixed well-known secret
    pub fn new_dev(access_ttl: u64, refresh_ttl: u64) -> Self {
        Self {
            secret: DEV_SECRET.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    fn now() -> Result<u64, AgriError> {
        Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AgriError::Auth(format!("System time error: {}", e)))?
            .as_secs())
    }

    fn sign(&self, user_id: &str, token_type: TokenType, ttl: u64) -> Result<String, AgriError> {
        let now = Self::now()?;
        let claims = Claims {
            user_id: user_id.to_string(),
            token_type,
            iat: now,
            exp: now + ttl,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AgriError::Auth(format!("Failed to generate token: {}", e)))
    }

    pub fn generate_tokens(&self, user_id: &str) -> Result<TokenPair, AgriError> {
        Ok(TokenPair {
            access_token: self.sign(user_id, TokenType::Access, self.access_ttl)?,
            refresh_token: self.sign(user_id, TokenType::Refresh, self.refresh_ttl)?,
            token_type: "Bearer",
            expires_in: self.access_ttl,
        })
    }

    /// Verify signature, expiry and token type
    pub fn verify_token(&self, token: &str, expected: TokenType) -> TokenValidationResult {
        let validation = Validation::default();

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) if token_data.claims.token_type == expected => {
                TokenValidationResult::valid(token_data.claims)
            }
            Ok(_) => TokenValidationResult::invalid("Invalid token type"),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
            7200,
        )
        .unwrap()
    }

    #[test]
    fn test_generate_and_verify_pair() {
        let validator = test_validator();
        let pair = validator.generate_tokens("user-123").unwrap();
        assert_eq!(pair.expires_in, 3600);

        let access = validator.verify_token(&pair.access_token, TokenType::Access);
        assert!(access.valid);
        let claims = access.claims.unwrap();
        assert_eq!(claims.user_id, "user-123");
        assert_eq!(claims.exp - claims.iat, 3600);

        let refresh = validator.verify_token(&pair.refresh_token, TokenType::Refresh);
        assert_eq!(refresh.claims.unwrap().token_type, TokenType::Refresh);
    }

    #[test]
    fn test_token_type_is_enforced() {
        let validator = test_validator();
        let pair = validator.generate_tokens("user-123").unwrap();

        let result = validator.verify_token(&pair.refresh_token, TokenType::Access);
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Invalid token type"));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let other = JwtValidator::new(
            "different-secret-that-is-at-least-32-characters".into(),
            3600,
            7200,
        )
        .unwrap();
        let pair = test_validator().generate_tokens("user-123").unwrap();
        assert!(!other.verify_token(&pair.access_token, TokenType::Access).valid);
        assert!(!other.verify_token("invalid-token", TokenType::Access).valid);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("short".into(), 60, 60).is_err());
        assert!(JwtValidator::new(String::new(), 60, 60).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("Basic a b")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
