//! Account authentication: tokens, password hashing, credential rules

pub mod jwt;
pub mod password;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenPair, TokenType};
pub use password::{hash_password, password_problems, validate_email, verify_password};
