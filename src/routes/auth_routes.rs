//! HTTP Routes for Authentication
//!
//! Farmer accounts backed by the MongoDB `users` collection:
//! - POST   /api/auth/register        - Create an account, returns tokens
//! - POST   /api/auth/login           - Authenticate with email and password
//! - POST   /api/auth/refresh         - Exchange a refresh token for a new pair
//! - POST   /api/auth/logout          - Stateless; validates the token only
//! - GET    /api/auth/profile         - Current account
//! - PUT    /api/auth/profile         - Update allow-listed fields
//! - POST   /api/auth/change-password
//! - DELETE /api/auth/delete-account  - Soft delete, password confirmed
//!
//! Without a JWT secret every route answers 501; without an active
//! document store every route except logout answers 503.

use bson::{doc, Document};
use chrono::Utc;
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::{
    extract_token_from_header, hash_password, password_problems, validate_email, verify_password,
    Claims, JwtValidator, TokenPair, TokenType,
};
use crate::db::schemas::{
    FarmerInfo, PublicUser, UserDoc, UserProfile, EDITABLE_FARMER_FIELDS,
    EDITABLE_PREFERENCE_FIELDS, EDITABLE_PROFILE_FIELDS, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::routes::response::{
    error_response, header_str, json_response, method_not_allowed, not_found_response,
    parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::types::AgriError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub farm_size_hectares: f64,
    #[serde(default)]
    pub primary_crops: Vec<String>,
    #[serde(default = "default_farming_type")]
    pub farming_type: String,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_language() -> String {
    "fr".to_string()
}

fn default_country() -> String {
    "CM".to_string()
}

fn default_farming_type() -> String {
    "traditional".to_string()
}

impl RegisterRequest {
    fn into_user(self, user_id: String, password_hash: String) -> UserDoc {
        let timezone = self.timezone.clone();
        let mut user = UserDoc::new(
            user_id,
            password_hash,
            UserProfile {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                phone: self.phone,
                avatar_url: self.avatar_url,
                language: self.language,
                country: self.country,
                region: self.region,
                city: self.city,
            },
            FarmerInfo {
                experience_years: self.experience_years,
                farm_size_hectares: self.farm_size_hectares,
                primary_crops: self.primary_crops,
                farming_type: self.farming_type,
                certifications: self.certifications,
            },
        );
        if let Some(tz) = timezone {
            user.preferences.timezone = tz;
        }
        user
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Serialize)]
struct AuthResponse<'a> {
    success: bool,
    message: &'static str,
    user: PublicUser<'a>,
    tokens: TokenPair,
}

#[derive(Serialize)]
struct UserResponse<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    user: PublicUser<'a>,
}

#[derive(Serialize)]
struct TokensResponse {
    success: bool,
    tokens: TokenPair,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct PasswordErrorResponse {
    success: bool,
    error: &'static str,
    details: Vec<String>,
}

// =============================================================================
// Router
// =============================================================================

pub async fn handle_auth_request(req: Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let Some(jwt) = state.jwt.as_ref() else {
        return error_response(
            StatusCode::NOT_IMPLEMENTED,
            "Authentication is not configured on this server",
            Some("AUTH_DISABLED"),
        );
    };

    match (method, path.as_str()) {
        (Method::POST, "/api/auth/logout") => handle_logout(req.headers(), jwt),
        (Method::POST, "/api/auth/register") => {
            with_users(state, |users| handle_register(req, users, jwt)).await
        }
        (Method::POST, "/api/auth/login") => {
            with_users(state, |users| handle_login(req, users, jwt)).await
        }
        (Method::POST, "/api/auth/refresh") => {
            with_users(state, |users| handle_refresh(req, users, jwt)).await
        }
        (Method::GET, "/api/auth/profile") => {
            with_users(state, |users| handle_get_profile(req, users, jwt)).await
        }
        (Method::PUT, "/api/auth/profile") => {
            with_users(state, |users| handle_update_profile(req, users, jwt)).await
        }
        (Method::POST, "/api/auth/change-password") => {
            with_users(state, |users| handle_change_password(req, users, jwt)).await
        }
        (Method::DELETE, "/api/auth/delete-account") => {
            with_users(state, |users| handle_delete_account(req, users, jwt)).await
        }

        (_, "/api/auth/logout")
        | (_, "/api/auth/register")
        | (_, "/api/auth/login")
        | (_, "/api/auth/refresh")
        | (_, "/api/auth/profile")
        | (_, "/api/auth/change-password")
        | (_, "/api/auth/delete-account") => method_not_allowed(),

        _ => not_found_response(&path),
    }
}

/// Run `handler` against the users collection, or answer 503 without MongoDB
async fn with_users<F, Fut>(state: &AppState, handler: F) -> Response<BoxBody>
where
    F: FnOnce(MongoCollection<UserDoc>) -> Fut,
    Fut: std::future::Future<Output = Response<BoxBody>>,
{
    let Some(mongo) = state.mongo.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Accounts require the MongoDB database",
            Some("DB_UNAVAILABLE"),
        );
    };

    match users(mongo).await {
        Ok(collection) => handler(collection).await,
        Err(e) => db_error(e),
    }
}

async fn users(mongo: &MongoClient) -> Result<MongoCollection<UserDoc>, AgriError> {
    mongo.collection::<UserDoc>(USER_COLLECTION).await
}

// =============================================================================
// Helpers
// =============================================================================

fn db_error(e: AgriError) -> Response<BoxBody> {
    warn!(error = %e, "Account database error");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Database error",
        Some("DB_ERROR"),
    )
}

fn invalid_body(e: AgriError) -> Response<BoxBody> {
    error_response(
        StatusCode::BAD_REQUEST,
        format!("Invalid JSON body: {}", e),
        None,
    )
}

fn invalid_credentials() -> Response<BoxBody> {
    error_response(
        StatusCode::UNAUTHORIZED,
        "Invalid credentials",
        Some("INVALID_CREDENTIALS"),
    )
}

fn weak_password(error: &'static str, details: Vec<String>) -> Response<BoxBody> {
    json_response(
        StatusCode::BAD_REQUEST,
        &PasswordErrorResponse {
            success: false,
            error,
            details,
        },
    )
}

fn tokens_for(jwt: &JwtValidator, user_id: &str) -> Result<TokenPair, Response<BoxBody>> {
    jwt.generate_tokens(user_id).map_err(|e| {
        warn!(error = %e, "Token generation failed");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate tokens",
            Some("TOKEN_ERROR"),
        )
    })
}

/// Claims of a valid token of `kind`, or the 401 to send back
fn require_token(
    token: Option<&str>,
    jwt: &JwtValidator,
    kind: TokenType,
) -> Result<Claims, Response<BoxBody>> {
    let Some(token) = token else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "No token provided",
            Some("NO_TOKEN"),
        ));
    };

    let result = jwt.verify_token(token, kind);
    match result.claims {
        Some(claims) if result.valid => Ok(claims),
        _ => Err(error_response(
            StatusCode::UNAUTHORIZED,
            result.error.unwrap_or_else(|| "Invalid token".into()),
            Some("INVALID_TOKEN"),
        )),
    }
}

/// Active account behind the request's access token
async fn current_user(
    headers: &HeaderMap,
    users: &MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Result<UserDoc, Response<BoxBody>> {
    let token = extract_token_from_header(header_str(headers, "authorization"));
    let claims = require_token(token, jwt, TokenType::Access)?;

    match users.find_one(doc! { "user_id": &claims.user_id }).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "User not found",
            Some("USER_NOT_FOUND"),
        )),
        Err(e) => Err(db_error(e)),
    }
}

/// `$set` document from the allow-listed fields of an update body
pub fn profile_update(body: &Value) -> Result<Document, AgriError> {
    let sections: [(&str, &[&str]); 3] = [
        ("profile", EDITABLE_PROFILE_FIELDS),
        ("farmer_info", EDITABLE_FARMER_FIELDS),
        ("preferences", EDITABLE_PREFERENCE_FIELDS),
    ];

    let mut update = Document::new();
    for (section, allowed) in sections {
        let Some(fields) = body.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields.iter().filter(|(k, _)| allowed.contains(&k.as_str())) {
            update.insert(format!("{}.{}", section, key), bson::to_bson(value)?);
        }
    }
    Ok(update)
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/auth/register
async fn handle_register(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return invalid_body(e),
    };

    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: first_name, last_name",
            None,
        );
    }

    if !validate_email(&body.email) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format", Some("INVALID_EMAIL"));
    }

    let problems = password_problems(&body.password);
    if !problems.is_empty() {
        return weak_password("Invalid password", problems);
    }

    match users.find_one(doc! { "profile.email": &body.email }).await {
        Ok(Some(_)) => {
            return error_response(
                StatusCode::CONFLICT,
                "An account with this email already exists",
                Some("USER_EXISTS"),
            )
        }
        Ok(None) => {}
        Err(e) => return db_error(e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "Password hashing failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password",
                Some("HASH_ERROR"),
            );
        }
    };

    let user_id = uuid::Uuid::new_v4().to_string();
    let user = body.into_user(user_id.clone(), password_hash);

    if let Err(e) = users.insert_one(user.clone()).await {
        let error_str = e.to_string();
        if error_str.contains("duplicate key") || error_str.contains("E11000") {
            return error_response(
                StatusCode::CONFLICT,
                "An account with this email already exists",
                Some("USER_EXISTS"),
            );
        }
        return db_error(e);
    }

    let tokens = match tokens_for(jwt, &user_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    info!(user_id = %user_id, "Registered new user");

    json_response(
        StatusCode::CREATED,
        &AuthResponse {
            success: true,
            message: "Account created",
            user: user.public(),
            tokens,
        },
    )
}

/// POST /api/auth/login
async fn handle_login(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return invalid_body(e),
    };

    if body.email.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: email, password",
            None,
        );
    }

    let mut user = match users.find_one(doc! { "profile.email": &body.email }).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("Login failed - unknown email");
            return invalid_credentials();
        }
        Err(e) => return db_error(e),
    };

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %user.user_id, "Login failed - invalid password");
            return invalid_credentials();
        }
        Err(e) => {
            warn!(error = %e, "Password verification error");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error",
                Some("AUTH_ERROR"),
            );
        }
    }

    let now = Utc::now();
    match bson::to_bson(&now) {
        Ok(last_activity) => {
            let update = doc! { "$set": { "stats.last_activity": last_activity } };
            if let Err(e) = users.update_one(doc! { "user_id": &user.user_id }, update).await {
                warn!(error = %e, "Failed to record last activity");
            }
            user.stats.last_activity = Some(now);
        }
        Err(e) => warn!(error = %e, "Failed to encode last activity"),
    }

    let tokens = match tokens_for(jwt, &user.user_id) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    info!(user_id = %user.user_id, "Login successful");

    json_response(
        StatusCode::OK,
        &AuthResponse {
            success: true,
            message: "Login successful",
            user: user.public(),
            tokens,
        },
    )
}

/// POST /api/auth/refresh
async fn handle_refresh(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    let body: RefreshRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return invalid_body(e),
    };

    let claims = match require_token(Some(body.refresh_token.as_str()), jwt, TokenType::Refresh) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match users.find_one(doc! { "user_id": &claims.user_id }).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "User not found",
                Some("USER_NOT_FOUND"),
            )
        }
        Err(e) => return db_error(e),
    }

    match tokens_for(jwt, &claims.user_id) {
        Ok(tokens) => json_response(
            StatusCode::OK,
            &TokensResponse {
                success: true,
                tokens,
            },
        ),
        Err(resp) => resp,
    }
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client drops them.
fn handle_logout(headers: &HeaderMap, jwt: &JwtValidator) -> Response<BoxBody> {
    let token = extract_token_from_header(header_str(headers, "authorization"));
    if let Err(resp) = require_token(token, jwt, TokenType::Access) {
        return resp;
    }

    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Logged out",
        },
    )
}

/// GET /api/auth/profile
async fn handle_get_profile(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    match current_user(req.headers(), &users, jwt).await {
        Ok(user) => json_response(
            StatusCode::OK,
            &UserResponse {
                success: true,
                message: None,
                user: user.public(),
            },
        ),
        Err(resp) => resp,
    }
}

/// PUT /api/auth/profile
async fn handle_update_profile(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    let user = match current_user(req.headers(), &users, jwt).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let body: Value = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return invalid_body(e),
    };

    let mut update = match profile_update(&body) {
        Ok(u) => u,
        Err(e) => return invalid_body(e),
    };
    if update.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No changes to apply", Some("NO_CHANGES"));
    }
    update.insert("metadata.updated_at", bson::DateTime::now());

    let filter = doc! { "user_id": &user.user_id };
    if let Err(e) = users.update_one(filter.clone(), doc! { "$set": update }).await {
        return db_error(e);
    }

    match users.find_one(filter).await {
        Ok(Some(updated)) => {
            info!(user_id = %updated.user_id, "Profile updated");
            json_response(
                StatusCode::OK,
                &UserResponse {
                    success: true,
                    message: Some("Profile updated"),
                    user: updated.public(),
                },
            )
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found", Some("USER_NOT_FOUND")),
        Err(e) => db_error(e),
    }
}

/// POST /api/auth/change-password
async fn handle_change_password(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    let user = match current_user(req.headers(), &users, jwt).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let body: ChangePasswordRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return invalid_body(e),
    };

    if !matches!(verify_password(&body.current_password, &user.password_hash), Ok(true)) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Current password is incorrect",
            Some("INVALID_CREDENTIALS"),
        );
    }

    let problems = password_problems(&body.new_password);
    if !problems.is_empty() {
        return weak_password("Invalid new password", problems);
    }

    let password_hash = match hash_password(&body.new_password) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "Password hashing failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password",
                Some("HASH_ERROR"),
            );
        }
    };

    let update = doc! {
        "$set": {
            "password_hash": password_hash,
            "metadata.updated_at": bson::DateTime::now(),
        }
    };
    match users.update_one(doc! { "user_id": &user.user_id }, update).await {
        Ok(result) if result.modified_count > 0 => {
            info!(user_id = %user.user_id, "Password changed");
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: "Password changed",
                },
            )
        }
        Ok(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password was not changed",
            Some("UPDATE_FAILED"),
        ),
        Err(e) => db_error(e),
    }
}

/// DELETE /api/auth/delete-account
async fn handle_delete_account(
    req: Request<Incoming>,
    users: MongoCollection<UserDoc>,
    jwt: &JwtValidator,
) -> Response<BoxBody> {
    let user = match current_user(req.headers(), &users, jwt).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let body: DeleteAccountRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return invalid_body(e),
    };

    if !matches!(verify_password(&body.password, &user.password_hash), Ok(true)) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Password is incorrect",
            Some("INVALID_CREDENTIALS"),
        );
    }

    match users.soft_delete(doc! { "user_id": &user.user_id }).await {
        Ok(result) if result.modified_count > 0 => {
            info!(user_id = %user.user_id, "Account deleted");
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: "Account deleted",
                },
            )
        }
        Ok(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Account was not deleted",
            Some("UPDATE_FAILED"),
        ),
        Err(e) => db_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_update_keeps_allowed_fields_only() {
        let body = json!({
            "profile": {"city": "Bafoussam", "email": "evil@example.com"},
            "farmer_info": {"primary_crops": ["maize"], "password_hash": "x"},
            "preferences": {"timezone": "Africa/Lagos"},
            "subscription": {"plan": "premium"}
        });
        let update = profile_update(&body).unwrap();

        assert_eq!(update.get_str("profile.city").unwrap(), "Bafoussam");
        assert!(update.get("profile.email").is_none());
        assert!(update.get("farmer_info.password_hash").is_none());
        assert!(update.get("farmer_info.primary_crops").is_some());
        assert_eq!(update.get_str("preferences.timezone").unwrap(), "Africa/Lagos");
        assert!(update.keys().all(|k| !k.starts_with("subscription")));
    }

    #[test]
    fn test_profile_update_empty_body() {
        assert!(profile_update(&json!({})).unwrap().is_empty());
        assert!(profile_update(&json!({"profile": "not an object"})).unwrap().is_empty());
    }

    #[test]
    fn test_register_request_defaults() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "awa@example.cm",
            "password": "Maize2025",
            "first_name": "Awa",
            "last_name": "Ngono"
        }))
        .unwrap();
        let user = req.into_user("u-1".into(), "hash".into());
        assert_eq!(user.profile.language, "fr");
        assert_eq!(user.profile.country, "CM");
        assert_eq!(user.farmer_info.farming_type, "traditional");
        assert_eq!(user.preferences.timezone, "Africa/Douala");
        assert!(user.is_active);
    }

    #[test]
    fn test_require_token_kinds() {
        let jwt = JwtValidator::new_dev(60, 120);
        let pair = jwt.generate_tokens("u-1").unwrap();

        assert!(require_token(Some(pair.access_token.as_str()), &jwt, TokenType::Access).is_ok());
        let resp = require_token(Some(pair.refresh_token.as_str()), &jwt, TokenType::Access).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = require_token(None, &jwt, TokenType::Access).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
