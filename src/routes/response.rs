//! Response helpers shared by every route
//!
//! JSON bodies carry permissive CORS headers; errors are
//! `{success: false, error, code?}`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::AgriError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Body limit for JSON requests
pub const MAX_JSON_BODY: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Successful payload: `{success: true, ...body}`
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization, X-Filename, X-User-Id",
        )
        .body(full_body(json))
        .unwrap()
}

/// 200 with `{success: true}` merged into `body`
pub fn success_response<T: Serialize>(body: T) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &Success {
            success: true,
            body,
        },
    )
}

pub fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: Option<&str>,
) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            success: false,
            error: error.into(),
            code: code.map(str::to_string),
        },
    )
}

pub fn agri_error_response(err: &AgriError) -> Response<BoxBody> {
    error_response(err.status_code(), err.to_string(), None)
}

pub fn bytes_response(content_type: &str, data: impl Into<Bytes>) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Access-Control-Allow-Origin", "*")
        .header("Cache-Control", "public, max-age=86400")
        .body(full_body(data))
        .unwrap()
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization, X-Filename, X-User-Id",
        )
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Endpoint not found: {}", path),
        None,
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}

/// Collect a request body, failing once it exceeds `limit` bytes
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, AgriError>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(AgriError::BadRequest(
            format!("Request body larger than {} bytes", limit),
        )),
        Err(e) => Err(AgriError::BadRequest(format!("Failed to read body: {}", e))),
    }
}

pub async fn parse_json_body<T, B>(body: B) -> Result<T, AgriError>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = read_body(body, MAX_JSON_BODY).await?;
    serde_json::from_slice(&bytes).map_err(|e| AgriError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Decode `?a=b&c=d`; a missing query decodes like an empty one
pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T, AgriError> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| AgriError::BadRequest(format!("Invalid query string: {}", e)))
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
