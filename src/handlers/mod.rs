// Handler tiers:
// public (no auth) -> protected (bearer token, caller-scoped)

pub mod protected;
pub mod public;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::Method;
use uuid::Uuid;

use crate::error::ApiError;

/// JSON body extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with the same error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Ids that are not UUIDs cannot match any row
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Not found."))
}

/// Fallback for verbs a route does not serve
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::method_not_allowed(format!("Method \"{}\" not allowed.", method))
}

/// Fallback for paths no route matches
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Not found.")
}
