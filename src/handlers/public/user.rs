use axum::extract::State;

use crate::api::format::{SignupPayload, TokenPayload, TokenRepresentation, UserRepresentation};
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /user/create - register a new account
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupPayload>,
) -> ApiResult<UserRepresentation> {
    let user = state.users().create_user(payload).await?;
    Ok(ApiResponse::created(UserRepresentation::from(&user)))
}

/// POST /user/token - exchange credentials for a bearer token
pub async fn token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenPayload>,
) -> ApiResult<TokenRepresentation> {
    let token = state.users().issue_token(payload).await?;
    Ok(ApiResponse::success(TokenRepresentation { token }))
}
