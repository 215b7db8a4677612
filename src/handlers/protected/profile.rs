use axum::extract::{Extension, State};

use crate::api::format::{ProfilePayload, ProfileRepresentation};
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;

/// GET /user/me
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<ProfileRepresentation> {
    let user = state.users().get_profile(&identity).await?;
    Ok(ApiResponse::success(ProfileRepresentation::from(&user)))
}

/// PUT /user/me - full update, email and password required
pub async fn put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<ProfilePayload>,
) -> ApiResult<ProfileRepresentation> {
    let user = state.users().update_profile(&identity, payload, false).await?;
    Ok(ApiResponse::success(ProfileRepresentation::from(&user)))
}

/// PATCH /user/me
pub async fn patch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<ProfilePayload>,
) -> ApiResult<ProfileRepresentation> {
    let user = state.users().update_profile(&identity, payload, true).await?;
    Ok(ApiResponse::success(ProfileRepresentation::from(&user)))
}
