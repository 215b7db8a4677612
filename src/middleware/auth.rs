use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, injected into request extensions by `require_identity`
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Bearer authentication for protected routes
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers()).map_err(|msg| {
        warn!("Rejected request to {}: {}", request.uri().path(), msg);
        ApiError::unauthorized(msg)
    })?;

    let identity = state.users().authenticate(&token).await?;
    debug!("{} {} as {}", request.method(), request.uri().path(), identity.email);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer <t>`; the `Token <t>` form is also accepted
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, &'static str> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or("Authentication credentials were not provided.")?;

    let value = header
        .to_str()
        .map_err(|_| "Invalid Authorization header format.")?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .ok_or("Authorization header must use Bearer token format.")?
        .trim();

    if token.is_empty() {
        return Err("Invalid token header. No credentials provided.");
    }
    Ok(token.to_string())
}
