use axum::extract::{Extension, Path, State};

use crate::api::format::{ProductPayload, ProductQuery, ProductRepresentation};
use crate::handlers::{parse_id, ApiJson, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;

/// GET /category/products[?category=<id>]
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Vec<ProductRepresentation>> {
    let products = state.products().list(&identity, query.category).await?;
    Ok(ApiResponse::success(
        products.iter().map(ProductRepresentation::from).collect(),
    ))
}

/// POST /category/products
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<ProductPayload>,
) -> ApiResult<ProductRepresentation> {
    let product = state.products().create(&identity, payload).await?;
    Ok(ApiResponse::created(ProductRepresentation::from(&product)))
}

/// GET /category/products/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<ProductRepresentation> {
    let id = parse_id(&id)?;
    let product = state.products().retrieve(&identity, id).await?;
    Ok(ApiResponse::success(ProductRepresentation::from(&product)))
}

/// PUT /category/products/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ProductPayload>,
) -> ApiResult<ProductRepresentation> {
    let id = parse_id(&id)?;
    let product = state.products().update(&identity, id, payload, false).await?;
    Ok(ApiResponse::success(ProductRepresentation::from(&product)))
}

/// PATCH /category/products/:id
pub async fn patch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ProductPayload>,
) -> ApiResult<ProductRepresentation> {
    let id = parse_id(&id)?;
    let product = state.products().update(&identity, id, payload, true).await?;
    Ok(ApiResponse::success(ProductRepresentation::from(&product)))
}

/// DELETE /category/products/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    state.products().delete(&identity, id).await?;
    Ok(ApiResponse::no_content())
}
