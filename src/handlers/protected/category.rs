use axum::extract::{Extension, Path, State};

use crate::api::format::{
    CategoryDetailRepresentation, CategoryPayload, CategoryQuery, CategoryRepresentation,
    CategoryView,
};
use crate::handlers::{parse_id, ApiJson, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;

/// GET /category/categories
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<CategoryRepresentation>> {
    let categories = state.categories().list(&identity).await?;
    Ok(ApiResponse::success(
        categories.iter().map(CategoryRepresentation::from).collect(),
    ))
}

/// POST /category/categories
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<CategoryRepresentation> {
    let category = state.categories().create(&identity, payload).await?;
    Ok(ApiResponse::created(CategoryRepresentation::from(&category)))
}

/// GET /category/categories/:id[?expand=products]
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<CategoryView> {
    let id = parse_id(&id)?;
    let categories = state.categories();

    let view = if query.expand_products() {
        let (category, products) = categories.retrieve_with_products(&identity, id).await?;
        CategoryView::Detail(CategoryDetailRepresentation::new(&category, &products))
    } else {
        CategoryView::Plain(CategoryRepresentation::from(&categories.retrieve(&identity, id).await?))
    };
    Ok(ApiResponse::success(view))
}

/// PUT /category/categories/:id
pub async fn put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<CategoryRepresentation> {
    let id = parse_id(&id)?;
    let category = state.categories().update(&identity, id, payload, false).await?;
    Ok(ApiResponse::success(CategoryRepresentation::from(&category)))
}

/// PATCH /category/categories/:id
pub async fn patch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<CategoryRepresentation> {
    let id = parse_id(&id)?;
    let category = state.categories().update(&identity, id, payload, true).await?;
    Ok(ApiResponse::success(CategoryRepresentation::from(&category)))
}

/// DELETE /category/categories/:id - cascades to subcategories and products
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    state.categories().delete(&identity, id).await?;
    Ok(ApiResponse::no_content())
}
