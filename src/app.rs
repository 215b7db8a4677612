use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::handlers::{method_not_allowed, protected, public, route_not_found};
use crate::middleware::require_identity;
use crate::state::AppState;

/// Full application router
pub fn app(state: AppState) -> Router {
    let api = &state.config.api;

    let mut router = Router::new()
        // Public
        .route("/", get(root).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .merge(user_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes));

    if let Some(cors) = cors_layer(&state.config.security) {
        router = router.layer(cors);
    }
    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

/// Bind and serve until ctrl-c
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Catalog API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Catalog API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn user_public_routes() -> Router<AppState> {
    use public::user;

    Router::new()
        .route("/user/create", post(user::create).fallback(method_not_allowed))
        .route("/user/token", post(user::token).fallback(method_not_allowed))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(profile_routes())
        .merge(category_routes())
        .merge(product_routes())
        .route_layer(middleware::from_fn_with_state(state, require_identity))
}

fn profile_routes() -> Router<AppState> {
    use protected::profile;

    Router::new().route(
        "/user/me",
        get(profile::get)
            .put(profile::put)
            .patch(profile::patch)
            .fallback(method_not_allowed),
    )
}

fn category_routes() -> Router<AppState> {
    use protected::category;

    Router::new()
        .route(
            "/category/categories",
            get(category::list)
                .post(category::create)
                .fallback(method_not_allowed),
        )
        .route(
            "/category/categories/:id",
            get(category::get)
                .put(category::put)
                .patch(category::patch)
                .delete(category::delete)
                .fallback(method_not_allowed),
        )
}

fn product_routes() -> Router<AppState> {
    use protected::product;

    Router::new()
        .route(
            "/category/products",
            get(product::list)
                .post(product::create)
                .fallback(method_not_allowed),
        )
        .route(
            "/category/products/:id",
            get(product::get)
                .put(product::put)
                .patch(product::patch)
                .delete(product::delete)
                .fallback(method_not_allowed),
        )
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any),
    )
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Catalog API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Per-user product and category catalog",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "signup": "/user/create (public)",
                "token": "/user/token (public)",
                "profile": "/user/me (protected)",
                "categories": "/category/categories[/:id] (protected)",
                "products": "/category/products[/:id] (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
