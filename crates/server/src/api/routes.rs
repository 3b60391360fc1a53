use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::{auth_middleware, metrics_middleware};
use super::{files, handlers, uploads};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit =
        usize::try_from(state.config().intake.max_request_bytes).unwrap_or(usize::MAX);

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics));

    // Customer routes (no credentials)
    let customer_routes = Router::new()
        .route("/selections", post(uploads::create_selection))
        .route("/selections/{id}", get(uploads::get_selection))
        .route("/selections/{id}/files", post(uploads::stage_files))
        .route(
            "/selections/{id}/files/{file_id}",
            delete(uploads::remove_staged_file),
        )
        .route("/selections/{id}/send", post(uploads::send_selection))
        .route("/uploads", post(uploads::upload))
        .layer(DefaultBodyLimit::max(upload_limit));

    // Shop owner routes
    let owner_routes = Router::new()
        .route("/files", get(files::list_files).delete(files::clear_files))
        .route("/files/{id}", get(files::get_file))
        .route("/files/{id}/content", get(files::download_file))
        .route("/files/{id}/analysis", post(files::request_analysis))
        .route("/analysis", get(files::analysis_capability))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let api_routes = public_routes
        .merge(customer_routes)
        .merge(owner_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
