use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API Documentation
        .route("/docs", get(handlers::get_api_docs))
        .route("/docs/openapi.json", get(handlers::get_openapi_spec))
        // Projects
        .route("/api/projects", get(handlers::list_projects::<S>))
        // Issues of one project
        .route(
            "/api/issues/:project",
            get(handlers::list_issues::<S>)
                .post(handlers::create_issue::<S>)
                .put(handlers::update_issue::<S>)
                .delete(handlers::delete_issue::<S>),
        )
        .layer(CorsLayer::permissive())
}
