use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::static_files::{index_handler, static_handler};
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let feed_routes = Router::new()
        .route("/video_feed", get(handlers::video_feed))
        .route("/screen_feed", get(handlers::screen_feed));

    let control_routes = Router::new()
        .route("/start_camera", get(handlers::start_camera))
        .route("/stop_camera", get(handlers::stop_camera))
        .route("/start_screen", get(handlers::start_screen))
        .route("/stop_screen", get(handlers::stop_screen))
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::status));

    Router::new()
        .route("/", get(index_handler))
        .merge(feed_routes)
        .merge(control_routes)
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
