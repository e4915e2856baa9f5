//! MJPEG feed endpoints

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;
use crate::stream::{
    spawn_camera_stream, spawn_screen_stream, stream_response, BackoffPolicy, ClientGuard,
};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Caller-chosen name, used only to label log lines
    pub client_id: Option<String>,
}

fn viewer_label(query: FeedQuery) -> String {
    query
        .client_id
        .filter(|id| !id.is_empty() && id.len() <= 64)
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn video_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Response {
    let config = state.config.get();
    let label = viewer_label(query);
    debug!("Opening camera feed for {}", label);

    let cancel = state.shutdown.child_token();
    let rx = spawn_camera_stream(
        state.camera.clone(),
        BackoffPolicy::camera(&config.stream),
        config.stream.jpeg_quality,
        cancel.clone(),
    );
    let guard = ClientGuard::new(label, state.camera_viewers.clone(), cancel);
    stream_response(rx, guard)
}

pub async fn screen_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Response {
    let config = state.config.get();
    let label = viewer_label(query);
    debug!("Opening screen feed for {}", label);

    let cancel = state.shutdown.child_token();
    let rx = spawn_screen_stream(
        state.screen.clone(),
        BackoffPolicy::screen(&config.stream),
        config.stream.jpeg_quality,
        cancel.clone(),
    );
    let guard = ClientGuard::new(label, state.screen_viewers.clone(), cancel);
    stream_response(rx, guard)
}
