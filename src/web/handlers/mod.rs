pub mod feeds;

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub use feeds::{screen_feed, video_feed};

// ============================================================================
// Health & Status
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Feed status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub camera_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_index: Option<u32>,
    pub screen_active: bool,
    pub camera_viewers: usize,
    pub screen_viewers: usize,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>> {
    // The controller lock may be held by a device open in progress
    let camera = state.camera.clone();
    let (camera_active, camera_index) =
        tokio::task::spawn_blocking(move || (camera.is_active(), camera.active_index()))
            .await
            .map_err(|e| AppError::Internal(format!("Status task failed: {}", e)))?;

    Ok(Json(StatusResponse {
        camera_active,
        camera_index,
        screen_active: state.screen.is_active(),
        camera_viewers: state.camera_viewers.client_count(),
        screen_viewers: state.screen_viewers.client_count(),
    }))
}

// ============================================================================
// Camera control
// ============================================================================

/// Start the camera. Always answers "Camera started", even when discovery
/// found nothing; `/status` tells the difference.
pub async fn start_camera(State(state): State<Arc<AppState>>) -> Result<&'static str> {
    let camera = state.camera.clone();
    let active = tokio::task::spawn_blocking(move || camera.start())
        .await
        .map_err(|e| AppError::Internal(format!("Camera start task failed: {}", e)))?;

    if !active {
        warn!("Start requested but no camera could be opened");
    }
    Ok("Camera started")
}

pub async fn stop_camera(State(state): State<Arc<AppState>>) -> Result<&'static str> {
    let camera = state.camera.clone();
    tokio::task::spawn_blocking(move || camera.stop())
        .await
        .map_err(|e| AppError::Internal(format!("Camera stop task failed: {}", e)))?;
    Ok("Camera stopped")
}

// ============================================================================
// Screen control
// ============================================================================

pub async fn start_screen(State(state): State<Arc<AppState>>) -> &'static str {
    state.screen.start();
    "Screen started"
}

pub async fn stop_screen(State(state): State<Arc<AppState>>) -> &'static str {
    state.screen.stop();
    info!(
        "Screen stopped ({} viewers will be disconnected)",
        state.screen_viewers.client_count()
    );
    "Screen stopped"
}
