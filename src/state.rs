use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigStore;
use crate::stream::ViewerRegistry;
use crate::video::{CameraBackend, CameraController, ScreenBackend, ScreenFeed};

/// Application-wide state shared across handlers
///
/// Streaming handlers derive a child of `shutdown` for every viewer, so
/// cancelling it tears down all producers at once.
pub struct AppState {
    /// Configuration store
    pub config: ConfigStore,
    /// Camera lifecycle controller, the single owner of the device handle
    pub camera: Arc<CameraController>,
    /// Screen feed switch and source factory
    pub screen: Arc<ScreenFeed>,
    pub camera_viewers: Arc<ViewerRegistry>,
    pub screen_viewers: Arc<ViewerRegistry>,
    /// Process shutdown token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ConfigStore,
        camera_backend: Arc<dyn CameraBackend>,
        screen_backend: Arc<dyn ScreenBackend>,
    ) -> Arc<Self> {
        let snapshot = config.get();
        let camera = Arc::new(CameraController::new(
            camera_backend,
            snapshot.camera.probe_count,
        ));
        let screen = Arc::new(ScreenFeed::new(screen_backend, snapshot.screen.enabled));

        Arc::new(Self {
            config,
            camera,
            screen,
            camera_viewers: Arc::new(ViewerRegistry::new("Camera")),
            screen_viewers: Arc::new(ViewerRegistry::new("Screen")),
            shutdown: CancellationToken::new(),
        })
    }

    /// Cancel every producer and release the camera
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.camera.stop();
    }
}
