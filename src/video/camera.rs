//! Camera lifecycle controller
//!
//! Owns the single open camera handle. Every operation runs under one lock,
//! so control requests and any number of streaming connections can call in
//! concurrently without racing on the device.
//!
//! ```text
//!            start (discovery ok)
//! Inactive ─────────────────────────> Active
//!    ^  │ start (discovery fails)      │  │ start / read miss
//!    │  └──────┘                       │  └──────┘
//!    └─────────────────────────────────┘
//!                   stop
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::frame::RawFrame;
use super::source::{CameraBackend, CaptureSource};

/// Default number of device indices probed by discovery
pub const DEFAULT_PROBE_COUNT: u32 = 5;

struct ActiveCamera {
    index: u32,
    source: Box<dyn CaptureSource>,
}

/// Start/stop-able camera shared by the whole process
pub struct CameraController {
    backend: Arc<dyn CameraBackend>,
    probe_count: u32,
    /// `Some` iff the camera is active
    handle: Mutex<Option<ActiveCamera>>,
}

impl CameraController {
    pub fn new(backend: Arc<dyn CameraBackend>, probe_count: u32) -> Self {
        Self {
            backend,
            probe_count,
            handle: Mutex::new(None),
        }
    }

    /// Activate the camera, running discovery if no device is open
    ///
    /// Finding no device is not an error: the controller simply stays
    /// inactive. Returns whether the camera is active afterwards.
    pub fn start(&self) -> bool {
        let mut handle = self.handle.lock();
        if let Some(active) = handle.as_ref() {
            debug!("Camera already active on index {}", active.index);
            return true;
        }

        match discover(self.backend.as_ref(), self.probe_count) {
            Some(active) => {
                info!("Camera started: {} (index {})", active.source.name(), active.index);
                *handle = Some(active);
                true
            }
            None => {
                warn!(
                    "No working camera among the first {} device indices",
                    self.probe_count
                );
                false
            }
        }
    }

    /// Release the camera. Idempotent.
    pub fn stop(&self) {
        if let Some(mut active) = self.handle.lock().take() {
            active.source.close();
            info!("Camera stopped: {}", active.source.name());
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Index of the open device, if any
    pub fn active_index(&self) -> Option<u32> {
        self.handle.lock().as_ref().map(|active| active.index)
    }

    /// Poll the open device
    ///
    /// Returns `None` when inactive or when the read missed. A miss leaves
    /// the device open; only `stop` deactivates the camera.
    pub fn read_frame(&self) -> Option<RawFrame> {
        let mut handle = self.handle.lock();
        handle.as_mut()?.source.read_frame()
    }
}

/// Probe indices `0..probe_count` in order and keep the first device that
/// yields a frame
fn discover(backend: &dyn CameraBackend, probe_count: u32) -> Option<ActiveCamera> {
    for index in 0..probe_count {
        let mut source = backend.source(index);
        if let Err(e) = source.open() {
            debug!("Probe index {}: {}", index, e);
            continue;
        }

        if source.read_frame().is_some() {
            return Some(ActiveCamera { index, source });
        }

        debug!("Probe index {}: {} opened but produced no frame", index, source.name());
        source.close();
    }
    None
}
