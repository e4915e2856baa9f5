//! Capture source abstraction
//!
//! A capture source is anything that can be opened, polled for a frame and
//! closed: a V4L2 camera, the desktop, or a stub in tests.

use super::frame::RawFrame;
use crate::error::Result;

/// A device that produces raw frames when polled
///
/// All methods block; async callers run them on the blocking pool.
pub trait CaptureSource: Send {
    /// Human readable name for logs
    fn name(&self) -> String;

    /// Acquire the underlying device
    fn open(&mut self) -> Result<()>;

    /// Poll one frame
    ///
    /// `None` is a transient miss. The source stays open and the caller
    /// should poll again.
    fn read_frame(&mut self) -> Option<RawFrame>;

    /// Release the device. Safe to call on a closed source.
    fn close(&mut self);
}

/// Factory for camera sources addressed by device index
pub trait CameraBackend: Send + Sync {
    /// Build an unopened source for the given index
    fn source(&self, index: u32) -> Box<dyn CaptureSource>;
}

/// Factory for screen sources, one per streaming connection
pub trait ScreenBackend: Send + Sync {
    fn source(&self) -> Box<dyn CaptureSource>;
}
