//! Video capture module
//!
//! Capture sources (V4L2 camera, desktop), the camera lifecycle controller
//! and the JPEG encoder shared by both feeds.

pub mod camera;
pub mod convert;
pub mod device;
pub mod encoder;
pub mod format;
pub mod frame;
pub mod screen;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use camera::CameraController;
pub use device::{CameraSource, V4l2Backend};
pub use encoder::JpegEncoder;
pub use format::{PixelFormat, Resolution};
pub use frame::RawFrame;
pub use screen::{ScreenFeed, ScreenSource, XcapBackend};
pub use source::{CameraBackend, CaptureSource, ScreenBackend};
