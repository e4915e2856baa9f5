//! Frame encoders
//!
//! Only JPEG is needed: both feeds are delivered as MJPEG.

pub mod jpeg;

pub use jpeg::{JpegEncoder, DEFAULT_QUALITY};
