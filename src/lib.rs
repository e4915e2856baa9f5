//! duocast - camera and screen streaming over MJPEG
//!
//! Serves a local camera and the primary monitor to browsers as
//! `multipart/x-mixed-replace` streams. The camera is opened on demand
//! through a lifecycle controller; the screen feed is a simple switch.

pub mod config;
pub mod error;
pub mod state;
pub mod stream;
pub mod utils;
pub mod video;
pub mod web;

pub use error::{AppError, Result};
