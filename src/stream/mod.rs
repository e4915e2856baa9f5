//! Per-connection MJPEG producers
//!
//! Every viewer gets its own producer task feeding a capacity-1 channel that
//! the HTTP body drains, so capture is paced by how fast the client reads.
//!
//! # Components
//!
//! - `spawn_camera_stream` - polls the shared camera controller
//! - `spawn_screen_stream` - grabs the desktop while the screen feed is on
//! - `stream_response` - multipart body plus viewer bookkeeping

pub mod backoff;
pub mod camera;
pub mod mjpeg;
pub mod screen;

pub use backoff::BackoffPolicy;
pub use camera::spawn_camera_stream;
pub use mjpeg::{
    encode_chunk, mjpeg_part, stream_response, ClientGuard, EncodedChunk, ViewerRegistry,
    BOUNDARY, CONTENT_TYPE,
};
pub use screen::spawn_screen_stream;
