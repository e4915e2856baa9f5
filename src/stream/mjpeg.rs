//! MJPEG multipart framing and per-viewer bookkeeping

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::info;

use crate::error::Result;
use crate::video::{JpegEncoder, RawFrame};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Response content type for both feeds
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// One framed JPEG, ready to be written to the response body
pub type EncodedChunk = Bytes;

/// Wrap a JPEG payload in multipart framing:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n`
pub fn mjpeg_part(jpeg_data: &[u8]) -> EncodedChunk {
    let mut buf = BytesMut::with_capacity(64 + jpeg_data.len());

    buf.put_slice(b"--");
    buf.put_slice(BOUNDARY.as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(b"Content-Type: image/jpeg\r\n");
    buf.put_slice(b"\r\n");
    buf.put_slice(jpeg_data);
    buf.put_slice(b"\r\n");

    buf.freeze()
}

/// Compress a raw frame and frame it as one multipart chunk
pub fn encode_chunk(encoder: &mut JpegEncoder, frame: &RawFrame) -> Result<EncodedChunk> {
    let jpeg = encoder.encode(frame)?;
    Ok(mjpeg_part(&jpeg))
}

/// Session key (UUID string), unique per connection
pub type ClientId = String;

/// Per-viewer session information
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: ClientId,
    /// Caller-chosen name used in log lines; may repeat across sessions
    pub label: String,
    pub connected_at: Instant,
    pub frames_sent: u64,
}

impl ClientSession {
    pub fn new(id: ClientId, label: String) -> Self {
        Self {
            id,
            label,
            connected_at: Instant::now(),
            frames_sent: 0,
        }
    }

    pub fn connected_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Viewers currently attached to one feed
pub struct ViewerRegistry {
    feed: &'static str,
    clients: RwLock<HashMap<ClientId, ClientSession>>,
}

impl ViewerRegistry {
    pub fn new(feed: &'static str) -> Self {
        Self {
            feed,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn register_client(&self, client_id: ClientId, label: String) {
        let total = {
            let mut clients = self.clients.write();
            let session = ClientSession::new(client_id.clone(), label.clone());
            clients.insert(client_id.clone(), session);
            clients.len()
        };
        info!(
            "{} viewer {} connected as {} (total: {})",
            self.feed, label, client_id, total
        );
    }

    pub fn unregister_client(&self, client_id: &str) {
        let removed = self.clients.write().remove(client_id);
        if let Some(session) = removed {
            let secs = session.connected_duration().as_secs_f32();
            let avg_fps = if secs > 0.1 {
                session.frames_sent as f32 / secs
            } else {
                0.0
            };
            info!(
                "{} viewer {} disconnected after {:.1}s ({} frames, {:.1} avg FPS)",
                self.feed, session.label, secs, session.frames_sent, avg_fps
            );
        }
    }

    pub fn record_frame_sent(&self, client_id: &str) {
        if let Some(session) = self.clients.write().get_mut(client_id) {
            session.frames_sent += 1;
        }
    }
}

/// Registers a viewer for its lifetime and cancels its producer on drop
///
/// Each guard gets a fresh session key, so viewers sharing a label never
/// overwrite each other's session.
pub struct ClientGuard {
    client_id: ClientId,
    registry: Arc<ViewerRegistry>,
    _cancel: DropGuard,
}

impl ClientGuard {
    pub fn new(label: String, registry: Arc<ViewerRegistry>, cancel: CancellationToken) -> Self {
        let client_id = uuid::Uuid::new_v4().to_string();
        registry.register_client(client_id.clone(), label);
        Self {
            client_id,
            registry,
            _cancel: cancel.drop_guard(),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.client_id
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.registry.unregister_client(&self.client_id);
    }
}

/// Build the streaming response draining `rx`
///
/// The guard lives inside the body stream, so a client disconnect drops it
/// and cancels the producing task.
pub fn stream_response(mut rx: mpsc::Receiver<EncodedChunk>, guard: ClientGuard) -> Response {
    let body_stream = async_stream::stream! {
        let guard = guard;
        while let Some(chunk) = rx.recv().await {
            yield Ok::<Bytes, std::io::Error>(chunk);
            guard.registry.record_frame_sent(guard.id());
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}
