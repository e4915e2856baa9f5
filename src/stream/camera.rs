//! Camera stream producer
//!
//! One task per viewer. Each task polls the shared controller on its own
//! cadence; there is no shared frame cache between viewers.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::backoff::{pause, BackoffPolicy};
use super::mjpeg::{encode_chunk, EncodedChunk};
use crate::error::AppError;
use crate::utils::LogThrottler;
use crate::video::{CameraController, JpegEncoder};
use crate::warn_throttled;

enum CameraPoll {
    Inactive,
    Miss,
    Chunk(EncodedChunk),
    EncodeFailed(AppError),
}

/// Spawn the producer for one camera viewer
///
/// The returned receiver yields framed JPEG chunks until `cancel` fires, the
/// receiver is dropped, or the miss budget in `policy` runs out. While the
/// camera is off the producer idles without yielding.
pub fn spawn_camera_stream(
    camera: Arc<CameraController>,
    policy: BackoffPolicy,
    jpeg_quality: u32,
    cancel: CancellationToken,
) -> mpsc::Receiver<EncodedChunk> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        match JpegEncoder::new(jpeg_quality) {
            Ok(encoder) => run_camera_stream(camera, encoder, policy, tx, cancel).await,
            Err(e) => error!("Camera stream not started: {}", e),
        }
    });
    rx
}

async fn run_camera_stream(
    camera: Arc<CameraController>,
    encoder: JpegEncoder,
    policy: BackoffPolicy,
    tx: mpsc::Sender<EncodedChunk>,
    cancel: CancellationToken,
) {
    let throttler = LogThrottler::default();
    let mut encoder = Some(encoder);
    let mut misses = 0u32;

    while !cancel.is_cancelled() {
        let Some(enc) = encoder.take() else {
            break;
        };
        let poll_camera = camera.clone();
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            res = tokio::task::spawn_blocking(move || {
                let mut enc = enc;
                let poll = poll_once(&poll_camera, &mut enc);
                (enc, poll)
            }) => res,
        };

        let poll = match polled {
            Ok((enc, poll)) => {
                encoder = Some(enc);
                poll
            }
            Err(e) => {
                error!("Camera poll task failed: {}", e);
                break;
            }
        };

        match poll {
            CameraPoll::Inactive => {
                misses = 0;
                if !pause(&cancel, policy.idle_interval).await {
                    break;
                }
            }
            CameraPoll::Chunk(chunk) => {
                misses = 0;
                throttler.clear("camera_miss");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(chunk) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            CameraPoll::Miss => {
                warn_throttled!(throttler, "camera_miss", "Camera read missed");
                misses += 1;
                if !backoff_after_miss(&policy, &cancel, misses).await {
                    break;
                }
            }
            CameraPoll::EncodeFailed(e) => {
                warn_throttled!(throttler, "camera_encode", "Camera frame dropped: {}", e);
                misses += 1;
                if !backoff_after_miss(&policy, &cancel, misses).await {
                    break;
                }
            }
        }
    }

    debug!("Camera stream finished");
}

/// Returns `false` when the stream should end
async fn backoff_after_miss(policy: &BackoffPolicy, cancel: &CancellationToken, misses: u32) -> bool {
    if policy.exhausted(misses) {
        warn!("Camera stream giving up after {} consecutive misses", misses);
        return false;
    }
    pause(cancel, policy.retry_interval).await
}

fn poll_once(camera: &CameraController, encoder: &mut JpegEncoder) -> CameraPoll {
    if !camera.is_active() {
        return CameraPoll::Inactive;
    }
    let Some(frame) = camera.read_frame() else {
        return CameraPoll::Miss;
    };
    match encode_chunk(encoder, &frame) {
        Ok(chunk) => CameraPoll::Chunk(chunk),
        Err(e) => CameraPoll::EncodeFailed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::camera::DEFAULT_PROBE_COUNT;
    use crate::video::testing::{StubCameraBackend, StubEvent};
    use std::time::Duration;

    fn setup(working: &[u32]) -> (Arc<StubCameraBackend>, Arc<CameraController>) {
        let backend = Arc::new(StubCameraBackend::working(working));
        let camera = Arc::new(CameraController::new(backend.clone(), DEFAULT_PROBE_COUNT));
        (backend, camera)
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_camera_idles_without_ending() {
        let (backend, camera) = setup(&[0]);
        let cancel = CancellationToken::new();
        let mut rx = spawn_camera_stream(camera.clone(), BackoffPolicy::default(), 80, cancel.clone());

        let waited = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(waited.is_err(), "inactive camera must not emit or end the stream");
        assert!(backend.events().is_empty());

        tokio::task::spawn_blocking({
            let camera = camera.clone();
            move || camera.start()
        })
        .await
        .unwrap();

        let chunk = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("frame after start")
            .expect("stream open");
        assert!(chunk.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_follow_reads() {
        let (backend, camera) = setup(&[1]);
        camera.start();
        backend.clear_events();

        let cancel = CancellationToken::new();
        let mut rx = spawn_camera_stream(camera, BackoffPolicy::default(), 80, cancel.clone());
        for _ in 0..3 {
            assert!(rx.recv().await.is_some());
        }
        cancel.cancel();

        assert!(backend.events().iter().all(|e| *e == StubEvent::Read(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_misses_are_retried() {
        let (backend, camera) = setup(&[0]);
        camera.start();
        backend.set_failing(true);

        let cancel = CancellationToken::new();
        let mut rx = spawn_camera_stream(camera.clone(), BackoffPolicy::default(), 80, cancel.clone());

        let waited = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(waited.is_err());
        assert!(camera.is_active(), "misses must not close the device");

        backend.set_failing(false);
        assert!(rx.recv().await.is_some());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_budget_ends_stream() {
        let (backend, camera) = setup(&[0]);
        camera.start();
        backend.set_failing(true);

        let policy = BackoffPolicy {
            max_consecutive_misses: Some(3),
            ..BackoffPolicy::default()
        };
        let mut rx = spawn_camera_stream(camera.clone(), policy, 80, CancellationToken::new());

        assert!(rx.recv().await.is_none());
        assert!(camera.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_producer() {
        let (_backend, camera) = setup(&[]);
        let cancel = CancellationToken::new();
        let mut rx = spawn_camera_stream(camera, BackoffPolicy::default(), 80, cancel.clone());

        cancel.cancel();
        let ended = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(matches!(ended, Ok(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewers_poll_independently() {
        let (backend, camera) = setup(&[0]);
        camera.start();
        backend.clear_events();

        let cancel = CancellationToken::new();
        let mut a = spawn_camera_stream(camera.clone(), BackoffPolicy::default(), 80, cancel.clone());
        let mut b = spawn_camera_stream(camera.clone(), BackoffPolicy::default(), 80, cancel.clone());

        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
        cancel.cancel();

        let reads = backend
            .events()
            .iter()
            .filter(|e| matches!(e, StubEvent::Read(_)))
            .count();
        assert!(reads >= 2);
    }
}
