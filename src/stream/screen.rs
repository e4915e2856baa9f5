//! Screen stream producer

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::backoff::{pause, BackoffPolicy};
use super::mjpeg::{encode_chunk, EncodedChunk};
use crate::error::Result;
use crate::utils::LogThrottler;
use crate::video::{CaptureSource, JpegEncoder, ScreenFeed};
use crate::warn_throttled;

/// Spawn the producer for one screen viewer
///
/// Frames are grabbed back to back while the feed is active; clearing the
/// feed switch ends the stream.
pub fn spawn_screen_stream(
    feed: Arc<ScreenFeed>,
    policy: BackoffPolicy,
    jpeg_quality: u32,
    cancel: CancellationToken,
) -> mpsc::Receiver<EncodedChunk> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let encoder = match JpegEncoder::new(jpeg_quality) {
            Ok(encoder) => encoder,
            Err(e) => {
                error!("Screen stream not started: {}", e);
                return;
            }
        };
        let mut source = feed.source();
        if let Err(e) = source.open() {
            error!("Failed to open {}: {}", source.name(), e);
            return;
        }
        if let Some(mut source) = run_screen_stream(&feed, source, encoder, policy, tx, cancel).await {
            source.close();
        }
    });
    rx
}

/// Drives the loop and hands the source back for closing, unless it was lost
/// with a panicked capture task
async fn run_screen_stream(
    feed: &ScreenFeed,
    source: Box<dyn CaptureSource>,
    encoder: JpegEncoder,
    policy: BackoffPolicy,
    tx: mpsc::Sender<EncodedChunk>,
    cancel: CancellationToken,
) -> Option<Box<dyn CaptureSource>> {
    let throttler = LogThrottler::default();
    let mut state = (source, encoder);
    let mut failures = 0u32;

    while feed.is_active() && !cancel.is_cancelled() {
        let (mut source, mut encoder) = state;
        let grabbed = tokio::task::spawn_blocking(move || {
            let chunk = grab_once(source.as_mut(), &mut encoder);
            (source, encoder, chunk)
        })
        .await;

        let chunk = match grabbed {
            Ok((source, encoder, chunk)) => {
                state = (source, encoder);
                chunk
            }
            Err(e) => {
                error!("Screen capture task failed: {}", e);
                return None;
            }
        };

        match chunk {
            Some(Ok(chunk)) => {
                failures = 0;
                throttler.clear("screen_capture");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(chunk) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            failed => {
                match failed {
                    Some(Err(e)) => warn_throttled!(throttler, "screen_encode", "Screen frame dropped: {}", e),
                    _ => warn_throttled!(throttler, "screen_capture", "Screen capture missed"),
                }
                failures += 1;
                if policy.exhausted(failures) {
                    warn!("Screen stream giving up after {} consecutive failures", failures);
                    break;
                }
                if !pause(&cancel, policy.retry_interval).await {
                    break;
                }
            }
        }
    }

    debug!("Screen stream finished");
    Some(state.0)
}

fn grab_once(source: &mut dyn CaptureSource, encoder: &mut JpegEncoder) -> Option<Result<EncodedChunk>> {
    let frame = source.read_frame()?;
    Some(encode_chunk(encoder, &frame))
}
