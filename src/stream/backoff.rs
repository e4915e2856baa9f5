//! Retry pacing for the streaming loops

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;

/// How a streaming loop waits and when it gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait while the source is switched off
    pub idle_interval: Duration,
    /// Wait after a missed read
    pub retry_interval: Duration,
    /// Consecutive misses tolerated before the stream ends (None = unbounded)
    pub max_consecutive_misses: Option<u32>,
}

impl BackoffPolicy {
    pub fn camera(config: &StreamConfig) -> Self {
        Self {
            idle_interval: config.camera_inactive_interval(),
            retry_interval: config.camera_miss_interval(),
            max_consecutive_misses: config.camera_max_misses,
        }
    }

    pub fn screen(config: &StreamConfig) -> Self {
        Self {
            idle_interval: config.screen_retry_interval(),
            retry_interval: config.screen_retry_interval(),
            max_consecutive_misses: config.screen_max_failures,
        }
    }

    /// Whether `misses` consecutive failures exhaust the policy
    pub fn exhausted(&self, misses: u32) -> bool {
        self.max_consecutive_misses.is_some_and(|max| misses >= max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::camera(&StreamConfig::default())
    }
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
pub async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policies_from_config() {
        let config = StreamConfig::default();
        let camera = BackoffPolicy::camera(&config);
        assert_eq!(camera.idle_interval, Duration::from_millis(100));
        assert_eq!(camera.retry_interval, Duration::from_millis(50));
        assert_eq!(camera.max_consecutive_misses, Some(100));

        let screen = BackoffPolicy::screen(&config);
        assert_eq!(screen.max_consecutive_misses, Some(20));
    }

    #[test]
    fn test_exhausted() {
        let bounded = BackoffPolicy {
            max_consecutive_misses: Some(3),
            ..BackoffPolicy::default()
        };
        assert!(!bounded.exhausted(2));
        assert!(bounded.exhausted(3));

        let unbounded = BackoffPolicy {
            max_consecutive_misses: None,
            ..BackoffPolicy::default()
        };
        assert!(!unbounded.exhausted(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancelled() {
        let cancel = CancellationToken::new();
        assert!(pause(&cancel, Duration::from_millis(10)).await);
        cancel.cancel();
        assert!(!pause(&cancel, Duration::from_secs(3600)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_wakes_on_cancel() {
        let cancel = CancellationToken::new();
        let mut waiting = tokio_test::task::spawn(pause(&cancel, Duration::from_secs(60)));
        tokio_test::assert_pending!(waiting.poll());

        cancel.cancel();
        assert!(waiting.is_woken());
        tokio_test::assert_ready_eq!(waiting.poll(), false);
    }
}
