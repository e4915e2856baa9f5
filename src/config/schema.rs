use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::video::camera::DEFAULT_PROBE_COUNT;
use crate::video::encoder::DEFAULT_QUALITY;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server settings
    pub web: WebConfig,
    /// Camera discovery and capture settings
    pub camera: CameraConfig,
    /// Screen feed settings
    pub screen: ScreenConfig,
    /// Streaming loop settings
    pub stream: StreamConfig,
}

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub bind_address: String,
    /// HTTP port
    pub http_port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 5000,
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device indices probed during discovery (`/dev/video0..N`)
    pub probe_count: u32,
    /// Number of mmap capture buffers
    pub buffer_count: u32,
    /// Frames smaller than this are treated as a miss (bytes)
    pub min_frame_size: usize,
    /// Per-read timeout (ms)
    pub read_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            probe_count: DEFAULT_PROBE_COUNT,
            buffer_count: 2,
            min_frame_size: 128,
            read_timeout_ms: 2000,
        }
    }
}

/// Screen feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Whether the screen feed is on at startup
    pub enabled: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Streaming loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u32,
    /// Wait between polls while the camera is off (ms)
    pub camera_inactive_ms: u64,
    /// Wait after a missed camera read (ms)
    pub camera_miss_ms: u64,
    /// Consecutive camera misses before a stream gives up (None = never)
    pub camera_max_misses: Option<u32>,
    /// Wait after a failed screen grab (ms)
    pub screen_retry_ms: u64,
    /// Consecutive screen grab failures before a stream gives up (None = never)
    pub screen_max_failures: Option<u32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_QUALITY,
            camera_inactive_ms: 100,
            camera_miss_ms: 50,
            camera_max_misses: Some(100),
            screen_retry_ms: 50,
            screen_max_failures: Some(20),
        }
    }
}

impl StreamConfig {
    pub fn camera_inactive_interval(&self) -> Duration {
        Duration::from_millis(self.camera_inactive_ms)
    }

    pub fn camera_miss_interval(&self) -> Duration {
        Duration::from_millis(self.camera_miss_ms)
    }

    pub fn screen_retry_interval(&self) -> Duration {
        Duration::from_millis(self.screen_retry_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.web.bind_address, "0.0.0.0");
        assert_eq!(config.web.http_port, 5000);
        assert_eq!(config.camera.probe_count, 5);
        assert!(config.screen.enabled);
        assert_eq!(config.stream.camera_inactive_interval(), Duration::from_millis(100));
        assert_eq!(config.stream.camera_miss_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"web":{"http_port":8080},"stream":{"camera_max_misses":null}}"#)
                .unwrap();
        assert_eq!(config.web.http_port, 8080);
        assert_eq!(config.web.bind_address, "0.0.0.0");
        assert_eq!(config.stream.camera_max_misses, None);
        assert_eq!(config.stream.jpeg_quality, 80);
    }
}
