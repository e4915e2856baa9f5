//! Desktop capture source

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use xcap::Monitor;

use super::format::{PixelFormat, Resolution};
use super::frame::RawFrame;
use super::source::{CaptureSource, ScreenBackend};
use crate::error::{AppError, Result};

/// Grabs the full primary monitor on every poll
///
/// There is no persistent handle: each `read_frame` re-resolves the monitor
/// and captures it, so a hot-plugged display is picked up on the next poll.
#[derive(Debug, Default)]
pub struct ScreenSource {
    opened: bool,
}

impl ScreenSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn grab(&self) -> Result<RawFrame> {
        let monitor = primary_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|e| AppError::Capture(format!("Screen capture failed: {}", e)))?;

        let resolution = Resolution::new(image.width(), image.height());
        RawFrame::packed(image.into_raw(), resolution, PixelFormat::Rgba)
    }
}

impl CaptureSource for ScreenSource {
    fn name(&self) -> String {
        "screen".to_string()
    }

    fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Option<RawFrame> {
        if !self.opened {
            return None;
        }
        match self.grab() {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

fn primary_monitor() -> Result<Monitor> {
    let monitors = Monitor::all()
        .map_err(|e| AppError::Capture(format!("Failed to enumerate monitors: {}", e)))?;

    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary().unwrap_or(false) {
            return Ok(monitor);
        }
        if fallback.is_none() {
            fallback = Some(monitor);
        }
    }

    fallback.ok_or_else(|| AppError::Capture("No monitor found".to_string()))
}

/// Hands out xcap-backed screen sources
#[derive(Debug, Default)]
pub struct XcapBackend;

impl ScreenBackend for XcapBackend {
    fn source(&self) -> Box<dyn CaptureSource> {
        Box::new(ScreenSource::new())
    }
}

/// Process-wide screen feed switch
///
/// Screen streams keep producing frames only while the feed is active.
pub struct ScreenFeed {
    backend: Arc<dyn ScreenBackend>,
    active: AtomicBool,
}

impl ScreenFeed {
    pub fn new(backend: Arc<dyn ScreenBackend>, active: bool) -> Self {
        Self {
            backend,
            active: AtomicBool::new(active),
        }
    }

    pub fn start(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            info!("Screen feed enabled");
        }
    }

    pub fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Screen feed disabled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Fresh source for one streaming connection
    pub fn source(&self) -> Box<dyn CaptureSource> {
        self.backend.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::StubScreenBackend;

    #[test]
    fn test_feed_switch() {
        let feed = ScreenFeed::new(Arc::new(StubScreenBackend::default()), true);
        assert!(feed.is_active());
        feed.stop();
        feed.stop();
        assert!(!feed.is_active());
        feed.start();
        assert!(feed.is_active());

        let mut source = feed.source();
        source.open().unwrap();
        assert!(source.read_frame().is_some());
    }

    #[test]
    fn test_closed_source_reads_nothing() {
        let mut source = ScreenSource::new();
        assert!(source.read_frame().is_none());
        source.open().unwrap();
        source.close();
        source.close();
        assert!(source.read_frame().is_none());
    }
}
