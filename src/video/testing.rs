//! In-memory capture sources for tests

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::format::{PixelFormat, Resolution};
use super::frame::RawFrame;
use super::source::{CameraBackend, CaptureSource, ScreenBackend};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubEvent {
    Open(u32),
    Read(u32),
    Close(u32),
}

/// A tiny frame whose pixels all carry `fill`
pub fn stub_frame(fill: u8) -> RawFrame {
    RawFrame::packed(vec![fill; 4 * 4 * 3], Resolution::new(4, 4), PixelFormat::Rgb24).unwrap()
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<StubEvent>>,
    open_attempts: AtomicUsize,
    open_now: AtomicUsize,
    max_open: AtomicUsize,
    failing: AtomicBool,
}

/// Camera backend where only the listed indices produce frames
pub struct StubCameraBackend {
    working: HashSet<u32>,
    unopenable: HashSet<u32>,
    shared: Arc<Shared>,
}

impl StubCameraBackend {
    pub fn working(indices: &[u32]) -> Self {
        Self {
            working: indices.iter().copied().collect(),
            unopenable: HashSet::new(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Indices whose `open` fails outright
    pub fn unopenable(mut self, indices: &[u32]) -> Self {
        self.unopenable = indices.iter().copied().collect();
        self
    }

    pub fn events(&self) -> Vec<StubEvent> {
        self.shared.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.shared.events.lock().clear();
    }

    pub fn open_count(&self) -> usize {
        self.shared.open_attempts.load(Ordering::SeqCst)
    }

    pub fn currently_open(&self) -> usize {
        self.shared.open_now.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.shared.max_open.load(Ordering::SeqCst)
    }

    /// Make every read on an open working device miss
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }
}

impl CameraBackend for StubCameraBackend {
    fn source(&self, index: u32) -> Box<dyn CaptureSource> {
        Box::new(StubCamera {
            index,
            working: self.working.contains(&index),
            openable: !self.unopenable.contains(&index),
            opened: false,
            shared: self.shared.clone(),
        })
    }
}

struct StubCamera {
    index: u32,
    working: bool,
    openable: bool,
    opened: bool,
    shared: Arc<Shared>,
}

impl CaptureSource for StubCamera {
    fn name(&self) -> String {
        format!("stub{}", self.index)
    }

    fn open(&mut self) -> Result<()> {
        self.shared.events.lock().push(StubEvent::Open(self.index));
        self.shared.open_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.openable {
            return Err(AppError::VideoError(format!("stub{} unavailable", self.index)));
        }
        self.opened = true;
        let now = self.shared.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_open.fetch_max(now, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&mut self) -> Option<RawFrame> {
        self.shared.events.lock().push(StubEvent::Read(self.index));
        if !self.opened || !self.working || self.shared.failing.load(Ordering::SeqCst) {
            return None;
        }
        Some(stub_frame(self.index as u8))
    }

    fn close(&mut self) {
        if self.opened {
            self.opened = false;
            self.shared.open_now.fetch_sub(1, Ordering::SeqCst);
            self.shared.events.lock().push(StubEvent::Close(self.index));
        }
    }
}

/// Screen backend counting grabs, optionally failing every one
#[derive(Default)]
pub struct StubScreenBackend {
    grabs: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl StubScreenBackend {
    pub fn failing() -> Self {
        let backend = Self::default();
        backend.failing.store(true, Ordering::SeqCst);
        backend
    }

    pub fn grabs(&self) -> u64 {
        self.grabs.load(Ordering::SeqCst)
    }
}

impl ScreenBackend for StubScreenBackend {
    fn source(&self) -> Box<dyn CaptureSource> {
        Box::new(StubScreen {
            grabs: self.grabs.clone(),
            failing: self.failing.clone(),
        })
    }
}

struct StubScreen {
    grabs: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl CaptureSource for StubScreen {
    fn name(&self) -> String {
        "stub-screen".to_string()
    }

    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_frame(&mut self) -> Option<RawFrame> {
        let n = self.grabs.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return None;
        }
        Some(stub_frame(n as u8))
    }

    fn close(&mut self) {}
}
