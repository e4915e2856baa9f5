//! V4L2 camera source

use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::format::{PixelFormat, Resolution};
use super::frame::RawFrame;
use super::source::{CameraBackend, CaptureSource};
use crate::config::CameraConfig;
use crate::error::{AppError, Result};

const MJPEG_FOURCC: &[u8; 4] = b"MJPG";

/// Layout of the buffers the driver hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    Raw(PixelFormat),
    Mjpeg,
}

struct OpenCamera {
    // Declared before `_device` so buffers are unmapped first
    stream: MmapStream<'static>,
    _device: Device,
    wire: WireFormat,
    resolution: Resolution,
    stride: u32,
}

/// Camera at `/dev/video{index}`
pub struct CameraSource {
    index: u32,
    path: PathBuf,
    buffer_count: u32,
    min_frame_size: usize,
    timeout: Duration,
    open: Option<OpenCamera>,
}

impl CameraSource {
    pub fn new(index: u32, config: &CameraConfig) -> Self {
        Self {
            index,
            path: PathBuf::from(format!("/dev/video{}", index)),
            buffer_count: config.buffer_count.max(1),
            min_frame_size: config.min_frame_size,
            timeout: Duration::from_millis(config.read_timeout_ms),
            open: None,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    fn open_device(&self) -> Result<OpenCamera> {
        let device = Device::with_path(&self.path).map_err(|e| {
            AppError::VideoError(format!("Failed to open device {:?}: {}", self.path, e))
        })?;

        let mut fmt = device.format().map_err(|e| {
            AppError::VideoError(format!("Failed to get format of {:?}: {}", self.path, e))
        })?;

        if wire_format(fmt.fourcc).is_none() {
            debug!(
                "{:?} defaults to unsupported {}, requesting YUYV",
                self.path, fmt.fourcc
            );
            fmt.fourcc = FourCC::new(b"YUYV");
            fmt = device.set_format(&fmt).map_err(|e| {
                AppError::VideoError(format!("Failed to set format on {:?}: {}", self.path, e))
            })?;
        }

        let wire = wire_format(fmt.fourcc).ok_or_else(|| {
            AppError::VideoError(format!(
                "Device {:?} offers no usable pixel format ({})",
                self.path, fmt.fourcc
            ))
        })?;

        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, self.buffer_count)
            .map_err(|e| {
                AppError::VideoError(format!("Failed to map buffers on {:?}: {}", self.path, e))
            })?;
        stream.set_timeout(self.timeout);

        debug!(
            "Opened {:?}: {}x{} {} stride={}",
            self.path, fmt.width, fmt.height, fmt.fourcc, fmt.stride
        );

        Ok(OpenCamera {
            stream,
            _device: device,
            wire,
            resolution: Resolution::new(fmt.width, fmt.height),
            stride: fmt.stride,
        })
    }
}

impl CaptureSource for CameraSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self) -> Result<()> {
        if self.open.is_none() {
            self.open = Some(self.open_device()?);
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Option<RawFrame> {
        let cam = self.open.as_mut()?;

        let (buf, meta) = match cam.stream.next() {
            Ok(next) => next,
            Err(e) => {
                debug!("Read from {:?} failed: {}", self.path, e);
                return None;
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        if used < self.min_frame_size {
            debug!("Dropping small frame: {} bytes", used);
            return None;
        }

        let frame = match cam.wire {
            WireFormat::Raw(format) => RawFrame::new(
                Bytes::copy_from_slice(&buf[..used]),
                cam.resolution,
                format,
                cam.stride,
            ),
            WireFormat::Mjpeg => decode_mjpeg(&buf[..used]),
        };

        match frame {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Discarding frame from {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn close(&mut self) {
        if let Some(cam) = self.open.take() {
            debug!("Closing {:?}", self.path);
            drop(cam);
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn wire_format(fourcc: FourCC) -> Option<WireFormat> {
    if &fourcc.repr == MJPEG_FOURCC {
        return Some(WireFormat::Mjpeg);
    }
    PixelFormat::from_fourcc(fourcc).map(WireFormat::Raw)
}

/// Decompress an MJPEG buffer into the camera's canonical BGR order
fn decode_mjpeg(jpeg: &[u8]) -> Result<RawFrame> {
    let image = turbojpeg::decompress(jpeg, turbojpeg::PixelFormat::BGR)
        .map_err(|e| AppError::Capture(format!("MJPEG decode failed: {}", e)))?;

    RawFrame::new(
        Bytes::from(image.pixels),
        Resolution::new(image.width as u32, image.height as u32),
        PixelFormat::Bgr24,
        image.pitch as u32,
    )
}

/// Opens V4L2 cameras by index
pub struct V4l2Backend {
    config: CameraConfig,
}

impl V4l2Backend {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }
}

impl CameraBackend for V4l2Backend {
    fn source(&self, index: u32) -> Box<dyn CaptureSource> {
        Box::new(CameraSource::new(index, &self.config))
    }
}
