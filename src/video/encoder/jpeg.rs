//! JPEG encoder implementation
//!
//! Packed RGB layouts go straight into turbojpeg. YUYV is repacked to I420
//! first and compressed through turbojpeg's YUV path, which skips its
//! internal colour conversion.

use bytes::Bytes;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::video::convert::Yuv420pBuffer;
use crate::video::format::PixelFormat;
use crate::video::frame::RawFrame;

/// Default JPEG quality
pub const DEFAULT_QUALITY: u32 = 80;

/// JPEG encoder using turbojpeg
///
/// Note: This encoder is NOT thread-safe due to turbojpeg limitations.
/// Each stream owns its own instance.
pub struct JpegEncoder {
    quality: u32,
    compressor: turbojpeg::Compressor,
    /// I420 scratch buffer, rebuilt when the YUYV resolution changes
    i420_buffer: Option<Yuv420pBuffer>,
}

impl JpegEncoder {
    /// Create a new JPEG encoder with the given quality (1-100)
    pub fn new(quality: u32) -> Result<Self> {
        let mut compressor = turbojpeg::Compressor::new().map_err(|e| {
            AppError::Encode(format!("Failed to create turbojpeg compressor: {}", e))
        })?;

        let quality = quality.clamp(1, 100);
        compressor
            .set_quality(quality as i32)
            .map_err(|e| AppError::Encode(format!("Failed to set JPEG quality: {}", e)))?;

        Ok(Self {
            quality,
            compressor,
            i420_buffer: None,
        })
    }

    pub fn quality(&self) -> u32 {
        self.quality
    }

    /// Compress a raw frame to a JPEG payload
    pub fn encode(&mut self, frame: &RawFrame) -> Result<Bytes> {
        let jpeg = match frame.format {
            PixelFormat::Yuyv => self.encode_yuyv(frame)?,
            PixelFormat::Rgb24 => self.encode_packed(frame, turbojpeg::PixelFormat::RGB)?,
            PixelFormat::Bgr24 => self.encode_packed(frame, turbojpeg::PixelFormat::BGR)?,
            PixelFormat::Rgba => self.encode_packed(frame, turbojpeg::PixelFormat::RGBA)?,
            PixelFormat::Bgra => self.encode_packed(frame, turbojpeg::PixelFormat::BGRA)?,
        };
        Ok(Bytes::from(jpeg))
    }

    fn encode_packed(&mut self, frame: &RawFrame, format: turbojpeg::PixelFormat) -> Result<Vec<u8>> {
        let image = turbojpeg::Image {
            pixels: frame.data(),
            width: frame.width() as usize,
            pitch: frame.stride as usize,
            height: frame.height() as usize,
            format,
        };

        self.compressor
            .compress_to_vec(image)
            .map_err(|e| AppError::Encode(format!("JPEG compression failed: {}", e)))
    }

    fn encode_yuyv(&mut self, frame: &RawFrame) -> Result<Vec<u8>> {
        let stale = self
            .i420_buffer
            .as_ref()
            .map_or(true, |buf| buf.resolution() != frame.resolution);
        if stale {
            debug!("Allocating I420 buffer for {}", frame.resolution);
            self.i420_buffer = Some(Yuv420pBuffer::new(frame.resolution));
        }

        let Some(buffer) = self.i420_buffer.as_mut() else {
            return Err(AppError::Internal("I420 buffer missing".to_string()));
        };
        buffer.fill_from_yuyv(frame)?;

        let yuv_image = turbojpeg::YuvImage {
            pixels: buffer.as_bytes(),
            width: frame.width() as usize,
            align: 1,
            height: frame.height() as usize,
            subsamp: turbojpeg::Subsamp::Sub2x2,
        };

        self.compressor
            .compress_yuv_to_vec(yuv_image)
            .map_err(|e| AppError::Encode(format!("JPEG compression failed: {}", e)))
    }
}
