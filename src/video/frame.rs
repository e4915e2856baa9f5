//! Raw frame data structure

use bytes::Bytes;

use super::format::{PixelFormat, Resolution};
use crate::error::{AppError, Result};

/// An uncompressed bitmap produced by one poll of a capture source
///
/// Frames are never retained: the stream that requested one hands it
/// straight to the encoder and drops it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    data: Bytes,
    /// Frame resolution
    pub resolution: Resolution,
    /// Pixel format / channel order
    pub format: PixelFormat,
    /// Bytes per row
    pub stride: u32,
}

impl RawFrame {
    /// Create a new frame, checking that the buffer covers every row
    pub fn new(
        data: Bytes,
        resolution: Resolution,
        format: PixelFormat,
        stride: u32,
    ) -> Result<Self> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(AppError::Capture(format!("Empty frame geometry {}", resolution)));
        }
        if (stride as usize) < format.min_stride(resolution.width) {
            return Err(AppError::Capture(format!(
                "Stride {} too small for {} {}",
                stride, resolution, format
            )));
        }
        let expected = stride as usize * resolution.height as usize;
        if data.len() < expected {
            return Err(AppError::Capture(format!(
                "{} frame data too small: {} < {}",
                format,
                data.len(),
                expected
            )));
        }

        Ok(Self {
            data,
            resolution,
            format,
            stride,
        })
    }

    /// Create a tightly packed frame from a Vec<u8>
    pub fn packed(data: Vec<u8>, resolution: Resolution, format: PixelFormat) -> Result<Self> {
        let stride = format.min_stride(resolution.width) as u32;
        Self::new(Bytes::from(data), resolution, format, stride)
    }

    /// Get frame data as bytes slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get data length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }
}
