//! Pixel format conversion utilities
//!
//! Repacks YUYV (what most UVC cameras deliver uncompressed) into planar
//! I420 so turbojpeg can compress it without a colour-space round trip.

use crate::error::{AppError, Result};
use crate::video::format::{PixelFormat, Resolution};
use crate::video::frame::RawFrame;

/// YUV420P buffer with separate Y, U, V planes
///
/// Planes follow turbojpeg's 4:2:0 layout with row alignment 1: the luma
/// plane is padded to even width and height and the chroma planes are half
/// of that. Padding replicates the last real row and column.
pub struct Yuv420pBuffer {
    /// Raw buffer containing all planes
    data: Vec<u8>,
    resolution: Resolution,
    /// Padded luma plane width (also its row stride)
    luma_width: usize,
    /// Padded luma plane height
    luma_height: usize,
    /// U plane offset
    u_offset: usize,
    /// V plane offset
    v_offset: usize,
}

impl Yuv420pBuffer {
    /// Create a new YUV420P buffer for the given resolution
    pub fn new(resolution: Resolution) -> Self {
        let luma_width = pad_even(resolution.width as usize);
        let luma_height = pad_even(resolution.height as usize);
        let y_size = luma_width * luma_height;
        let uv_size = (luma_width / 2) * (luma_height / 2);

        Self {
            data: vec![0u8; y_size + uv_size * 2],
            resolution,
            luma_width,
            luma_height,
            u_offset: y_size,
            v_offset: y_size + uv_size,
        }
    }

    /// Get the raw buffer as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn y_plane(&self) -> &[u8] {
        &self.data[..self.u_offset]
    }

    pub fn u_plane(&self) -> &[u8] {
        &self.data[self.u_offset..self.v_offset]
    }

    pub fn v_plane(&self) -> &[u8] {
        &self.data[self.v_offset..]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Software conversion from a YUYV frame (Y0 U Y1 V), honouring its stride
    ///
    /// Chroma of each row pair is averaged; an odd last row is paired with itself.
    pub fn fill_from_yuyv(&mut self, frame: &RawFrame) -> Result<()> {
        if frame.format != PixelFormat::Yuyv {
            return Err(AppError::Encode(format!(
                "Expected YUYV frame, got {}",
                frame.format
            )));
        }
        if frame.resolution != self.resolution {
            return Err(AppError::Encode(format!(
                "Frame is {}, buffer is {}",
                frame.resolution, self.resolution
            )));
        }

        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;
        if width < 2 {
            return Err(AppError::Encode("YUYV frame narrower than one macropixel".to_string()));
        }
        let stride = frame.stride as usize;
        let luma_width = self.luma_width;
        let chroma_width = luma_width / 2;
        let last_macropixel = width / 2 - 1;
        let yuyv = frame.data();
        let src_row = |row: usize| {
            let start = row.min(height - 1) * stride;
            &yuyv[start..start + width * 2]
        };

        let (y_plane, uv_planes) = self.data.split_at_mut(self.u_offset);
        let (u_plane, v_plane) = uv_planes.split_at_mut(self.v_offset - self.u_offset);

        for (row, dst) in y_plane.chunks_exact_mut(luma_width).enumerate() {
            let src = src_row(row);
            for (col, y) in dst.iter_mut().enumerate() {
                *y = src[col.min(width - 1) * 2];
            }
        }

        for chroma_row in 0..self.luma_height / 2 {
            let row0 = src_row(chroma_row * 2);
            let row1 = src_row(chroma_row * 2 + 1);
            let offset = chroma_row * chroma_width;

            for pair in 0..chroma_width {
                // Columns past the last full macropixel reuse its chroma
                let base = pair.min(last_macropixel) * 4;
                let u0 = row0[base + 1] as u16;
                let v0 = row0[base + 3] as u16;
                let u1 = row1[base + 1] as u16;
                let v1 = row1[base + 3] as u16;

                u_plane[offset + pair] = ((u0 + u1) / 2) as u8;
                v_plane[offset + pair] = ((v0 + v1) / 2) as u8;
            }
        }

        Ok(())
    }
}

fn pad_even(n: usize) -> usize {
    (n + 1) & !1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_layout() {
        let buf = Yuv420pBuffer::new(Resolution::VGA);
        assert_eq!(buf.len(), 640 * 480 * 3 / 2);
        assert_eq!(buf.y_plane().len(), 640 * 480);
        assert_eq!(buf.u_plane().len(), 320 * 240);
        assert_eq!(buf.v_plane().len(), 320 * 240);
    }

    #[test]
    fn test_yuyv_repack() {
        // 2x2 frame: row 0 = Y 10,20 U 100 V 200; row 1 = Y 30,40 U 110 V 210
        let data = vec![10, 100, 20, 200, 30, 110, 40, 210];
        let frame = RawFrame::packed(data, Resolution::new(2, 2), PixelFormat::Yuyv).unwrap();

        let mut buf = Yuv420pBuffer::new(frame.resolution);
        buf.fill_from_yuyv(&frame).unwrap();

        assert_eq!(buf.y_plane(), &[10, 20, 30, 40]);
        assert_eq!(buf.u_plane(), &[105]);
        assert_eq!(buf.v_plane(), &[205]);
    }

    #[test]
    fn test_yuyv_odd_height() {
        let data = vec![1, 50, 2, 60, 3, 70, 4, 80, 5, 90, 6, 100];
        let frame = RawFrame::packed(data, Resolution::new(2, 3), PixelFormat::Yuyv).unwrap();

        let mut buf = Yuv420pBuffer::new(frame.resolution);
        buf.fill_from_yuyv(&frame).unwrap();

        // Last row is replicated into the padding row
        assert_eq!(buf.y_plane(), &[1, 2, 3, 4, 5, 6, 5, 6]);
        assert_eq!(buf.u_plane(), &[60, 90]);
        assert_eq!(buf.v_plane(), &[70, 100]);
    }

    #[test]
    fn test_odd_geometry_matches_turbojpeg_layout() {
        for (w, h) in [(16, 15), (15, 16), (15, 15)] {
            let buf = Yuv420pBuffer::new(Resolution::new(w, h));
            let expected = turbojpeg::yuv_pixels_len(
                w as usize,
                1,
                h as usize,
                turbojpeg::Subsamp::Sub2x2,
            )
            .unwrap();
            assert_eq!(buf.len(), expected, "{}x{}", w, h);
        }
    }

    #[test]
    fn test_odd_width_replicates_last_column() {
        // 3x2: one full macropixel plus a lone trailing luma sample
        let data = vec![
            1, 50, 2, 60, 3, 0, //
            4, 70, 5, 80, 6, 0,
        ];
        let frame = RawFrame::packed(data, Resolution::new(3, 2), PixelFormat::Yuyv).unwrap();

        let mut buf = Yuv420pBuffer::new(frame.resolution);
        buf.fill_from_yuyv(&frame).unwrap();

        assert_eq!(buf.y_plane(), &[1, 2, 3, 3, 4, 5, 6, 6]);
        assert_eq!(buf.u_plane(), &[60, 60]);
        assert_eq!(buf.v_plane(), &[70, 70]);
    }

    #[test]
    fn test_rejects_mismatched_frame() {
        let frame = RawFrame::packed(vec![0; 12], Resolution::new(2, 2), PixelFormat::Rgb24).unwrap();
        let mut buf = Yuv420pBuffer::new(frame.resolution);
        assert!(buf.fill_from_yuyv(&frame).is_err());
    }
}
