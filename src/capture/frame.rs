//! Frame and snapshot types
//!
//! Frames are packed 24-bit RGB held in `Bytes`, so handing a snapshot to
//! any number of readers only bumps a reference count.

use bytes::Bytes;

use crate::error::FrameError;

/// Bytes per pixel of a packed RGB frame
pub const BYTES_PER_PIXEL: usize = 3;

/// A decoded video frame (packed RGB, row-major, no padding)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Bytes,
}

impl Frame {
    /// Wrap decoded pixel data, checking that it matches the dimensions
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroDimension { width, height });
        }

        let data = data.into();
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-black frame, shown until a device produces its first picture
    ///
    /// Each side is at least one pixel.
    pub fn blank(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            data: Bytes::from(vec![0u8; Self::byte_len(width, height)]),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw pixel data
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Whether the frame has no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// RGB value at (x, y), or `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Resample to the given size (nearest neighbour)
    ///
    /// Returns a cheap clone when the frame already has that size. Each side
    /// is at least one pixel.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        let (width, height) = (width.max(1), height.max(1));
        if self.is_empty() || (width == self.width && height == self.height) {
            return self.clone();
        }

        let src_w = self.width as usize;
        let columns: Vec<usize> = (0..width as u64)
            .map(|x| (x * self.width as u64 / width as u64) as usize)
            .collect();

        let mut out = Vec::with_capacity(Self::byte_len(width, height));
        for y in 0..height as u64 {
            let src_y = (y * self.height as u64 / height as u64) as usize;
            let start = src_y * src_w * BYTES_PER_PIXEL;
            let row = &self.data[start..start + src_w * BYTES_PER_PIXEL];
            for &src_x in &columns {
                let i = src_x * BYTES_PER_PIXEL;
                out.extend_from_slice(&row[i..i + BYTES_PER_PIXEL]);
            }
        }

        Frame {
            width,
            height,
            data: Bytes::from(out),
        }
    }

    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }
}

/// Latest frame of a device together with its measured input rate
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Most recent normalized frame
    pub frame: Frame,
    /// Frames per second over the trailing rate window
    pub frame_rate: f64,
}

impl FrameSnapshot {
    /// Placeholder published before the first successful read
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            frame: Frame::blank(width, height),
            frame_rate: 0.0,
        }
    }
}
