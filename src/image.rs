use crate::error::{Error, Result};

/// In-memory pixel container shared by every decoder and encoder.
///
/// Samples are row-major and channel-interleaved (R,G,B[,A]), one byte per
/// sample. `channels` is fixed at construction: 3 for RGB, 4 for RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::malformed(format!(
                "image dimensions must be nonzero, got {}x{}",
                width, height
            )));
        }
        if channels != 3 && channels != 4 {
            return Err(Error::malformed(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        if data.len() != width * height * channels {
            return Err(Error::malformed(format!(
                "pixel data length {} does not match {}x{}x{}",
                data.len(),
                width,
                height,
                channels
            )));
        }
        Ok(PixelBuffer {
            width,
            height,
            channels,
            data,
        })
    }

    /// Allocates a zeroed buffer of the right size.
    pub fn blank(width: usize, height: usize, channels: usize) -> Result<Self> {
        PixelBuffer::new(width, height, channels, vec![0; width * height * channels])
    }

    /// Byte offset of pixel (x, y).
    #[inline]
    pub(crate) fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.channels
    }
}
