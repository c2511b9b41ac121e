use thiserror::Error;

use crate::rgb::Rgb;

const CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    #[error("raster {width}x{height} needs {expected} RGBA bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("raster {width}x{height} does not fit in memory")]
    TooLarge { width: u32, height: u32 },
}

fn byte_len(width: u32, height: u32) -> Result<usize, RasterError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or(RasterError::TooLarge { width, height })
}

/// Decoded RGBA8 pixels at the image's native resolution, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
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

    /// Opaque buffer of a single color.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Result<Self, RasterError> {
        let data = [color.r, color.g, color.b, 255].repeat(byte_len(width, height)? / CHANNELS);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }

    /// Color at `(x, y)`; alpha is ignored.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let i = self.offset(x, y)?;
        Some(Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Overwrite the color channels at `(x, y)`, keeping alpha. Out-of-range writes are dropped.
    pub fn put(&mut self, x: u32, y: u32, color: Rgb) {
        if let Some(i) = self.offset(x, y) {
            self.data[i] = color.r;
            self.data[i + 1] = color.g;
            self.data[i + 2] = color.b;
        }
    }

    /// Pixel colors in row-major order.
    pub fn iter_rgb(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|px| Rgb::new(px[0], px[1], px[2]))
    }

    /// Build a same-sized buffer by mapping every pixel's color, alpha copied through.
    pub fn map_pixels(&self, mut f: impl FnMut(Rgb) -> Rgb) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(CHANNELS) {
            let out = f(Rgb::new(px[0], px[1], px[2]));
            data.extend_from_slice(&[out.r, out.g, out.b, px[3]]);
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let err = RasterBuffer::from_rgba(2, 2, vec![0; 15]).expect_err("short buffer");
        assert_eq!(
            err,
            RasterError::SizeMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15,
            }
        );
    }

    #[test]
    fn oversized_dimensions_are_an_error() {
        let too_large = RasterError::TooLarge {
            width: u32::MAX,
            height: u32::MAX,
        };
        assert_eq!(
            RasterBuffer::from_rgba(u32::MAX, u32::MAX, Vec::new()),
            Err(too_large.clone())
        );
        assert_eq!(
            RasterBuffer::filled(u32::MAX, u32::MAX, Rgb::WHITE),
            Err(too_large)
        );
    }

    #[test]
    fn pixel_reads_ignore_alpha() {
        let buf = RasterBuffer::from_rgba(2, 1, vec![1, 2, 3, 0, 4, 5, 6, 255]).expect("buffer");
        assert_eq!(buf.pixel(0, 0), Some(Rgb::new(1, 2, 3)));
        assert_eq!(buf.pixel(1, 0), Some(Rgb::new(4, 5, 6)));
        assert_eq!(buf.pixel(2, 0), None);
        assert_eq!(buf.pixel(0, 1), None);
    }

    #[test]
    fn put_keeps_alpha_and_ignores_out_of_range() {
        let mut buf = RasterBuffer::from_rgba(1, 1, vec![0, 0, 0, 128]).expect("buffer");
        buf.put(0, 0, Rgb::new(9, 8, 7));
        buf.put(5, 5, Rgb::WHITE);
        assert_eq!(buf.as_rgba(), &[9, 8, 7, 128]);
    }

    #[test]
    fn map_pixels_preserves_shape() {
        let buf = RasterBuffer::filled(3, 2, Rgb::new(10, 10, 10)).expect("buffer");
        let out = buf.map_pixels(|c| c.scale(2.0));
        assert_eq!((out.width(), out.height()), (3, 2));
        assert!(out.iter_rgb().all(|c| c == Rgb::new(20, 20, 20)));
    }
}
