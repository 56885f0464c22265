//! Raster frame types: RGB camera frames and single-channel grayscale frames

/// Where a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// Read from a real frame source
    Camera,
    /// Synthesised while the camera is unavailable
    Placeholder,
}

// ============================================================================
// RGB Frame
// ============================================================================

/// Owned 8-bit RGB raster, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    origin: FrameOrigin,
}

/// Error for rasters whose buffer does not match their dimensions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("raster buffer has {actual} bytes, expected {expected} for {width}x{height}")]
pub struct RasterSizeError {
    pub width: usize,
    pub height: usize,
    pub expected: usize,
    pub actual: usize,
}

impl Frame {
    /// Wrap an RGB buffer read from a camera.
    pub fn from_rgb(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, RasterSizeError> {
        let expected = width * height * 3;
        if pixels.len() != expected {
            return Err(RasterSizeError {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            origin: FrameOrigin::Camera,
        })
    }

    /// Uniformly filled frame.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3], origin: FrameOrigin) -> Self {
        let pixels = rgb.iter().copied().cycle().take(width * height * 3).collect();
        Self {
            width,
            height,
            pixels,
            origin,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> FrameOrigin {
        self.origin
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == FrameOrigin::Placeholder
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Convert to grayscale with BT.601 luma weights.
    pub fn to_gray(&self) -> GrayFrame {
        let data = self
            .pixels
            .chunks_exact(3)
            .map(|px| {
                let luma = 299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
                // Weights sum to 1000 so the rounded quotient stays within u8.
                u8::try_from((luma + 500) / 1000).unwrap_or(u8::MAX)
            })
            .collect();
        GrayFrame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

// ============================================================================
// Grayscale Frame
// ============================================================================

/// Owned single-channel 8-bit raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RasterSizeError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(RasterSizeError {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Build from a buffer the caller already sized to `width * height`.
    pub(crate) fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn same_dimensions(&self, other: &GrayFrame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Pixel at `(x, y)`; caller guarantees bounds.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Fill an axis-aligned rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, value: u8) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for row in y.min(self.height)..y_end {
            let start = row * self.width;
            self.data[start + x.min(x_end)..start + x_end].fill(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb_rejects_short_buffer() {
        let err = Frame::from_rgb(4, 4, vec![0; 10]).unwrap_err();
        assert_eq!(err.expected, 48);
        assert_eq!(err.actual, 10);
    }

    #[test]
    fn test_to_gray_luma_weights() {
        let white = Frame::filled(2, 2, [255, 255, 255], FrameOrigin::Camera).to_gray();
        assert!(white.data().iter().all(|&v| v == 255));

        let red = Frame::filled(1, 1, [255, 0, 0], FrameOrigin::Camera).to_gray();
        assert_eq!(red.data(), &[76]);

        let green = Frame::filled(1, 1, [0, 255, 0], FrameOrigin::Camera).to_gray();
        assert_eq!(green.data(), &[150]);
    }

    #[test]
    fn test_fill_rect_clips_to_bounds() {
        let mut gray = GrayFrame::filled(4, 4, 0);
        gray.fill_rect(2, 2, 10, 10, 9);
        assert_eq!(gray.get(3, 3), 9);
        assert_eq!(gray.get(1, 1), 0);
        assert_eq!(gray.data().iter().filter(|&&v| v == 9).count(), 4);
    }
}
