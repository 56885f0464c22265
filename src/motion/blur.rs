//! Separable Gaussian smoothing
//!
//! Sensor noise produces single-pixel flicker between consecutive frames;
//! a wide Gaussian removes it before differencing. Rows are processed in
//! parallel with rayon for both passes.

use rayon::prelude::*;

use crate::types::GrayFrame;

/// Sigma used for a kernel of `size` taps when none is given explicitly.
pub fn default_sigma(size: usize) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian kernel. Even sizes are widened to the next odd size.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let size = if size % 2 == 0 { size + 1 } else { size.max(1) };
    let sigma = default_sigma(size).max(f32::EPSILON);
    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Reflect-101 border: `dcb|abcd|cba`, repeated for radii wider than the image.
pub(crate) fn reflect101(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * (n - 1);
    let mut m = i.rem_euclid(period);
    if m >= n {
        m = period - m;
    }
    m as usize
}

/// Smooth a grayscale frame with a `kernel_size × kernel_size` Gaussian.
pub fn gaussian_blur(src: &GrayFrame, kernel_size: usize) -> GrayFrame {
    let (width, height) = (src.width(), src.height());
    if width == 0 || height == 0 || kernel_size <= 1 {
        return src.clone();
    }

    let kernel = gaussian_kernel(kernel_size);
    let radius = (kernel.len() / 2) as isize;
    let data = src.data();

    let mut horizontal = vec![0f32; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &data[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = reflect101(x as isize + k as isize - radius, width);
                    acc += weight * f32::from(src_row[sx]);
                }
                *out = acc;
            }
        });

    let mut smoothed = vec![0u8; width * height];
    smoothed
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = reflect101(y as isize + k as isize - radius, height);
                    acc += weight * horizontal[sy * width + x];
                }
                *out = acc.round().clamp(0.0, 255.0) as u8;
            }
        });

    GrayFrame::from_raw(width, height, smoothed)
}
