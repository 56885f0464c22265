//! Differencing, binarization and dilation on binary masks

use crate::types::GrayFrame;

/// Foreground/background mask with the same geometry as its source frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl BinaryMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.bits[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.bits[y * self.width + x] = value;
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }
}

/// Absolute difference followed by a strict `> cutoff` binarization.
///
/// Both frames must have identical dimensions; the caller checks.
pub fn difference_mask(previous: &GrayFrame, current: &GrayFrame, cutoff: u8) -> BinaryMask {
    let bits = previous
        .data()
        .iter()
        .zip(current.data())
        .map(|(&a, &b)| a.abs_diff(b) > cutoff)
        .collect();
    BinaryMask {
        width: previous.width(),
        height: previous.height(),
        bits,
    }
}

/// Dilate with a 3×3 square structuring element, `iterations` times.
///
/// The square element is separable, so each iteration is a horizontal then
/// a vertical 3-tap max. Pixels outside the frame never contribute.
pub fn dilate(mask: &BinaryMask, iterations: usize) -> BinaryMask {
    let (w, h) = (mask.width, mask.height);
    let mut current = mask.clone();
    for _ in 0..iterations {
        let mut horizontal = BinaryMask::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let left = x > 0 && current.get(x - 1, y);
                let right = x + 1 < w && current.get(x + 1, y);
                horizontal.set(x, y, left || current.get(x, y) || right);
            }
        }
        let mut vertical = BinaryMask::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let up = y > 0 && horizontal.get(x, y - 1);
                let down = y + 1 < h && horizontal.get(x, y + 1);
                vertical.set(x, y, up || horizontal.get(x, y) || down);
            }
        }
        current = vertical;
    }
    current
}

/// Fill every background pocket that is not 4-connected to the frame border.
///
/// Foreground is 8-connected, so background is traced with 4-connectivity;
/// a one-pixel diagonal outline still closes its interior. After filling,
/// each component covers everything inside its outer boundary.
pub fn fill_holes(mask: &BinaryMask) -> BinaryMask {
    let (w, h) = (mask.width, mask.height);
    let mut outside = vec![false; w * h];
    if w == 0 || h == 0 {
        return mask.clone();
    }

    let mut stack: Vec<(usize, usize)> = Vec::new();
    for x in 0..w {
        stack.push((x, 0));
        stack.push((x, h - 1));
    }
    for y in 0..h {
        stack.push((0, y));
        stack.push((w - 1, y));
    }

    while let Some((x, y)) = stack.pop() {
        let idx = y * w + x;
        if outside[idx] || mask.bits[idx] {
            continue;
        }
        outside[idx] = true;
        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < w {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < h {
            stack.push((x, y + 1));
        }
    }

    BinaryMask {
        width: w,
        height: h,
        bits: outside.into_iter().map(|o| !o).collect(),
    }
}
