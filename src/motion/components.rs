//! External connected-component extraction on binary masks

use serde::{Deserialize, Serialize};

use super::morphology::BinaryMask;

/// One 8-connected foreground blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Bounding box left edge (pixels)
    pub x: usize,
    /// Bounding box top edge (pixels)
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// Foreground pixel count of the blob
    pub area: usize,
}

/// Label every 8-connected foreground blob in `mask`.
///
/// Uses an explicit stack rather than recursion so large blobs cannot
/// overflow the thread stack. Regions are returned in raster order of their
/// top-left-most pixel.
pub fn find_regions(mask: &BinaryMask) -> Vec<Region> {
    let (w, h) = (mask.width(), mask.height());
    let mut visited = vec![false; w * h];
    let mut regions = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for sy in 0..h {
        for sx in 0..w {
            if visited[sy * w + sx] || !mask.get(sx, sy) {
                continue;
            }

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (sx, sy, sx, sy);
            let mut area = 0usize;
            visited[sy * w + sx] = true;
            stack.push((sx, sy));

            while let Some((x, y)) = stack.pop() {
                area += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);

                for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        let idx = ny * w + nx;
                        if !visited[idx] && mask.get(nx, ny) {
                            visited[idx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            regions.push(Region {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
                area,
            });
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> BinaryMask {
        let mut mask = BinaryMask::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                mask.set(x, y, c == '#');
            }
        }
        mask
    }

    #[test]
    fn test_empty_mask_has_no_regions() {
        assert!(find_regions(&BinaryMask::new(8, 8)).is_empty());
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mask = mask_from(&["#...", ".#..", "..#.", "...."]);
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3);
        assert_eq!((regions[0].width, regions[0].height), (3, 3));
    }

    #[test]
    fn test_separate_blobs() {
        let mask = mask_from(&["##..#", "##..#", ".....", "..###"]);
        let regions = find_regions(&mask);
        assert_eq!(regions.len(), 3);
        let areas: Vec<usize> = regions.iter().map(|r| r.area).collect();
        assert_eq!(areas, vec![4, 2, 3]);
        assert_eq!((regions[2].x, regions[2].y), (2, 3));
    }
}
