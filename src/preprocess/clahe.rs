//! Contrast-limited adaptive histogram equalization.
//!
//! Per-tile histograms are clipped at `clip_limit * tile_area / 256`, the
//! excess is spread evenly over all bins, and each pixel is mapped through a
//! bilinear blend of its four nearest tile lookup tables.

use image::{GrayImage, Luma};

/// CLAHE over a `grid_x` by `grid_y` tile grid
pub fn clahe(gray: &GrayImage, clip_limit: f32, grid_x: u32, grid_y: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let grid_x = grid_x.clamp(1, width);
    let grid_y = grid_y.clamp(1, height);
    let tile_w = width.div_ceil(grid_x);
    let tile_h = height.div_ceil(grid_y);

    let mut luts = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let x0 = (tx * tile_w).min(width);
            let y0 = (ty * tile_h).min(height);
            let x1 = ((tx + 1) * tile_w).min(width);
            let y1 = ((ty + 1) * tile_h).min(height);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * grid_x + tx) as usize];
    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y)[0] as usize;
        let (tx1, tx2, xa) = neighbours(x, tile_w, grid_x);
        let (ty1, ty2, ya) = neighbours(y, tile_h, grid_y);
        let top = lut_at(tx1, ty1)[value] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[value] as f32 * xa;
        let bottom = lut_at(tx1, ty2)[value] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[value] as f32 * xa;
        Luma([(top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8])
    })
}

/// Tiles to blend for coordinate `pos` and the weight of the second one
fn neighbours(pos: u32, tile: u32, grid: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    let first = f.floor();
    let weight = f - first;
    let lo = first.max(0.0) as u32;
    let hi = ((first + 1.0).max(0.0) as u32).min(grid - 1);
    (lo.min(grid - 1), hi, weight)
}

fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let batch = excess / 256;
        let mut residual = excess % 256;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1) as usize;
            for bin in hist.iter_mut().step_by(step) {
                if residual == 0 {
                    break;
                }
                *bin += 1;
                residual -= 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (bin, slot) in hist.iter().zip(lut.iter_mut()) {
        cumulative += bin;
        *slot = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_dimensions() {
        let gray = GrayImage::from_fn(37, 23, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let out = clahe(&gray, 2.0, 8, 8);
        assert_eq!(out.dimensions(), (37, 23));
    }

    #[test]
    fn test_stretches_low_contrast() {
        // Values squeezed into [100, 120] spread out after equalization
        let gray = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 21) as u8]));
        let out = clahe(&gray, 2.0, 8, 8);
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 60, "range {min}..{max}");
    }

    #[test]
    fn test_clip_limits_flat_tile_amplification() {
        // A constant image must stay constant (every LUT maps it identically)
        let gray = GrayImage::from_pixel(32, 32, Luma([128]));
        let out = clahe(&gray, 2.0, 8, 8);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_neighbours_clamp_at_edges() {
        assert_eq!(neighbours(0, 10, 4).0, 0);
        let (lo, hi, _) = neighbours(39, 10, 4);
        assert_eq!((lo, hi), (3, 3));
    }
}
