// Silhouette extraction: turns a decoded image into contour points.
// Visual expectation: the points trace the outline of the main subject, not
// its internal texture, so the particles draw a clean silhouette.
use image::RgbaImage;

use crate::config::WORLD_SPAN;
use crate::error::{Error, Result};
use crate::types::{BinaryMask, BoundaryPoint, LumaImage, Vec3};

/// Half-width of the box blur window (5×5).
pub const BLUR_RADIUS: usize = 2;
/// Border band, as a fraction of min(width, height), that never yields contour points.
pub const MARGIN_FRACTION: f32 = 0.05;
/// Threshold used when no split separates the histogram (e.g. a uniform image).
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Everything the edge extractor produces for one image.
#[derive(Clone, Debug)]
pub struct EdgeExtraction {
    pub points: Vec<BoundaryPoint>,
    pub mask: BinaryMask,
    pub width: usize,
    pub height: usize,
}

/// Run the whole extractor: luma → blur → Otsu → binarize → Sobel → contour.
pub fn extract_edges(img: &RgbaImage) -> EdgeExtraction {
    let gray = luminance(img);
    let blurred = box_blur(&gray, BLUR_RADIUS);
    let threshold = otsu_threshold(&histogram(&blurred));
    let mask = binarize(&blurred, threshold);
    let (gx, gy) = sobel(&blurred);
    let points = contour_points(&mask, &gx, &gy);

    EdgeExtraction { points, width: mask.width, height: mask.height, mask }
}

/// Weighted RGB sum (0.299 R + 0.587 G + 0.114 B); alpha is ignored.
/// Summed in integer per-mille so a pure grey maps exactly to its value.
pub fn luminance(img: &RgbaImage) -> LumaImage {
    let (w, h) = img.dimensions();
    let mut out = LumaImage::new(w as usize, h as usize);
    for (dst, px) in out.values.iter_mut().zip(img.pixels()) {
        let weighted = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
        *dst = weighted as f32 / 1000.0;
    }
    out
}

/// Box blur averaging each (2r+1)×(2r+1) window over the pixels that exist:
/// samples past the border add nothing to the sum and nothing to the count.
///
/// Separable: a horizontal pass into `tmp`, then a vertical pass. Because the
/// in-bounds count factors into (columns × rows) the result equals the 2D average.
/// Sums are kept in f64 so a uniform region stays bit-exactly uniform.
pub fn box_blur(src: &LumaImage, radius: usize) -> LumaImage {
    let w = src.width;
    let h = src.height;
    let mut tmp = vec![0.0f64; w * h];
    let mut dst = LumaImage::new(w, h);
    if w == 0 || h == 0 {
        return dst;
    }

    /* ---- Pass 1: horizontal ---- */
    for y in 0..h {
        let row = y * w;
        for x in 0..w {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(w - 1);
            let sum: f64 = src.values[row + x0..=row + x1].iter().map(|&v| v as f64).sum();
            tmp[row + x] = sum / (x1 - x0 + 1) as f64;
        }
    }

    /* ---- Pass 2: vertical ---- */
    for x in 0..w {
        for y in 0..h {
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius).min(h - 1);
            let mut sum = 0.0f64;
            for yy in y0..=y1 {
                sum += tmp[yy * w + x];
            }
            dst.values[y * w + x] = (sum / (y1 - y0 + 1) as f64) as f32;
        }
    }

    dst
}

/// 256-bin histogram; bin = min(255, floor(value)).
pub fn histogram(img: &LumaImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in &img.values {
        let bin = (v.max(0.0).floor() as usize).min(255);
        hist[bin] += 1;
    }
    hist
}

/// Otsu's method: the split t maximizing wB·wF·(mB − mF)², scanning t upward.
/// Only a strictly larger variance replaces the current best, so ties keep
/// the first split found.
pub fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    let sum_all: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();

    let mut sum_b = 0.0f64;
    let mut w_b = 0.0f64;
    let mut max_variance = 0.0f64;
    let mut threshold = DEFAULT_THRESHOLD;

    for (t, &count) in hist.iter().enumerate() {
        w_b += count as f64;
        if w_b == 0.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f == 0.0 {
            break;
        }
        sum_b += t as f64 * count as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_all - sum_b) / w_f;
        let variance = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if variance > max_variance {
            max_variance = variance;
            threshold = t as u8;
        }
    }

    threshold
}

/// Foreground iff value > threshold.
pub fn binarize(img: &LumaImage, threshold: u8) -> BinaryMask {
    let t = threshold as f32;
    BinaryMask {
        width: img.width,
        height: img.height,
        bits: img.values.iter().map(|&v| u8::from(v > t)).collect(),
    }
}

/// 3×3 Sobel gradients. Only interior pixels are evaluated; the one-pixel
/// border keeps a zero gradient.
pub fn sobel(img: &LumaImage) -> (LumaImage, LumaImage) {
    let w = img.width;
    let h = img.height;
    let mut gx = LumaImage::new(w, h);
    let mut gy = LumaImage::new(w, h);
    if w < 3 || h < 3 {
        return (gx, gy);
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = |dx: isize, dy: isize| img.get((x as isize + dx) as usize, (y as isize + dy) as usize);

            let sx = -p(-1, -1) + p(1, -1) - 2.0 * p(-1, 0) + 2.0 * p(1, 0) - p(-1, 1) + p(1, 1);
            let sy = -p(-1, -1) - 2.0 * p(0, -1) - p(1, -1) + p(-1, 1) + 2.0 * p(0, 1) + p(1, 1);

            gx.values[y * w + x] = sx;
            gy.values[y * w + x] = sy;
        }
    }
    (gx, gy)
}

/// Contour = interior pixels whose class differs from any 4-neighbour,
/// minus the margin band. Each is mapped to world units:
///   x = (px/w − 0.5) · 10 · aspect,  y = (0.5 − py/h) · 10,  z = 0
/// with angle = atan2(gx, −gy).
pub fn contour_points(mask: &BinaryMask, gx: &LumaImage, gy: &LumaImage) -> Vec<BoundaryPoint> {
    let w = mask.width;
    let h = mask.height;
    let mut out = Vec::new();
    if w < 3 || h < 3 {
        return out;
    }

    let wf = w as f32;
    let hf = h as f32;
    let aspect = wf / hf;
    let margin = wf.min(hf) * MARGIN_FRACTION;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (xf, yf) = (x as f32, y as f32);
            if xf < margin || xf > wf - margin || yf < margin || yf > hf - margin {
                continue;
            }

            let v = mask.get(x, y);
            let on_boundary = mask.get(x, y - 1) != v
                || mask.get(x, y + 1) != v
                || mask.get(x - 1, y) != v
                || mask.get(x + 1, y) != v;
            if !on_boundary {
                continue;
            }

            let position = Vec3::new(
                (xf / wf - 0.5) * WORLD_SPAN * aspect,
                (0.5 - yf / hf) * WORLD_SPAN,
                0.0,
            );
            let angle = gx.get(x, y).atan2(-gy.get(x, y));
            out.push(BoundaryPoint { position, angle });
        }
    }
    out
}

/// Nearest-neighbour downsample of a mask to `res × res` (aspect is not
/// preserved here; consumers address it with normalized uv).
pub fn downsample_mask(mask: &BinaryMask, res: usize) -> Result<Vec<u8>> {
    if mask.width == 0 || mask.height == 0 {
        return Err(Error::DimensionMismatch("downsample_mask: empty mask".into()));
    }
    let mut out = Vec::with_capacity(res * res);
    for j in 0..res {
        // Sample at texel centres
        let sy = (((j as f32 + 0.5) / res as f32) * mask.height as f32) as usize;
        let sy = sy.min(mask.height - 1);
        for i in 0..res {
            let sx = (((i as f32 + 0.5) / res as f32) * mask.width as f32) as usize;
            out.push(mask.get(sx.min(mask.width - 1), sy));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
    }

    #[test]
    fn luminance_uses_standard_weights() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 0, 0, 255]));
        let l = luminance(&img);
        assert!((l.values[0] - 29.9).abs() < 1e-4);
        assert_eq!(luminance(&solid(1, 1, 255)).values[0], 255.0);
    }

    #[test]
    fn blur_keeps_uniform_regions_exact() {
        let img = luminance(&solid(9, 7, 200));
        let blurred = box_blur(&img, BLUR_RADIUS);
        let first = blurred.values[0];
        assert!(blurred.values.iter().all(|&v| v == first));
    }

    #[test]
    fn blur_averages_only_in_bounds_samples() {
        // 5×1 row: [0, 0, 0, 0, 250]
        let mut img = LumaImage::new(5, 1);
        img.values[4] = 250.0;
        let b = box_blur(&img, 2);
        // x = 0 sees x ∈ [0, 2]: no bright sample
        assert_eq!(b.values[0], 0.0);
        // x = 2 sees all five
        assert!((b.values[2] - 50.0).abs() < 1e-4);
        // x = 4 sees x ∈ [2, 4]
        assert!((b.values[4] - 250.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn otsu_splits_bimodal_histogram_between_modes() {
        let mut hist = [0u32; 256];
        hist[20] = 50;
        hist[220] = 50;
        let t = otsu_threshold(&hist);
        // Every split between the modes has equal variance; the first one wins.
        assert_eq!(t, 20);
    }

    #[test]
    fn otsu_falls_back_for_single_bin() {
        let mut hist = [0u32; 256];
        hist[77] = 400;
        assert_eq!(otsu_threshold(&hist), DEFAULT_THRESHOLD);
    }

    #[test]
    fn otsu_is_deterministic_for_identical_input() {
        let mut img = RgbaImage::new(32, 24);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = ((x * 7 + y * 13) % 256) as u8;
            *px = Rgba([v, v / 2, 255 - v, 255]);
        }
        let a = otsu_threshold(&histogram(&box_blur(&luminance(&img), BLUR_RADIUS)));
        let b = otsu_threshold(&histogram(&box_blur(&luminance(&img), BLUR_RADIUS)));
        assert_eq!(a, b);
    }

    #[test]
    fn binarize_is_strictly_greater() {
        let img = LumaImage { width: 3, height: 1, values: vec![99.0, 100.0, 100.5] };
        assert_eq!(binarize(&img, 100).bits, vec![0, 0, 1]);
    }

    #[test]
    fn sobel_sees_vertical_edge_as_horizontal_gradient() {
        let mut img = LumaImage::new(3, 3);
        for y in 0..3 {
            img.values[y * 3 + 2] = 100.0;
        }
        let (gx, gy) = sobel(&img);
        assert_eq!(gx.get(1, 1), 400.0);
        assert_eq!(gy.get(1, 1), 0.0);
        assert_eq!(gx.get(0, 0), 0.0);
    }

    #[test]
    fn centered_disc_gives_ring_of_contour_points() {
        let mut img = solid(64, 64, 0);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let dx = x as f32 - 32.0;
            let dy = y as f32 - 32.0;
            if dx * dx + dy * dy < 15.0 * 15.0 {
                *px = Rgba([255, 255, 255, 255]);
            }
        }
        let out = extract_edges(&img);
        assert!(!out.points.is_empty());
        assert!(out.mask.foreground_count() > 0);
        for p in &out.points {
            let r = (p.position.x * p.position.x + p.position.y * p.position.y).sqrt();
            // radius 15 px of 64 ≈ 2.34 world units
            assert!(r > 1.8 && r < 2.9, "r = {r}");
            assert_eq!(p.position.z, 0.0);
        }
    }

    #[test]
    fn margin_band_suppresses_border_contours() {
        // Bright frame at the very edge of a dark 100×100 image.
        let mut img = solid(100, 100, 0);
        for (x, y, px) in img.enumerate_pixels_mut() {
            if x == 0 || y == 0 || x == 99 || y == 99 {
                *px = Rgba([255, 255, 255, 255]);
            }
        }
        let out = extract_edges(&img);
        // the blur spreads it two pixels inward; margin = 5 px swallows that
        assert!(out.points.is_empty());
    }

    #[test]
    fn world_mapping_is_aspect_corrected() {
        // 20×10 image, right half bright: boundary near the centre column
        let mut img = solid(20, 10, 0);
        for (x, _, px) in img.enumerate_pixels_mut() {
            if x >= 10 {
                *px = Rgba([255, 255, 255, 255]);
            }
        }
        let out = extract_edges(&img);
        assert!(!out.points.is_empty());
        for p in &out.points {
            assert!(p.position.x.abs() <= 10.0); // 10 · aspect(2) / 2
            assert!(p.position.y.abs() <= 5.0);
        }
    }

    #[test]
    fn downsample_preserves_halves() {
        let mask = BinaryMask { width: 4, height: 2, bits: vec![1, 1, 0, 0, 1, 1, 0, 0] };
        let small = downsample_mask(&mask, 2).unwrap();
        assert_eq!(small, vec![1, 0, 1, 0]);
    }
}
