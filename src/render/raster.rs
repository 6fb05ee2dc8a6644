use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use ndarray::{Array2, ArrayView2};

use crate::color::LabelColors;
use crate::config::PlaneTransform;

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Apply `t` to a plane: `quarter_turns` counter-clockwise rotations, then a
/// vertical flip when the origin is drawn at the bottom.
pub fn orient(plane: ArrayView2<'_, f32>, t: PlaneTransform) -> Array2<f32> {
    let rotated = rot90(plane, t.quarter_turns);
    if t.origin_lower {
        let rows = rotated.nrows();
        Array2::from_shape_fn(rotated.dim(), |(i, j)| rotated[[rows - 1 - i, j]])
    } else {
        rotated
    }
}

/// Counter-clockwise rotation by `k` quarter turns.
fn rot90(m: ArrayView2<'_, f32>, k: u8) -> Array2<f32> {
    let (r, c) = m.dim();
    match k % 4 {
        0 => m.to_owned(),
        1 => Array2::from_shape_fn((c, r), |(i, j)| m[[j, c - 1 - i]]),
        2 => Array2::from_shape_fn((r, c), |(i, j)| m[[r - 1 - i, c - 1 - j]]),
        _ => Array2::from_shape_fn((c, r), |(i, j)| m[[r - 1 - j, i]]),
    }
}

// ---------------------------------------------------------------------------
// Pixel mapping
// ---------------------------------------------------------------------------

/// Linear gray scale between the plane's own min and max. Flat planes and
/// non-finite voxels render black.
pub fn to_gray(plane: &Array2<f32>) -> GrayImage {
    let (lo, hi) = plane
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    let (rows, cols) = plane.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = plane[[y as usize, x as usize]];
        if !v.is_finite() || span <= 0.0 {
            return Luma([0]);
        }
        Luma([(((v - lo) / span) * 255.0).round() as u8])
    })
}

/// One colour per label value.
pub fn to_label_colors(plane: &Array2<f32>, colors: &LabelColors) -> RgbImage {
    let (rows, cols) = plane.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        colors.color_for(plane[[y as usize, x as usize]])
    })
}

// ---------------------------------------------------------------------------
// Canvas fitting
// ---------------------------------------------------------------------------

/// Scale `img` (nearest neighbour, aspect preserved) into a black
/// `width × height` canvas, centred.
pub fn letterbox(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let mut canvas = match img {
        DynamicImage::ImageLuma8(_) => DynamicImage::new_luma8(width, height),
        _ => DynamicImage::new_rgb8(width, height),
    };
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 || width == 0 || height == 0 {
        return canvas;
    }

    let scale = (f64::from(width) / f64::from(w)).min(f64::from(height) / f64::from(h));
    let nw = ((f64::from(w) * scale).round() as u32).clamp(1, width);
    let nh = ((f64::from(h) * scale).round() as u32).clamp(1, height);
    let resized = img.resize_exact(nw, nh, FilterType::Nearest);

    let x = i64::from((width - nw) / 2);
    let y = i64::from((height - nh) / 2);
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}

/// Place equally sized panels side by side.
pub fn hconcat(panels: &[DynamicImage]) -> DynamicImage {
    let height = panels.iter().map(DynamicImage::height).max().unwrap_or(0);
    let width = panels.iter().map(DynamicImage::width).sum();
    let mut canvas = DynamicImage::new_luma8(width, height);
    let mut x = 0i64;
    for panel in panels {
        imageops::overlay(&mut canvas, panel, x, 0);
        x += i64::from(panel.width());
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn quarter_turns_match_numpy_rot90() {
        let m = array![[1.0f32, 2.0], [3.0, 4.0]];
        assert_eq!(rot90(m.view(), 1), array![[2.0, 4.0], [1.0, 3.0]]);
        assert_eq!(rot90(m.view(), 2), array![[4.0, 3.0], [2.0, 1.0]]);
        assert_eq!(rot90(m.view(), 3), array![[3.0, 1.0], [4.0, 2.0]]);
        assert_eq!(rot90(m.view(), 4), m);
    }

    #[test]
    fn rotation_swaps_shape() {
        let m = Array2::<f32>::zeros((2, 5));
        assert_eq!(rot90(m.view(), 1).dim(), (5, 2));
        assert_eq!(rot90(m.view(), 3).dim(), (5, 2));
    }

    #[test]
    fn origin_lower_flips_rows() {
        let m = array![[1.0f32, 2.0], [3.0, 4.0]];
        let out = orient(m.view(), PlaneTransform::new(0, true));
        assert_eq!(out, array![[3.0, 4.0], [1.0, 2.0]]);
    }

    #[test]
    fn gray_scale_spans_full_range() {
        let m = array![[0.0f32, 50.0], [100.0, f32::NAN]];
        let img = to_gray(&m);
        assert_eq!(img.get_pixel(0, 0), &Luma([0]));
        assert_eq!(img.get_pixel(0, 1), &Luma([255]));
        assert_eq!(img.get_pixel(1, 0), &Luma([128]));
        assert_eq!(img.get_pixel(1, 1), &Luma([0]));
    }

    #[test]
    fn flat_plane_is_black() {
        let img = to_gray(&Array2::from_elem((3, 3), 7.0f32));
        assert!(img.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn letterbox_fills_requested_size() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 5, Luma([200])));
        let out = letterbox(&img, 64, 64);
        assert_eq!((out.width(), out.height()), (64, 64));
        let gray = out.to_luma8();
        // scaled to 64x32, centred vertically
        assert_eq!(gray.get_pixel(32, 0), &Luma([0]));
        assert_eq!(gray.get_pixel(32, 32), &Luma([200]));
    }

    #[test]
    fn hconcat_sums_widths() {
        let panel = DynamicImage::new_luma8(8, 4);
        let out = hconcat(&[panel.clone(), panel.clone(), panel]);
        assert_eq!((out.width(), out.height()), (24, 4));
    }
}
