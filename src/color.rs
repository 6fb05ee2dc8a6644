use std::collections::BTreeMap;

use image::Rgb;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::catalog::LabelCatalog;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ])
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Label colours: segmentation value → Rgb
// ---------------------------------------------------------------------------

/// Maps every catalog label to a distinct colour; background stays black.
#[derive(Debug, Clone)]
pub struct LabelColors {
    mapping: BTreeMap<i64, Rgb<u8>>,
    unknown_color: Rgb<u8>,
}

impl LabelColors {
    pub fn new(catalog: &LabelCatalog) -> Self {
        let palette = generate_palette(catalog.len());
        let mapping = catalog.indices().zip(palette).collect();
        LabelColors {
            mapping,
            unknown_color: Rgb([128, 128, 128]),
        }
    }

    /// Colour for a raw voxel value (truncated to its label index).
    pub fn color_for(&self, value: f32) -> Rgb<u8> {
        let label = value as i64;
        if label == 0 {
            return Rgb([0, 0, 0]);
        }
        self.mapping
            .get(&label)
            .copied()
            .unwrap_or(self.unknown_color)
    }
}
