use image::DynamicImage;

use crate::error::PipelineResult;

const METERS_PER_INCH: f64 = 0.0254;

/// Encode as an 8-bit PNG carrying `dpi` in its `pHYs` chunk.
///
/// Gray images stay single-channel; everything else is written as RGB.
pub fn encode_png(img: &DynamicImage, dpi: u32) -> PipelineResult<Vec<u8>> {
    let (color, pixels) = match img {
        DynamicImage::ImageLuma8(gray) => (png::ColorType::Grayscale, gray.as_raw().clone()),
        other => (png::ColorType::Rgb, other.to_rgb8().into_raw()),
    };

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, img.width(), img.height());
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        if dpi > 0 {
            let ppm = (f64::from(dpi) / METERS_PER_INCH).round() as u32;
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
        writer.finish()?;
    }
    Ok(buf)
}
