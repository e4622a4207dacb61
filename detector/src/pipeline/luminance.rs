use image::Rgba;
use proximity_common::error::DetectorError;

// ITU-R BT.601 luma weights.
const RED_WEIGHT: f64 = 0.299;
const GREEN_WEIGHT: f64 = 0.587;
const BLUE_WEIGHT: f64 = 0.114;

/// Perceptual brightness of one pixel, in [0, 255].
pub fn pixel_luminance(r: u8, g: u8, b: u8) -> f64 {
    RED_WEIGHT * r as f64 + GREEN_WEIGHT * g as f64 + BLUE_WEIGHT * b as f64
}

/// Mean perceptual brightness of a sequence of RGBA pixels. Alpha is ignored.
pub fn mean_luminance<I>(pixels: I) -> Result<f64, DetectorError>
where
    I: IntoIterator<Item = Rgba<u8>>,
{
    let (total, count) = pixels
        .into_iter()
        .fold((0.0, 0u64), |(total, count), Rgba([r, g, b, _])| {
            (total + pixel_luminance(r, g, b), count + 1)
        });
    if count == 0 {
        return Err(DetectorError::EmptyRegion);
    }
    Ok(total / count as f64)
}
