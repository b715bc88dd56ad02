use image::{imageops, DynamicImage, RgbaImage};

use crate::settings::OcclusionSettings;

/// Mean luma (0–255) of a small downsampled copy of `frame`.
///
/// Returns `None` for an empty frame.
pub fn mean_luma(frame: &RgbaImage, settings: &OcclusionSettings) -> Option<f32> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }

    let width = settings.sample_width.clamp(1, frame.width());
    let height = settings.sample_height.clamp(1, frame.height());
    let sample = imageops::thumbnail(frame, width, height);
    let luma = DynamicImage::ImageRgba8(sample).into_luma8();

    let pixels = luma.as_raw();
    if pixels.is_empty() {
        return None;
    }
    let total: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    Some(total as f32 / pixels.len() as f32)
}

pub fn is_dark(brightness: f32, settings: &OcclusionSettings) -> bool {
    brightness < settings.darkness_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn uniform_frames_report_their_gray_level() {
        let settings = OcclusionSettings::default();
        let black = RgbaImage::from_pixel(640, 480, Rgba([0, 0, 0, 255]));
        let white = RgbaImage::from_pixel(640, 480, Rgba([255, 255, 255, 255]));

        assert_eq!(mean_luma(&black, &settings), Some(0.0));
        assert!(mean_luma(&white, &settings).unwrap() > 250.0);
        assert!(is_dark(0.0, &settings));
        assert!(!is_dark(200.0, &settings));
    }

    #[test]
    fn tiny_and_empty_frames() {
        let settings = OcclusionSettings::default();
        let dot = RgbaImage::from_pixel(1, 1, Rgba([90, 90, 90, 255]));
        assert_eq!(mean_luma(&dot, &settings), Some(90.0));
        assert_eq!(mean_luma(&RgbaImage::new(0, 0), &settings), None);
    }
}
