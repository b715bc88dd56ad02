use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
    DynamicImage, RgbaImage,
};

use crate::settings::EvidenceSettings;

/// Where evidence frames come from. Implemented by the camera pipeline.
pub trait FrameSource: Send + Sync {
    /// The most recent full-resolution frame.
    fn current_frame(&self) -> Result<RgbaImage>;
}

/// Latest-frame slot the capture pipeline writes into.
#[derive(Clone, Default)]
pub struct SharedFrame {
    inner: Arc<RwLock<Option<RgbaImage>>>,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, frame: RgbaImage) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(frame);
    }
}

impl FrameSource for SharedFrame {
    fn current_frame(&self) -> Result<RgbaImage> {
        let guard = self
            .inner
            .read()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        guard.clone().ok_or_else(|| anyhow!("no frame captured yet"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceImage {
    bytes: Vec<u8>,
}

impl EvidenceImage {
    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn from_jpeg(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

pub struct EvidenceCapturer {
    source: Arc<dyn FrameSource>,
    settings: EvidenceSettings,
}

impl EvidenceCapturer {
    pub fn new(source: Arc<dyn FrameSource>, settings: EvidenceSettings) -> Self {
        Self { source, settings }
    }

    /// Snapshot and encode the current frame. Called at admission time, before
    /// the alert goes out.
    pub fn capture(&self) -> Result<EvidenceImage> {
        let frame = self
            .source
            .current_frame()
            .context("frame source unavailable")?;
        encode_jpeg(&frame, &self.settings)
    }
}

/// Resize to the configured evidence size (0 keeps the frame's own dimension)
/// and encode as JPEG.
pub fn encode_jpeg(frame: &RgbaImage, settings: &EvidenceSettings) -> Result<EvidenceImage> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(anyhow!("cannot encode an empty frame"));
    }

    let width = if settings.width == 0 { frame.width() } else { settings.width };
    let height = if settings.height == 0 { frame.height() } else { settings.height };

    let sized = if (width, height) == frame.dimensions() {
        frame.clone()
    } else {
        imageops::resize(frame, width, height, FilterType::Triangle)
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(sized).into_rgb8();

    let mut bytes = Vec::new();
    {
        let mut encoder =
            JpegEncoder::new_with_quality(&mut bytes, settings.jpeg_quality.clamp(1, 100));
        encoder
            .encode_image(&rgb)
            .context("jpeg encoding failed")?;
    }

    Ok(EvidenceImage::from_jpeg(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgba};

    #[test]
    fn encodes_resized_jpeg() {
        let frame = RgbaImage::from_pixel(1280, 720, Rgba([30, 120, 200, 255]));
        let evidence = encode_jpeg(&frame, &EvidenceSettings::default()).unwrap();

        assert!(!evidence.is_empty());
        let decoded = image::load_from_memory_with_format(evidence.as_bytes(), ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(decoded.dimensions(), (640, 480));
    }

    #[test]
    fn zero_size_keeps_native_dimensions() {
        let frame = RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]));
        let settings = EvidenceSettings {
            width: 0,
            height: 0,
            jpeg_quality: 80,
        };
        let evidence = encode_jpeg(&frame, &settings).unwrap();
        let decoded = image::load_from_memory(evidence.as_bytes()).unwrap();
        assert_eq!(decoded.dimensions(), (320, 240));
    }

    #[test]
    fn capture_fails_before_first_frame() {
        let slot = SharedFrame::new();
        let capturer = EvidenceCapturer::new(Arc::new(slot.clone()), EvidenceSettings::default());
        assert!(capturer.capture().is_err());

        slot.update(RgbaImage::from_pixel(64, 48, Rgba([9, 9, 9, 255])));
        let evidence = capturer.capture().unwrap();
        assert!(evidence.to_base64().starts_with("/9j/"));
    }
}
