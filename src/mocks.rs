use crate::errors::{CutoutError, Result};
use crate::reporter::{BatchEvent, Reporter};
use crate::traits::BackgroundRemover;
use image::{DynamicImage, GrayImage, Luma};
use parking_lot::Mutex;

/// Keeps every pixel as foreground.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockRemover;

impl BackgroundRemover for MockRemover {
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage> {
        Ok(GrayImage::from_pixel(img.width(), img.height(), Luma([255])))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Fails on every image.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRemover;

impl BackgroundRemover for FailingRemover {
    fn predict_mask(&self, _img: &DynamicImage) -> Result<GrayImage> {
        Err(CutoutError::Model {
            operation: "mock inference".to_string(),
            source: "mock failure".into(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Records the rendered lines of every event.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl Reporter for RecordingReporter {
    fn on_event(&self, event: BatchEvent<'_>) {
        self.lines.lock().extend(event.lines());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_mock_remover_keeps_every_pixel() -> Result<()> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 5, Rgb([255, 0, 0])));

        let result = MockRemover.remove_background(&img)?.to_rgba8();

        assert_eq!(result.dimensions(), (10, 5));
        assert!(result.pixels().all(|p| p.0 == [255, 0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_failing_remover() {
        let img = DynamicImage::new_rgb8(4, 4);
        assert!(FailingRemover.remove_background(&img).is_err());
    }
}
