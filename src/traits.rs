use crate::errors::{CutoutError, Result};
use crate::imageops_ai::mask;
use image::{DynamicImage, GrayImage};

/// Background removal capability.
///
/// Implementations only have to produce a foreground mask; applying it to the
/// image is shared.
pub trait BackgroundRemover: Send + Sync {
    /// Foreground mask with the dimensions of `img`: 255 keeps a pixel, 0 makes
    /// it fully transparent.
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns `img` as RGBA8 with the predicted mask multiplied into its alpha.
    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let mask = self.predict_mask(img)?;
        let rgba = img.to_rgba8();
        let cutout = mask::apply(&rgba, &mask).map_err(|e| CutoutError::ImageProcessing {
            path: "unknown".to_string(),
            operation: "apply mask".to_string(),
            source: e.into(),
        })?;
        Ok(DynamicImage::ImageRgba8(cutout))
    }
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for Box<R> {
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage> {
        (**self).predict_mask(img)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        (**self).remove_background(img)
    }
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for &R {
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage> {
        (**self).predict_mask(img)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        (**self).remove_background(img)
    }
}
