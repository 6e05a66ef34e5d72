use anyhow::{anyhow, ensure, Result};
use image::{GenericImageView, ImageBuffer, Luma, Pixel, Primitive, Rgba};
use num_traits::AsPrimitive;

use crate::imageops_ai::get_max_value;

/// Multiplies the alpha channel of `image` by `mask`.
///
/// Colour channels are left untouched; a pixel that was already transparent
/// stays transparent whatever the mask says.
pub fn apply<I, M, SI, SM>(image: &I, mask: &M) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>>
where
    I: GenericImageView<Pixel = Rgba<SI>>,
    M: GenericImageView<Pixel = Luma<SM>>,
    Rgba<SI>: Pixel<Subpixel = SI>,
    Luma<SM>: Pixel<Subpixel = SM>,
    SI: Primitive + AsPrimitive<f32> + 'static,
    SM: Primitive + AsPrimitive<f32> + 'static,
    f32: AsPrimitive<SI>,
{
    ensure!(
        image.dimensions() == mask.dimensions(),
        "Image and mask dimensions do not match: image {:?}, mask {:?}",
        image.dimensions(),
        mask.dimensions()
    );

    let sm_max: f32 = get_max_value::<SM>().as_();

    let processed_pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|((_, _, image_pixel), (_, _, mask_pixel))| {
            let Rgba([red, green, blue, alpha]) = image_pixel;
            let Luma([coverage]) = mask_pixel;
            let coverage: f32 = coverage.as_();
            let alpha: f32 = alpha.as_();
            let weight = (coverage / sm_max).clamp(0.0, 1.0);
            let alpha: SI = (alpha * weight).round().as_();
            [red, green, blue, alpha]
        })
        .collect::<Vec<SI>>();

    ImageBuffer::from_raw(image.width(), image.height(), processed_pixels)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from processed pixels"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbaImage};

    #[test]
    fn test_mask_scales_alpha() -> Result<()> {
        let image = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        let mask = GrayImage::from_raw(2, 1, vec![0, 255]).ok_or_else(|| anyhow!("mask"))?;

        let result = apply(&image, &mask)?;
        assert_eq!(result.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([10, 20, 30, 255]));
        Ok(())
    }

    #[test]
    fn test_existing_transparency_is_kept() -> Result<()> {
        let image = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 0]));
        let mask = GrayImage::from_pixel(1, 1, Luma([255]));

        let result = apply(&image, &mask)?;
        assert_eq!(result.get_pixel(0, 0)[3], 0);
        Ok(())
    }

    #[test]
    fn test_half_mask_halves_alpha() -> Result<()> {
        let image = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 200]));
        let mask = GrayImage::from_pixel(1, 1, Luma([128]));

        let result = apply(&image, &mask)?;
        assert_eq!(result.get_pixel(0, 0)[3], 100);
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() {
        let image = RgbaImage::new(2, 2);
        let mask = GrayImage::new(3, 2);
        assert!(apply(&image, &mask).is_err());
    }
}
