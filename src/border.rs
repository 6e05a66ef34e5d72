use std::collections::VecDeque;

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use tracing::debug;

use crate::errors::Result;
use crate::imageops_ai::corners::{channel_distance, estimate_background};
use crate::traits::BackgroundRemover;

/// Model-free remover for subjects rendered on a flat backdrop.
///
/// The backdrop colour is estimated from the corners and flood filled from
/// every border pixel that matches it. Regions of the same colour enclosed by
/// the subject are not reachable from the border and stay opaque.
#[derive(Debug, Clone)]
pub struct BorderFloodRemover {
    tolerance: u8,
}

impl BorderFloodRemover {
    pub const fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    fn is_background(&self, pixel: &Rgba<u8>, background: &Rgba<u8>) -> bool {
        pixel[3] == 0 || channel_distance(pixel, background) <= self.tolerance
    }

    /// Alpha for a foreground pixel touching the filled region, ramping from
    /// transparent at the tolerance to opaque at twice the tolerance.
    fn edge_alpha(&self, pixel: &Rgba<u8>, background: &Rgba<u8>) -> u8 {
        let distance = f32::from(channel_distance(pixel, background));
        let tolerance = f32::from(self.tolerance);
        let ramp = ((distance - tolerance) / tolerance.max(1.0)).clamp(0.0, 1.0);
        (ramp * 255.0).round() as u8
    }

    fn flood_from_border(&self, image: &RgbaImage, background: &Rgba<u8>) -> Vec<bool> {
        let (width, height) = image.dimensions();
        let index = |x: u32, y: u32| y as usize * width as usize + x as usize;
        let mut filled = vec![false; width as usize * height as usize];
        let mut queue = VecDeque::new();

        let seed = |x: u32, y: u32, filled: &mut Vec<bool>, queue: &mut VecDeque<(u32, u32)>| {
            let i = index(x, y);
            if !filled[i] && self.is_background(image.get_pixel(x, y), background) {
                filled[i] = true;
                queue.push_back((x, y));
            }
        };

        for x in 0..width {
            seed(x, 0, &mut filled, &mut queue);
            seed(x, height - 1, &mut filled, &mut queue);
        }
        for y in 0..height {
            seed(0, y, &mut filled, &mut queue);
            seed(width - 1, y, &mut filled, &mut queue);
        }

        while let Some((x, y)) = queue.pop_front() {
            if x > 0 {
                seed(x - 1, y, &mut filled, &mut queue);
            }
            if x + 1 < width {
                seed(x + 1, y, &mut filled, &mut queue);
            }
            if y > 0 {
                seed(x, y - 1, &mut filled, &mut queue);
            }
            if y + 1 < height {
                seed(x, y + 1, &mut filled, &mut queue);
            }
        }

        filled
    }
}

impl Default for BorderFloodRemover {
    fn default() -> Self {
        Self::new(24)
    }
}

impl BackgroundRemover for BorderFloodRemover {
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage> {
        let image = img.to_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(GrayImage::new(width, height));
        }

        let background = estimate_background(&image, self.tolerance);
        let filled = self.flood_from_border(&image, &background);
        let is_filled = |x: u32, y: u32| filled[y as usize * width as usize + x as usize];

        debug!(
            ?background,
            filled = filled.iter().filter(|f| **f).count(),
            total = filled.len(),
            "border flood fill"
        );

        let mask = GrayImage::from_fn(width, height, |x, y| {
            if is_filled(x, y) {
                return Luma([0]);
            }
            let touches_background = (x > 0 && is_filled(x - 1, y))
                || (x + 1 < width && is_filled(x + 1, y))
                || (y > 0 && is_filled(x, y - 1))
                || (y + 1 < height && is_filled(x, y + 1));
            if touches_background {
                Luma([self.edge_alpha(image.get_pixel(x, y), &background)])
            } else {
                Luma([255])
            }
        });

        Ok(mask)
    }

    fn name(&self) -> &'static str {
        "border"
    }
}
