use std::io::Cursor;
use std::thread;
use std::time::Duration;

use image::{
    imageops, imageops::FilterType, DynamicImage, GrayImage, ImageFormat, Luma, RgbaImage,
};
use reqwest::blocking::{multipart, Client};
use tracing::debug;

use crate::errors::{CutoutError, Result};
use crate::traits::BackgroundRemover;

/// Background removal through the remove.bg HTTP API.
///
/// The image is uploaded as PNG. The returned cutout is resized to the input
/// when the API scaled it down, and its alpha channel doubles as the mask.
pub struct RemoveBgClient {
    client: Client,
    endpoint: String,
    api_key: String,
    request_delay: Duration,
}

impl RemoveBgClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            request_delay: Duration::ZERO,
        })
    }

    /// Pause after each successful request to stay under the API rate limit.
    pub const fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| CutoutError::ImageProcessing {
                path: "in-memory".to_string(),
                operation: "encode upload".to_string(),
                source: Box::new(e),
            })?;
        Ok(buffer.into_inner())
    }

    fn request_cutout(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let part = multipart::Part::bytes(Self::encode_png(img)?)
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto")
            .text("format", "png");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|e| e.to_string());
            return Err(CutoutError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes()?;
        debug!(bytes = bytes.len(), "cutout received");
        let cutout = image::load_from_memory_with_format(&bytes, ImageFormat::Png).map_err(|e| {
            CutoutError::ImageProcessing {
                path: self.endpoint.clone(),
                operation: "decode API response".to_string(),
                source: Box::new(e),
            }
        })?;

        if !self.request_delay.is_zero() {
            thread::sleep(self.request_delay);
        }
        Ok(DynamicImage::ImageRgba8(fit_to(
            cutout.to_rgba8(),
            img.width(),
            img.height(),
        )))
    }
}

/// The API downscales large uploads; bring the cutout back to the source size.
fn fit_to(cutout: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if cutout.dimensions() == (width, height) {
        return cutout;
    }
    debug!(
        returned = ?cutout.dimensions(),
        expected = ?(width, height),
        "resizing cutout to source dimensions"
    );
    imageops::resize(&cutout, width, height, FilterType::Lanczos3)
}

impl BackgroundRemover for RemoveBgClient {
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage> {
        let cutout = self.request_cutout(img)?.to_rgba8();
        Ok(GrayImage::from_fn(cutout.width(), cutout.height(), |x, y| {
            Luma([cutout.get_pixel(x, y)[3]])
        }))
    }

    fn name(&self) -> &'static str {
        "remove-bg"
    }

    fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        self.request_cutout(img)
    }
}
