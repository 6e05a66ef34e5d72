use std::path::Path;

use crate::{
    errors::{CutoutError, Result},
    traits::BackgroundRemover,
};
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// ImageNet statistics used by U2-Net style salient object models.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Input size assumed when the model declares a dynamic spatial axis.
const FALLBACK_IMAGE_SIZE: u32 = 320;

/// Salient object segmentation model run through ONNX Runtime.
pub struct Model {
    pub image_size: u32,
    input_name: String,
    session: Mutex<Session>,
}

fn model_error(operation: impl Into<String>) -> impl FnOnce(ort::Error) -> CutoutError {
    let operation = operation.into();
    move |e| CutoutError::Model {
        operation,
        source: Box::new(e),
    }
}

impl Model {
    pub fn new(model_path: &Path, num_threads: usize, device_id: i32) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(model_error("initialise session builder"))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(model_error("register execution providers"))?
            .with_intra_threads(num_threads)
            .map_err(model_error("configure intra-op threads"))?
            .with_memory_pattern(true)
            .map_err(model_error("enable memory pattern"))?
            .commit_from_file(model_path)
            .map_err(model_error(format!(
                "load model file: {}",
                model_path.display()
            )))?;

        let input = session.inputs.first().ok_or_else(|| CutoutError::Model {
            operation: "read model inputs".to_string(),
            source: "model declares no inputs".into(),
        })?;
        let input_name = input.name.clone();
        let declared = input
            .input_type
            .tensor_shape()
            .ok_or_else(|| CutoutError::Model {
                operation: "read model input shape".to_string(),
                source: "model input is not a tensor".into(),
            })?
            .get(2)
            .copied()
            .unwrap_or(-1);
        let image_size = u32::try_from(declared)
            .ok()
            .filter(|size| *size > 0)
            .unwrap_or(FALLBACK_IMAGE_SIZE);

        // warm up
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data).map_err(model_error("create warm-up tensor"))?])
            .map_err(model_error("warm-up run"))?;

        info!(
            model = %model_path.display(),
            input = %input_name,
            image_size,
            "segmentation model loaded"
        );

        Ok(Self {
            image_size,
            input_name,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[0]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl BackgroundRemover for Model {
    fn predict_mask(&self, img: &DynamicImage) -> Result<GrayImage> {
        let rgb_img = img.to_rgb8();
        let tensor = preprocess(&rgb_img, self.image_size);
        let prediction = self.predict(tensor.view())?;
        debug!(shape = ?prediction.shape(), "mask predicted");
        postprocess_mask(prediction.view(), img.width(), img.height())
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Resizes to the square model input, scales by the brightest subpixel and
/// normalises each channel. Returns an NCHW tensor.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Array4<f32> {
    let resized = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let pixels = resized.as_ndarray3();
    let max = f32::from(pixels.iter().copied().max().unwrap_or(0)).max(1e-6);

    let mut tensor = pixels
        .mapv(|v| f32::from(v) / max)
        .insert_axis(Axis(0));
    for (channel, mut plane) in tensor.axis_iter_mut(Axis(1)).enumerate() {
        plane.mapv_inplace(|v| (v - MEAN[channel]) / STD[channel]);
    }
    tensor
}

/// Takes the first mask plane, stretches it to the full 0..=255 range and
/// resizes it back to the source dimensions.
pub fn postprocess_mask(mask: ArrayView4<f32>, width: u32, height: u32) -> Result<GrayImage> {
    let plane = mask.slice(s![0, 0, .., ..]);
    let (rows, cols) = plane.dim();

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = (max - min).max(1e-6);

    let raw = plane
        .iter()
        .map(|v| (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect::<Vec<_>>();
    let mask = GrayImage::from_raw(cols as u32, rows as u32, raw).ok_or_else(|| {
        CutoutError::Model {
            operation: "convert mask tensor".to_string(),
            source: "mask buffer does not match its shape".into(),
        }
    })?;

    Ok(imageops::resize(&mask, width, height, FilterType::Lanczos3))
}
