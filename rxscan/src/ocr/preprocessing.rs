use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, Luma};
use imageproc::filter::gaussian_blur_f32;

use super::denoise::non_local_means;
use crate::config::PreprocessConfig;
use crate::error::{Result, RxError};
use crate::models::{PreprocessedImage, RawImage};

/// Turns phone photos of paper into clean black-on-white rasters.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn preprocess(&self, raw: &RawImage) -> Result<PreprocessedImage> {
        preprocess_image(raw, &self.config)
    }
}

/// Preprocess image bytes for OCR
///
/// Applies the following transformations:
/// 1. Decodes PNG/JPEG into an RGB raster
/// 2. Converts to single-channel luminance
/// 3. Binarizes with a Gaussian-weighted adaptive threshold, which copes with
///    shadows and uneven lighting
/// 4. Removes binarization speckle with a non-local means pass
///
/// # Returns
/// Processed image bytes as grayscale PNG with the input's dimensions
pub fn preprocess_image(raw: &RawImage, config: &PreprocessConfig) -> Result<PreprocessedImage> {
    if raw.len() > config.max_image_bytes {
        return Err(RxError::Validation(format!(
            "Image too large: {} bytes, maximum {} bytes",
            raw.len(),
            config.max_image_bytes
        )));
    }

    let format = raw.format().ok_or_else(|| {
        RxError::Decode("Unrecognized image format, expected PNG or JPEG".to_string())
    })?;

    let img = image::load_from_memory_with_format(raw.bytes(), format.into())
        .map_err(|e| RxError::Decode(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RxError::Decode(format!(
            "Image has no pixels: {width}x{height}"
        )));
    }

    let color = DynamicImage::ImageRgb8(img.to_rgb8());
    let gray = color.to_luma8();

    let binary = adaptive_gaussian_threshold(&gray, config.block_size, config.threshold_offset);
    let denoised = non_local_means(
        &binary,
        config.denoise_strength,
        config.template_window,
        config.search_window,
    );

    let mut output = Vec::new();
    DynamicImage::ImageLuma8(denoised)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| RxError::Encode(format!("Failed to encode image: {e}")))?;

    tracing::debug!(
        width,
        height,
        input_bytes = raw.len(),
        output_bytes = output.len(),
        "Image preprocessed"
    );

    Ok(PreprocessedImage::new(output, width, height))
}

/// Gaussian sigma matching a square neighbourhood of `block_size` pixels.
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Pixels brighter than their Gaussian-weighted neighbourhood mean minus
/// `offset` become white, everything else black.
fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, block_sigma(block_size));

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0] as i32;
        let threshold = local_mean.get_pixel(x, y)[0] as i32 - offset;
        if value > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
