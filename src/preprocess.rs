use crate::{config, error::ConversionError};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::median_filter;
use tracing::debug;

/// Prepares an image for recognition: RGB normalize, grayscale, median
/// denoise, Gaussian adaptive threshold.
///
/// Holds only its parameters, so one instance can serve every conversion.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    block_size: u32,
    offset: f32,
    denoise_radius: u32,
    kernel: Vec<f32>,
}

impl ImagePreprocessor {
    pub fn new(cfg: &config::Preprocess) -> Result<Self, ConversionError> {
        if cfg.block_size < 3 || cfg.block_size % 2 == 0 {
            return Err(ConversionError::InvalidConfig(format!(
                "block size must be odd and >= 3, got {}",
                cfg.block_size
            )));
        }
        if cfg.denoise_radius == 0 {
            return Err(ConversionError::InvalidConfig(
                "denoise radius must be >= 1".into(),
            ));
        }
        Ok(Self {
            block_size: cfg.block_size,
            offset: cfg.offset,
            denoise_radius: cfg.denoise_radius,
            kernel: gaussian_kernel(cfg.block_size),
        })
    }

    pub fn apply(&self, image: &DynamicImage) -> GrayImage {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let gray = rgb.to_luma8();
        let denoised = median_filter(&gray, self.denoise_radius, self.denoise_radius);
        let binary = self.adaptive_threshold(&denoised);
        debug!(
            width = binary.width(),
            height = binary.height(),
            block_size = self.block_size,
            "image preprocessed"
        );
        binary
    }

    /// A pixel turns white when it is brighter than the Gaussian-weighted
    /// mean of its block minus `offset`; borders replicate the edge pixels.
    fn adaptive_threshold(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        let radius = (self.block_size / 2) as i64;

        let mut horizontal = vec![0f32; (width as usize) * (height as usize)];
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0f32;
                for (k, weight) in self.kernel.iter().enumerate() {
                    let sx = clamp_coord(x as i64 + k as i64 - radius, width);
                    acc += weight * gray.get_pixel(sx, y).0[0] as f32;
                }
                horizontal[(y * width + x) as usize] = acc;
            }
        }

        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let mut mean = 0f32;
                for (k, weight) in self.kernel.iter().enumerate() {
                    let sy = clamp_coord(y as i64 + k as i64 - radius, height);
                    mean += weight * horizontal[(sy * width + x) as usize];
                }
                let value = gray.get_pixel(x, y).0[0] as f32;
                let level = if value > mean - self.offset { 255 } else { 0 };
                out.put_pixel(x, y, Luma([level]));
            }
        }
        out
    }
}

fn clamp_coord(v: i64, len: u32) -> u32 {
    v.clamp(0, len as i64 - 1) as u32
}

/// Normalized 1-D Gaussian, sigma chosen from the block size the same way
/// common vision libraries do for adaptive thresholding.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}
