//! Core types for upscaling operations

use crate::error::{Result, UpscaleError};
use image::DynamicImage;
use ndarray::Array3;
use std::path::Path;

/// Result of an upscaling operation
#[derive(Debug, Clone)]
pub struct UpscaleResult {
    /// The upscaled image
    pub image: DynamicImage,

    /// Input image dimensions (width, height)
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,
}

impl UpscaleResult {
    /// Create a new upscale result
    #[must_use]
    pub fn new(
        image: DynamicImage,
        original_dimensions: (u32, u32),
        metadata: ProcessingMetadata,
    ) -> Self {
        Self {
            image,
            original_dimensions,
            metadata,
        }
    }

    /// Save the result as PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Save in the format implied by the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    /// Get the image as PNG-encoded bytes
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image.write_to(&mut cursor, image::ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Get output image dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Get detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }
}

/// Processing metadata attached to each result
#[derive(Debug, Clone)]
pub struct ProcessingMetadata {
    /// Name of the model that produced the result
    pub model_name: String,
    /// Spatial scale factor applied
    pub scale: usize,
    /// Maximum tile-split depth required to fit the memory budget
    pub split_depth: usize,
    /// Timing breakdown
    pub timings: ProcessingTimings,
}

/// Per-stage timing breakdown in milliseconds
#[derive(Debug, Clone, Default)]
pub struct ProcessingTimings {
    /// Seamless border padding
    pub pad_ms: u64,
    /// Inference including tile splitting and stitching
    pub inference_ms: u64,
    /// Seamless border cropping
    pub crop_ms: u64,
    /// End-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Get timing summary for display
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Pad: {}ms | Inference: {}ms | Crop: {}ms",
            self.total_ms, self.pad_ms, self.inference_ms, self.crop_ms
        )
    }
}

/// Convert a decoded image into a (height, width, channels) buffer of f32
/// samples in the byte domain [0, 255]
///
/// Grayscale input is replicated into 3 channels; an alpha channel is
/// preserved as the 4th channel.
#[must_use]
pub fn image_to_buffer(image: &DynamicImage) -> Array3<f32> {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Array3::from_shape_fn((height as usize, width as usize, 4), |(y, x, c)| {
            f32::from(rgba.get_pixel(x as u32, y as u32)[c])
        })
    } else {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
            f32::from(rgb.get_pixel(x as u32, y as u32)[c])
        })
    }
}

/// Convert a byte-domain (height, width, channels) buffer back into an image
///
/// Samples are rounded and clamped to [0, 255]. A 3-channel buffer becomes
/// RGB, a 4-channel buffer RGBA.
///
/// # Errors
///
/// Returns `UpscaleError::Processing` for channel counts other than 3 or 4.
pub fn buffer_to_image(buffer: &Array3<f32>) -> Result<DynamicImage> {
    let (height, width, channels) = buffer.dim();
    let sample = |y: usize, x: usize, c: usize| -> u8 {
        buffer[[y, x, c]].round().clamp(0.0, 255.0) as u8
    };

    match channels {
        3 => {
            let img = image::RgbImage::from_fn(width as u32, height as u32, |x, y| {
                let (x, y) = (x as usize, y as usize);
                image::Rgb([sample(y, x, 0), sample(y, x, 1), sample(y, x, 2)])
            });
            Ok(DynamicImage::ImageRgb8(img))
        },
        4 => {
            let img = image::RgbaImage::from_fn(width as u32, height as u32, |x, y| {
                let (x, y) = (x as usize, y as usize);
                image::Rgba([
                    sample(y, x, 0),
                    sample(y, x, 1),
                    sample(y, x, 2),
                    sample(y, x, 3),
                ])
            });
            Ok(DynamicImage::ImageRgba8(img))
        },
        other => Err(UpscaleError::processing(format!(
            "Cannot encode a {other}-channel buffer as an image (expected 3 or 4 channels)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_image_buffer_round_trip() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(4, 3, |x, y| {
            image::Rgb([x as u8 * 10, y as u8 * 20, 200])
        }));

        let buffer = image_to_buffer(&img);
        assert_eq!(buffer.dim(), (3, 4, 3));
        assert!((buffer[[1, 2, 0]] - 20.0).abs() < f32::EPSILON);

        let restored = buffer_to_image(&buffer).unwrap();
        assert_eq!(restored.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn test_alpha_preserved_as_fourth_channel() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(2, 2, |x, y| {
            image::Rgba([10, 20, 30, (x + y) as u8 * 100])
        }));

        let buffer = image_to_buffer(&img);
        assert_eq!(buffer.dim(), (2, 2, 4));
        assert!((buffer[[1, 1, 3]] - 200.0).abs() < f32::EPSILON);

        let restored = buffer_to_image(&buffer).unwrap();
        assert_eq!(restored.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn test_grayscale_replicates_to_three_channels() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([77])));
        let buffer = image_to_buffer(&img);
        assert_eq!(buffer.dim(), (2, 2, 3));
        for c in 0..3 {
            assert!((buffer[[0, 0, c]] - 77.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_buffer_to_image_rejects_odd_channel_counts() {
        let buffer = Array3::<f32>::zeros((2, 2, 2));
        assert!(buffer_to_image(&buffer).is_err());
    }

    #[test]
    fn test_samples_clamped_on_encode() {
        let mut buffer = Array3::<f32>::zeros((1, 1, 3));
        buffer[[0, 0, 0]] = 300.0;
        buffer[[0, 0, 1]] = -12.0;
        buffer[[0, 0, 2]] = 127.6;
        let img = buffer_to_image(&buffer).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 128]);
    }
}
