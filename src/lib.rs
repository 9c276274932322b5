#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Flora Upscale
//!
//! A super-resolution upscaling pipeline for raster images around a
//! pluggable model backend, built to cope with the three failure modes of
//! real-world super-resolution inference:
//!
//! - **Bounded memory**: when the model signals resource exhaustion, the
//!   image is recursively split into quadrants until every tile fits the
//!   memory budget, and the upscaled tiles are stitched back seamlessly.
//!   The discovered split depth can be cached and reused across calls.
//! - **Alpha channels**: models that accept and return exactly 3 channels
//!   cannot consume transparency directly; four compositing strategies
//!   (`none`, `bg_difference`, `separate`, `swapping`) recombine one or two
//!   inference runs into a lossless RGBA result, with optional binary or
//!   ternary alpha quantization.
//! - **Border artifacts**: seamless modes (`tile`, `mirror`, `replicate`,
//!   `alpha_pad`) pad the image before inference and crop the scaled margin
//!   back out of the result.
//!
//! The model itself is an opaque capability behind the [`Model`] trait:
//! given a normalized buffer, return it upscaled by a fixed integer factor
//! or fail. Checkpoint parsing, architecture detection and device placement
//! live behind the [`ModelLoader`] seam and are injected by the embedder.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flora_upscale::{
//!     ModelSpec, SeamlessMode, UpscaleConfig, UpscaleProcessor,
//!     backends::MockModelLoader,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = UpscaleConfig::builder()
//!     .model_spec(ModelSpec::parse("4x_foolhardy_Remacri.pth")?)
//!     .seamless(SeamlessMode::Mirror)
//!     .build()?;
//!
//! // Inject a real model backend here; the mock upscales by replication.
//! let mut processor = UpscaleProcessor::with_loader(config, Box::new(MockModelLoader::new(4)))?;
//! let result = processor.process_file("input.png")?;
//! result.save_png("output.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Transparent images
//!
//! ```rust,no_run
//! use flora_upscale::{AlphaMode, UpscaleConfig, UpscaleProcessor, backends::MockModelLoader};
//!
//! # fn example(image: image::DynamicImage) -> anyhow::Result<()> {
//! let config = UpscaleConfig::builder()
//!     .alpha_mode(AlphaMode::BgDifference)
//!     .ternary_alpha(true)
//!     .build()?;
//! let mut processor = UpscaleProcessor::with_loader(config, Box::new(MockModelLoader::new(2)))?;
//! let result = processor.process_image(&image)?;
//! result.save_png("output.png")?;
//! # Ok(())
//! # }
//! ```

pub mod alpha;
pub mod backends;
pub mod border;
pub mod channels;
pub mod config;
pub mod error;
pub mod model;
pub mod processor;
pub mod split;
pub mod types;

// Internal imports for lib functions
use tokio::io::AsyncRead;

// Public API exports
pub use border::{crop_seamless, pad_seamless, SEAMLESS_MARGIN};
pub use channels::{adapt_channels, ChannelPlan};
pub use config::{
    AlphaMode, ExecutionProvider, SeamlessMode, UpscaleConfig, UpscaleConfigBuilder,
};
pub use error::{Result, UpscaleError};
pub use model::{DefaultModelLoader, Model, ModelBlend, ModelLoader, ModelSpec};
pub use processor::UpscaleProcessor;
pub use split::{upscale_regions, SplitDepthCache};
pub use types::{
    buffer_to_image, image_to_buffer, ProcessingMetadata, ProcessingTimings, UpscaleResult,
};

/// Upscale a pre-loaded image with an injected model loader
///
/// The most flexible convenience API for in-memory processing; for repeated
/// calls construct an [`UpscaleProcessor`] once and reuse it, so the loaded
/// model and the split-depth cache survive between images.
///
/// # Errors
///
/// Returns any error from [`UpscaleProcessor::process_image`].
pub fn upscale_image(
    image: &image::DynamicImage,
    config: &UpscaleConfig,
    loader: Box<dyn ModelLoader>,
) -> Result<UpscaleResult> {
    let mut processor = UpscaleProcessor::with_loader(config.clone(), loader)?;
    processor.process_image(image)
}

/// Upscale an image provided as encoded bytes (PNG, JPEG, TIFF, ...)
///
/// # Errors
///
/// Returns `UpscaleError::Processing` when the bytes cannot be decoded, plus
/// any error from [`UpscaleProcessor::process_image`].
pub fn upscale_from_bytes(
    image_bytes: &[u8],
    config: &UpscaleConfig,
    loader: Box<dyn ModelLoader>,
) -> Result<UpscaleResult> {
    let image = image::load_from_memory(image_bytes).map_err(|e| {
        UpscaleError::processing(format!("Failed to decode image from bytes: {e}"))
    })?;
    upscale_image(&image, config, loader)
}

/// Upscale an image from an async reader stream
///
/// Reads the stream to the end, then runs the synchronous pipeline. Suitable
/// for network streams and large files on async servers.
///
/// # Errors
///
/// Returns `UpscaleError::Processing` when the stream cannot be read or
/// decoded, plus any error from [`UpscaleProcessor::process_image`].
pub async fn upscale_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &UpscaleConfig,
    loader: Box<dyn ModelLoader>,
) -> Result<UpscaleResult> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
        .await
        .map_err(|e| UpscaleError::processing(format!("Failed to read from stream: {e}")))?;

    upscale_from_bytes(&buffer, config, loader)
}
