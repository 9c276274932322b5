//! Unified upscaling processor
//!
//! Sequences the pipeline stages in their fixed order: seamless pre-pad,
//! tile-split inference (channel adaptation and alpha compositing happen
//! per tile), seamless crop. Owns the loaded model handle and the
//! split-depth cache; no other component observes either.

use crate::{
    alpha,
    border::{crop_seamless, pad_seamless},
    channels::{adapt_channels, ChannelPlan},
    config::{AlphaMode, SeamlessMode, UpscaleConfig},
    error::{Result, UpscaleError},
    model::{DefaultModelLoader, Model, ModelLoader, ModelSpec},
    split::{upscale_regions, SplitDepthCache},
    types::{buffer_to_image, image_to_buffer, ProcessingMetadata, ProcessingTimings, UpscaleResult},
};
use image::DynamicImage;
use instant::Instant;
use log::info;
use ndarray::Array3;
use std::path::Path;
use tracing::{debug, instrument};

/// Pipeline-stage index in the split-depth cache. A single-model pipeline
/// only ever uses stage 0; the index is the extension point for sequential
/// multi-model chaining.
const UPSCALE_STAGE: usize = 0;

/// Unified upscaling processor
pub struct UpscaleProcessor {
    config: UpscaleConfig,
    loader: Box<dyn ModelLoader>,
    model: Option<Box<dyn Model>>,
    loaded_spec: Option<ModelSpec>,
    split_depths: SplitDepthCache,
}

impl UpscaleProcessor {
    /// Create a new processor with the default model loader
    ///
    /// The default loader refuses to load anything; library embedders inject
    /// a real backend via [`Self::with_loader`].
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::InvalidConfig` for invalid configurations.
    pub fn new(config: UpscaleConfig) -> Result<Self> {
        Self::with_loader(config, Box::new(DefaultModelLoader))
    }

    /// Create a new processor with an injected model loader
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::InvalidConfig` for invalid configurations.
    pub fn with_loader(config: UpscaleConfig, loader: Box<dyn ModelLoader>) -> Result<Self> {
        Ok(Self {
            config,
            loader,
            model: None,
            loaded_spec: None,
            split_depths: SplitDepthCache::new(),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &UpscaleConfig {
        &self.config
    }

    /// Whether a model is currently loaded
    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Change the model specification; the new model is loaded lazily on the
    /// next call if it differs from the currently loaded one
    pub fn set_model_spec(&mut self, spec: ModelSpec) {
        self.config.model_spec = spec;
    }

    /// Upscale a decoded image
    ///
    /// # Errors
    ///
    /// - `UpscaleError::Model` when the loader rejects the checkpoint
    /// - `UpscaleError::InvalidConfig` when the configuration does not fit
    ///   the loaded model (raised before any inference)
    /// - `UpscaleError::Processing` for unrecoverable pipeline failures,
    ///   including resource exhaustion on a 1x1 region
    /// - any other model failure, unmodified
    #[instrument(
        skip(self, image),
        fields(
            model = %self.config.model_spec,
            seamless = %self.config.seamless,
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<UpscaleResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();
        let original_dimensions = (image.width(), image.height());

        self.ensure_model()?;

        let buffer = image_to_buffer(image);

        // Seamless pre-pass
        let pad_start = Instant::now();
        let padded = pad_seamless(&buffer, self.config.seamless);
        timings.pad_ms = pad_start.elapsed().as_millis() as u64;

        let model = self
            .model
            .as_mut()
            .ok_or_else(|| UpscaleError::internal("Model not loaded"))?;
        let scale = model.scale();
        let config = &self.config;

        let start_depth = if config.reuse_split_depth {
            let cached = self.split_depths.get(UPSCALE_STAGE).unwrap_or(0);
            if cached > 0 {
                debug!(depth = cached, "Reusing cached split depth");
            }
            cached
        } else {
            0
        };

        // Tile-split inference
        let inference_start = Instant::now();
        let (upscaled, depth) = upscale_regions(&padded, scale, start_depth, |tile| {
            process_tile(model.as_mut(), config, tile)
        })?;
        timings.inference_ms = inference_start.elapsed().as_millis() as u64;
        self.split_depths.record(UPSCALE_STAGE, depth);

        // Seamless post-pass
        let crop_start = Instant::now();
        let final_buffer = if self.config.seamless == SeamlessMode::None {
            upscaled
        } else {
            crop_seamless(&upscaled, scale)?
        };
        timings.crop_ms = crop_start.elapsed().as_millis() as u64;

        let result_image = buffer_to_image(&final_buffer)?;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        let model = self
            .model
            .as_ref()
            .ok_or_else(|| UpscaleError::internal("Model not loaded"))?;
        let metadata = ProcessingMetadata {
            model_name: model.name().to_string(),
            scale,
            split_depth: depth,
            timings,
        };

        Ok(UpscaleResult::new(result_image, original_dimensions, metadata))
    }

    /// Upscale image data from encoded bytes
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::Processing` when the bytes cannot be decoded,
    /// plus any error from [`Self::process_image`].
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<UpscaleResult> {
        let image = image::load_from_memory(image_bytes).map_err(|e| {
            UpscaleError::processing(format!("Failed to decode image from bytes: {e}"))
        })?;
        self.process_image(&image)
    }

    /// Upscale an image file
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::Processing` when the file cannot be decoded,
    /// plus any error from [`Self::process_image`].
    pub fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<UpscaleResult> {
        let image = image::open(input_path.as_ref())
            .map_err(|e| UpscaleError::processing(format!("Failed to load image file: {e}")))?;
        self.process_image(&image)
    }

    /// Load the configured model if it differs from the currently loaded one
    fn ensure_model(&mut self) -> Result<()> {
        if self.loaded_spec.as_ref() == Some(&self.config.model_spec) {
            return Ok(());
        }

        info!("Loading model '{}'", self.config.model_spec);
        let model = self.loader.load(&self.config.model_spec)?;
        validate_model_config(&self.config, model.as_ref())?;

        debug!(
            model = model.name(),
            scale = model.scale(),
            input_channels = model.input_channels(),
            output_channels = model.output_channels(),
            "Model loaded"
        );
        self.model = Some(model);
        self.loaded_spec = Some(self.config.model_spec.clone());
        Ok(())
    }
}

/// Cross-validate configuration against the loaded model, before any
/// inference begins
fn validate_model_config(config: &UpscaleConfig, model: &dyn Model) -> Result<()> {
    if config.alpha_mode != AlphaMode::None
        && (model.input_channels() != 3 || model.output_channels() != 3)
    {
        return Err(UpscaleError::invalid_config(format!(
            "Alpha mode '{}' requires a model with 3 input and 3 output channels, '{}' has {}/{}",
            config.alpha_mode,
            model.name(),
            model.input_channels(),
            model.output_channels(),
        )));
    }
    Ok(())
}

/// Process one tile: normalize, adapt channels (compositing alpha when the
/// model cannot consume it), infer, and rescale back to the byte domain
fn process_tile(
    model: &mut dyn Model,
    config: &UpscaleConfig,
    tile: &Array3<f32>,
) -> Result<Array3<f32>> {
    let normalized = tile.mapv(|v| v / 255.0);
    let in_nc = model.input_channels();
    let out_nc = model.output_channels();

    let output = match adapt_channels(normalized, in_nc, out_nc) {
        ChannelPlan::Ready(buffer) => infer_clamped(model, &buffer)?,
        ChannelPlan::NeedsAlpha(buffer) => {
            let mut run = |input: &Array3<f32>| infer_clamped(model, input);
            alpha::composite(&buffer, config, &mut run)?
        },
    };

    Ok(output.mapv(|v| (v * 255.0).round()))
}

/// Invoke the model and clamp the result into the normalized domain
fn infer_clamped(model: &mut dyn Model, input: &Array3<f32>) -> Result<Array3<f32>> {
    Ok(model.infer(input)?.mapv(|v| v.clamp(0.0, 1.0)))
}
