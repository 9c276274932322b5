//! Configuration types for upscaling operations

use crate::error::{Result, UpscaleError};
use crate::model::ModelSpec;
use serde::{Deserialize, Serialize};

/// Seamless border strategies applied before inference and cropped back out
/// of the final result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SeamlessMode {
    /// No padding, no cropping
    #[default]
    None,
    /// Wrap-around extension (the pixel at -1 equals the pixel at width-1)
    Tile,
    /// Reflective extension without duplicating the edge pixel
    Mirror,
    /// Edge pixel repeated outward
    Replicate,
    /// Constant fully-transparent border
    AlphaPad,
}

impl std::fmt::Display for SeamlessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Tile => write!(f, "tile"),
            Self::Mirror => write!(f, "mirror"),
            Self::Replicate => write!(f, "replicate"),
            Self::AlphaPad => write!(f, "alpha_pad"),
        }
    }
}

impl std::str::FromStr for SeamlessMode {
    type Err = UpscaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "tile" => Ok(Self::Tile),
            "mirror" => Ok(Self::Mirror),
            "replicate" => Ok(Self::Replicate),
            "alpha_pad" => Ok(Self::AlphaPad),
            other => Err(UpscaleError::invalid_config(format!(
                "Unknown seamless mode '{other}' (expected none, tile, mirror, replicate or alpha_pad)"
            ))),
        }
    }
}

/// Alpha recombination strategies for models that accept and return exactly
/// 3 channels while the source image carries an alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AlphaMode {
    /// Drop alpha, run once on RGB, attach a fully-opaque alpha channel
    #[default]
    None,
    /// Composite against black and white backgrounds, run twice, derive
    /// alpha from the per-pixel difference of the two results
    BgDifference,
    /// Upscale the alpha channel as its own grayscale image in a second run
    Separate,
    /// Run on (R,G,B) and (G,B,A), treating alpha as a regular color channel
    Swapping,
}

impl std::fmt::Display for AlphaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::BgDifference => write!(f, "bg_difference"),
            Self::Separate => write!(f, "separate"),
            Self::Swapping => write!(f, "swapping"),
        }
    }
}

impl std::str::FromStr for AlphaMode {
    type Err = UpscaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "bg_difference" => Ok(Self::BgDifference),
            "separate" => Ok(Self::Separate),
            "swapping" => Ok(Self::Swapping),
            other => Err(UpscaleError::invalid_config(format!(
                "Unknown alpha mode '{other}' (expected none, bg_difference, separate or swapping)"
            ))),
        }
    }
}

/// Execution provider hint, passed through opaquely to the model loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
        }
    }
}

/// Unified configuration for the upscaling processor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct UpscaleConfig {
    /// Model specification (identifier plus optional checkpoint blend)
    pub model_spec: ModelSpec,
    /// Seamless border strategy
    pub seamless: SeamlessMode,
    /// Alpha recombination strategy
    pub alpha_mode: AlphaMode,
    /// Threshold the output alpha channel to fully transparent / fully opaque
    pub binary_alpha: bool,
    /// Classify the output alpha channel into transparent / half-transparent /
    /// opaque around the threshold
    pub ternary_alpha: bool,
    /// Alpha quantization threshold in [0, 1]
    pub alpha_threshold: f32,
    /// Half-width of the half-transparent band around the threshold, in [0, 1]
    pub alpha_boundary_offset: f32,
    /// Reuse the empirically discovered split depth across calls (performance
    /// hint only; the depth can always be re-derived by retrying)
    pub reuse_split_depth: bool,
    /// Execution provider hint for the model loader
    pub execution_provider: ExecutionProvider,
    /// Half-precision inference hint for the model loader
    pub fp16: bool,
}

impl UpscaleConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> UpscaleConfigBuilder {
        UpscaleConfigBuilder::new()
    }
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            model_spec: ModelSpec::default(),
            seamless: SeamlessMode::None,
            alpha_mode: AlphaMode::None,
            binary_alpha: false,
            ternary_alpha: false,
            alpha_threshold: 0.5,
            alpha_boundary_offset: 0.2,
            reuse_split_depth: false,
            execution_provider: ExecutionProvider::Auto,
            fp16: false,
        }
    }
}

/// Builder for `UpscaleConfig`
pub struct UpscaleConfigBuilder {
    config: UpscaleConfig,
}

impl UpscaleConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: UpscaleConfig::default(),
        }
    }

    #[must_use]
    pub fn model_spec(mut self, model_spec: ModelSpec) -> Self {
        self.config.model_spec = model_spec;
        self
    }

    #[must_use]
    pub fn seamless(mut self, mode: SeamlessMode) -> Self {
        self.config.seamless = mode;
        self
    }

    #[must_use]
    pub fn alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.config.alpha_mode = mode;
        self
    }

    #[must_use]
    pub fn binary_alpha(mut self, enabled: bool) -> Self {
        self.config.binary_alpha = enabled;
        self
    }

    #[must_use]
    pub fn ternary_alpha(mut self, enabled: bool) -> Self {
        self.config.ternary_alpha = enabled;
        self
    }

    #[must_use]
    pub fn alpha_threshold(mut self, threshold: f32) -> Self {
        self.config.alpha_threshold = threshold;
        self
    }

    #[must_use]
    pub fn alpha_boundary_offset(mut self, offset: f32) -> Self {
        self.config.alpha_boundary_offset = offset;
        self
    }

    #[must_use]
    pub fn reuse_split_depth(mut self, enabled: bool) -> Self {
        self.config.reuse_split_depth = enabled;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn fp16(mut self, enabled: bool) -> Self {
        self.config.fp16 = enabled;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::InvalidConfig` when binary and ternary alpha
    /// are both requested, or when a quantization parameter lies outside
    /// [0, 1].
    pub fn build(self) -> Result<UpscaleConfig> {
        if self.config.binary_alpha && self.config.ternary_alpha {
            return Err(UpscaleError::invalid_config(
                "binary_alpha and ternary_alpha are mutually exclusive",
            ));
        }
        if !(0.0..=1.0).contains(&self.config.alpha_threshold) {
            return Err(UpscaleError::invalid_config(
                "alpha_threshold must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.config.alpha_boundary_offset) {
            return Err(UpscaleError::invalid_config(
                "alpha_boundary_offset must be in [0, 1]",
            ));
        }

        Ok(self.config)
    }
}

impl Default for UpscaleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = UpscaleConfigBuilder::new().build().unwrap();
        assert_eq!(config.seamless, SeamlessMode::None);
        assert_eq!(config.alpha_mode, AlphaMode::None);
        assert!(!config.binary_alpha);
        assert!(!config.ternary_alpha);
        assert!((config.alpha_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.alpha_boundary_offset - 0.2).abs() < f32::EPSILON);
        assert!(!config.reuse_split_depth);
    }

    #[test]
    fn test_builder_rejects_conflicting_quantization() {
        let result = UpscaleConfigBuilder::new()
            .binary_alpha(true)
            .ternary_alpha(true)
            .build();
        assert!(matches!(result, Err(UpscaleError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_rejects_out_of_range_threshold() {
        let result = UpscaleConfigBuilder::new().alpha_threshold(1.5).build();
        assert!(matches!(result, Err(UpscaleError::InvalidConfig(_))));

        let result = UpscaleConfigBuilder::new()
            .alpha_boundary_offset(-0.1)
            .build();
        assert!(matches!(result, Err(UpscaleError::InvalidConfig(_))));
    }

    #[test]
    fn test_mode_round_trip_parsing() {
        for mode in [
            SeamlessMode::None,
            SeamlessMode::Tile,
            SeamlessMode::Mirror,
            SeamlessMode::Replicate,
            SeamlessMode::AlphaPad,
        ] {
            assert_eq!(mode.to_string().parse::<SeamlessMode>().unwrap(), mode);
        }
        for mode in [
            AlphaMode::None,
            AlphaMode::BgDifference,
            AlphaMode::Separate,
            AlphaMode::Swapping,
        ] {
            assert_eq!(mode.to_string().parse::<AlphaMode>().unwrap(), mode);
        }
        assert!("diagonal".parse::<SeamlessMode>().is_err());
        assert!("premultiply".parse::<AlphaMode>().is_err());
    }
}
