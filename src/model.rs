//! Opaque model capability and loader abstraction
//!
//! The pipeline treats the super-resolution network as a capability: given a
//! height x width x channels buffer of samples in [0, 1], return a buffer
//! upscaled by a fixed integer factor, or fail with a resource exhaustion.
//! Checkpoint parsing, architecture detection and device placement all live
//! behind the [`ModelLoader`] seam and are injected by the embedder.

use crate::error::{Result, UpscaleError};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Trait for loaded super-resolution models
pub trait Model {
    /// Fixed integer spatial scale factor of this model
    fn scale(&self) -> usize;

    /// Number of input channels the model expects
    fn input_channels(&self) -> usize;

    /// Number of output channels the model produces
    fn output_channels(&self) -> usize;

    /// Run inference on a (height, width, channels) buffer normalized to
    /// [0, 1]
    ///
    /// # Errors
    /// - `UpscaleError::ResourceExhausted` when the region is too large for
    ///   the available memory budget (recoverable, handled by the splitter)
    /// - `UpscaleError::Inference` for any other failure (fatal)
    fn infer(&mut self, input: &Array3<f32>) -> Result<Array3<f32>>;

    /// Human-readable model name for diagnostics
    fn name(&self) -> &str;
}

/// Parsed model specification
///
/// The identifier addresses a single checkpoint; an optional blend describes
/// on-the-fly weight interpolation between two checkpoints. The blend is
/// carried as explicit structure and executed by the loader, never inside
/// architecture detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModelSpec {
    /// Primary checkpoint identifier
    pub identifier: String,
    /// Optional interpolation against a second checkpoint
    pub blend: Option<ModelBlend>,
}

/// Weight interpolation between two checkpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBlend {
    /// Secondary checkpoint identifier
    pub secondary: String,
    /// Weight of the primary checkpoint, in percent
    pub primary_weight: u8,
    /// Weight of the secondary checkpoint, in percent
    pub secondary_weight: u8,
}

impl ModelSpec {
    /// Create a spec for a single checkpoint
    #[must_use]
    pub fn new<S: Into<String>>(identifier: S) -> Self {
        Self {
            identifier: identifier.into(),
            blend: None,
        }
    }

    /// Parse a model string, including the interpolation syntax
    /// `primary@75&secondary@25`
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::InvalidConfig` when the blend syntax is
    /// malformed (missing weight, non-numeric weight, or more than two
    /// checkpoints).
    pub fn parse(spec: &str) -> Result<Self> {
        if !spec.contains('&') {
            return Ok(Self::new(spec));
        }

        let parts: Vec<&str> = spec.split('&').collect();
        if parts.len() != 2 {
            return Err(UpscaleError::invalid_config(format!(
                "Model interpolation takes exactly two checkpoints, got {} in '{spec}'",
                parts.len()
            )));
        }

        let (primary, primary_weight) = Self::parse_weighted(parts[0])?;
        let (secondary, secondary_weight) = Self::parse_weighted(parts[1])?;

        Ok(Self {
            identifier: primary,
            blend: Some(ModelBlend {
                secondary,
                primary_weight,
                secondary_weight,
            }),
        })
    }

    fn parse_weighted(part: &str) -> Result<(String, u8)> {
        let (identifier, weight) = part.split_once('@').ok_or_else(|| {
            UpscaleError::invalid_config(format!(
                "Interpolated checkpoint '{part}' is missing an '@weight' suffix"
            ))
        })?;
        let weight = weight.parse::<u8>().map_err(|_| {
            UpscaleError::invalid_config(format!(
                "Invalid interpolation weight '{weight}' in '{part}' (expected 0-100)"
            ))
        })?;
        if weight > 100 {
            return Err(UpscaleError::invalid_config(format!(
                "Interpolation weight {weight} out of range (expected 0-100)"
            )));
        }
        Ok((identifier.to_string(), weight))
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.blend {
            Some(blend) => write!(
                f,
                "{}@{}&{}@{}",
                self.identifier, blend.primary_weight, blend.secondary, blend.secondary_weight
            ),
            None => write!(f, "{}", self.identifier),
        }
    }
}

/// Factory trait for loading models from checkpoint identifiers
///
/// Real backends (checkpoint parsing, architecture fingerprinting, device
/// selection) are injected by the embedder through this trait.
pub trait ModelLoader: Send + Sync {
    /// Load a model for the given specification
    ///
    /// # Errors
    ///
    /// Returns `UpscaleError::Model` on malformed or unrecognized checkpoint
    /// data.
    fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Model>>;
}

/// Default loader implementation
///
/// No inference backend ships with the core library; embedders inject one
/// via [`ModelLoader`].
pub struct DefaultModelLoader;

impl ModelLoader for DefaultModelLoader {
    fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Model>> {
        Err(UpscaleError::invalid_config(format!(
            "No model backend available for '{spec}'. A ModelLoader must be injected by the embedder."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_identifier() {
        let spec = ModelSpec::parse("4x_foolhardy_Remacri.pth").unwrap();
        assert_eq!(spec.identifier, "4x_foolhardy_Remacri.pth");
        assert!(spec.blend.is_none());
    }

    #[test]
    fn test_parse_blend() {
        let spec = ModelSpec::parse("4xBox@25&4xPSNR@75").unwrap();
        assert_eq!(spec.identifier, "4xBox");
        let blend = spec.blend.as_ref().unwrap();
        assert_eq!(blend.secondary, "4xPSNR");
        assert_eq!(blend.primary_weight, 25);
        assert_eq!(blend.secondary_weight, 75);
    }

    #[test]
    fn test_blend_display_round_trip() {
        let spec = ModelSpec::parse("a@60&b@40").unwrap();
        assert_eq!(ModelSpec::parse(&spec.to_string()).unwrap(), spec);
    }

    #[test]
    fn test_parse_blend_errors() {
        assert!(ModelSpec::parse("a@50&b").is_err());
        assert!(ModelSpec::parse("a@x&b@50").is_err());
        assert!(ModelSpec::parse("a@50&b@50&c@0").is_err());
        assert!(ModelSpec::parse("a@150&b@50").is_err());
    }

    #[test]
    fn test_default_loader_refuses() {
        let loader = DefaultModelLoader;
        let result = loader.load(&ModelSpec::new("any.pth"));
        assert!(matches!(result, Err(UpscaleError::InvalidConfig(_))));
    }
}
