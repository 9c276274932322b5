//! Mock model implementation for testing and dry runs
//!
//! A pure nearest-neighbor upscaler: every output pixel is a function of the
//! input region alone, so a split run is bit-identical to an unsplit run.
//! An optional tile-area budget makes it signal resource exhaustion the way
//! a memory-constrained accelerator would.

use crate::error::{Result, UpscaleError};
use crate::model::{Model, ModelLoader, ModelSpec};
use ndarray::Array3;

/// Mock model for testing and dry runs
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    scale: usize,
    input_channels: usize,
    output_channels: usize,
    max_tile_area: Option<usize>,
}

impl MockModel {
    /// Create a 3-in/3-out nearest-neighbor model at the given scale with no
    /// memory budget
    #[must_use]
    pub fn new(scale: usize) -> Self {
        Self {
            name: format!("mock-{scale}x"),
            scale,
            input_channels: 3,
            output_channels: 3,
            max_tile_area: None,
        }
    }

    /// Set the expected input and produced output channel counts
    #[must_use]
    pub fn with_channels(mut self, input_channels: usize, output_channels: usize) -> Self {
        self.input_channels = input_channels;
        self.output_channels = output_channels;
        self
    }

    /// Fail with resource exhaustion for tiles larger than `area` pixels
    #[must_use]
    pub fn with_max_tile_area(mut self, area: usize) -> Self {
        self.max_tile_area = Some(area);
        self
    }
}

impl Model for MockModel {
    fn scale(&self) -> usize {
        self.scale
    }

    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn output_channels(&self) -> usize {
        self.output_channels
    }

    fn infer(&mut self, input: &Array3<f32>) -> Result<Array3<f32>> {
        let (height, width, channels) = input.dim();

        if channels != self.input_channels {
            return Err(UpscaleError::inference(format!(
                "Model '{}' expects {} input channels, got {channels}",
                self.name, self.input_channels
            )));
        }

        if let Some(max_area) = self.max_tile_area {
            if height * width > max_area {
                return Err(UpscaleError::resource_exhausted(format!(
                    "{width}x{height} tile exceeds the {max_area}px budget of '{}'",
                    self.name
                )));
            }
        }

        let scale = self.scale;
        let out_channels = self.output_channels;
        Ok(Array3::from_shape_fn(
            (height * scale, width * scale, out_channels),
            |(y, x, c)| input[[y / scale, x / scale, c.min(channels - 1)]],
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Loader producing [`MockModel`] instances regardless of the checkpoint
/// identifier
#[derive(Debug, Clone)]
pub struct MockModelLoader {
    scale: usize,
    max_tile_area: Option<usize>,
}

impl MockModelLoader {
    /// Create a loader for mock models at the given scale
    #[must_use]
    pub fn new(scale: usize) -> Self {
        Self {
            scale,
            max_tile_area: None,
        }
    }

    /// Give loaded models a tile-area budget
    #[must_use]
    pub fn with_max_tile_area(mut self, area: usize) -> Self {
        self.max_tile_area = Some(area);
        self
    }
}

impl ModelLoader for MockModelLoader {
    fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Model>> {
        let mut model = MockModel::new(self.scale);
        model.name = format!("mock-{}x ({spec})", self.scale);
        if let Some(area) = self.max_tile_area {
            model = model.with_max_tile_area(area);
        }
        Ok(Box::new(model))
    }
}
