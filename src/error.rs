//! Error types for upscaling operations

use thiserror::Error;

/// Result type alias for upscaling operations
pub type Result<T> = std::result::Result<T, UpscaleError>;

/// Comprehensive error types for upscaling operations
#[derive(Error, Debug)]
pub enum UpscaleError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image format or decoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Model could not complete inference on a region due to insufficient
    /// memory. Recoverable: the tile splitter handles it by subdividing the
    /// region. Only fatal when raised for a 1x1 region.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Model loading or initialization errors (malformed or unrecognized
    /// checkpoint data). Fatal, never retried.
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters, detected before any inference
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Any model failure that is not a resource exhaustion. Propagated
    /// unmodified; the pipeline does not attempt to interpret or retry it.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Pipeline-stage processing errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UpscaleError {
    /// Create a new resource exhaustion error
    pub fn resource_exhausted<S: Into<String>>(msg: S) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this failure is the recoverable out-of-memory class that the
    /// tile splitter reacts to by subdividing the region
    #[must_use]
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }

    /// Create a processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {info})"),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{stage}'{input_context}: {details}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = UpscaleError::invalid_config("test config error");
        assert!(matches!(err, UpscaleError::InvalidConfig(_)));

        let err = UpscaleError::model("unrecognized checkpoint");
        assert!(matches!(err, UpscaleError::Model(_)));
    }

    #[test]
    fn test_error_display() {
        let err = UpscaleError::invalid_config("binary and ternary alpha are mutually exclusive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: binary and ternary alpha are mutually exclusive"
        );
    }

    #[test]
    fn test_resource_exhausted_classification() {
        assert!(UpscaleError::resource_exhausted("tile too large").is_resource_exhausted());
        assert!(!UpscaleError::inference("shape mismatch").is_resource_exhausted());
        assert!(!UpscaleError::model("bad checkpoint").is_resource_exhausted());
    }

    #[test]
    fn test_processing_stage_error_context() {
        let err = UpscaleError::processing_stage_error(
            "stitching",
            "quadrant result has wrong dimensions",
            Some("64x64 RGBA"),
        );
        let error_string = err.to_string();
        assert!(error_string.contains("stitching"));
        assert!(error_string.contains("64x64 RGBA"));
    }
}
