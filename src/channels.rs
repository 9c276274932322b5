//! Channel adaptation between the source image and the model's expectations
//!
//! Best-effort reshaping: grayscale replication, truncation of surplus
//! channels, and opaque-alpha padding. The one case that cannot be reshaped
//! losslessly, an alpha channel the model cannot consume, is routed to the
//! alpha compositor instead.

use ndarray::{s, Array3};
use tracing::warn;

/// Outcome of channel adaptation
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelPlan {
    /// Buffer matches the model's input channels and can be inferred directly
    Ready(Array3<f32>),
    /// 4-channel image on a 3-in/3-out model: alpha must be reconciled by the
    /// compositor rather than silently dropped
    NeedsAlpha(Array3<f32>),
}

/// Reshape a normalized buffer to the model's expected input channel count
///
/// Never fails; truncation of surplus channels is reported as a warning
/// diagnostic, not an error.
#[must_use]
pub fn adapt_channels(img: Array3<f32>, in_nc: usize, out_nc: usize) -> ChannelPlan {
    let (height, width, channels) = img.dim();

    if channels == 4 && in_nc == 3 && out_nc == 3 {
        return ChannelPlan::NeedsAlpha(img);
    }

    if channels == 1 {
        let target = in_nc.min(3);
        let replicated =
            Array3::from_shape_fn((height, width, target), |(y, x, _)| img[[y, x, 0]]);
        return ChannelPlan::Ready(replicated);
    }

    if channels > in_nc {
        warn!(
            from = channels,
            to = in_nc,
            "Truncating image channels to match model input"
        );
        return ChannelPlan::Ready(img.slice(s![.., .., ..in_nc]).to_owned());
    }

    if channels == 3 && in_nc == 4 {
        // The model is assumed to treat the fourth channel as alpha.
        let padded = Array3::from_shape_fn((height, width, 4), |(y, x, c)| {
            if c < 3 {
                img[[y, x, c]]
            } else {
                1.0
            }
        });
        return ChannelPlan::Ready(padded);
    }

    ChannelPlan::Ready(img)
}
