//! Adaptive recursive tile splitting
//!
//! The memory-safety layer of the pipeline. A region is first handed to the
//! model whole; when the model signals resource exhaustion, the region is
//! bisected into four quadrants which are processed one depth deeper, and
//! the upscaled quadrants are stitched back at their scaled offsets. The
//! algorithm runs over an explicit worklist of pending regions rather than
//! the call stack, so quadrants could later be cancelled or dispatched in
//! parallel without rewriting it.

use crate::error::{Result, UpscaleError};
use ndarray::{s, Array3};
use std::collections::HashMap;
use tracing::debug;

/// A rectangular sub-region awaiting inference, in unscaled coordinates
#[derive(Debug, Clone, Copy)]
struct PendingRegion {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    depth: usize,
}

impl PendingRegion {
    /// Bisect width and height as evenly as possible; an odd dimension gives
    /// the first half the extra pixel. Quadrants with a zero dimension are
    /// not produced.
    fn quadrants(&self) -> Vec<PendingRegion> {
        let top_height = (self.height + 1) / 2;
        let left_width = (self.width + 1) / 2;
        let depth = self.depth + 1;

        let mut out = Vec::with_capacity(4);
        for (dy, h) in [(0, top_height), (top_height, self.height - top_height)] {
            for (dx, w) in [(0, left_width), (left_width, self.width - left_width)] {
                if w > 0 && h > 0 {
                    out.push(PendingRegion {
                        x: self.x + dx,
                        y: self.y + dy,
                        width: w,
                        height: h,
                        depth,
                    });
                }
            }
        }
        out
    }
}

/// Upscale a buffer through the splitting worklist
///
/// `invoke` processes one region and returns it upscaled by `scale` in both
/// spatial dimensions. A `start_depth` above zero pre-splits the image to
/// that depth without probing the full region first (the cached-depth hint);
/// the chance of an unnecessarily fine split is traded against a repeated
/// failed attempt.
///
/// Returns the stitched result, whose dimensions equal the input dimensions
/// times `scale` exactly, and the maximum depth any region required.
///
/// # Errors
///
/// - `UpscaleError::Processing` when the model exhausts resources on a 1x1
///   region (nothing left to split) or returns a wrongly-sized result
/// - any non-resource-exhaustion failure from `invoke`, unmodified
pub fn upscale_regions<F>(
    input: &Array3<f32>,
    scale: usize,
    start_depth: usize,
    mut invoke: F,
) -> Result<(Array3<f32>, usize)>
where
    F: FnMut(&Array3<f32>) -> Result<Array3<f32>>,
{
    let (height, width, _) = input.dim();
    if height == 0 || width == 0 {
        return Err(UpscaleError::processing(
            "Cannot upscale an empty image region",
        ));
    }

    let mut pending = vec![PendingRegion {
        x: 0,
        y: 0,
        width,
        height,
        depth: 0,
    }];
    let mut output: Option<Array3<f32>> = None;
    let mut max_depth = 0;

    while let Some(region) = pending.pop() {
        if region.depth < start_depth {
            pending.extend(region.quadrants());
            continue;
        }

        let tile = input
            .slice(s![
                region.y..region.y + region.height,
                region.x..region.x + region.width,
                ..
            ])
            .to_owned();

        match invoke(&tile) {
            Ok(result) => {
                stitch(&mut output, (height, width), scale, &region, &result)?;
                max_depth = max_depth.max(region.depth);
            },
            Err(err) if err.is_resource_exhausted() => {
                if region.width == 1 && region.height == 1 {
                    return Err(UpscaleError::processing_stage_error(
                        "tile_split",
                        "model exhausted resources on a 1x1 region, nothing left to split",
                        Some(&err.to_string()),
                    ));
                }
                debug!(
                    x = region.x,
                    y = region.y,
                    width = region.width,
                    height = region.height,
                    depth = region.depth,
                    "Region exhausted resources, splitting into quadrants"
                );
                pending.extend(region.quadrants());
            },
            Err(err) => return Err(err),
        }
    }

    let output = output
        .ok_or_else(|| UpscaleError::internal("Tile worklist drained without producing output"))?;
    Ok((output, max_depth))
}

/// Place one upscaled region into the output buffer at its scaled offset
///
/// The output buffer is allocated lazily on the first successful region,
/// once the output channel count is known.
fn stitch(
    output: &mut Option<Array3<f32>>,
    input_dims: (usize, usize),
    scale: usize,
    region: &PendingRegion,
    result: &Array3<f32>,
) -> Result<()> {
    let (result_height, result_width, result_channels) = result.dim();
    if result_height != region.height * scale || result_width != region.width * scale {
        return Err(UpscaleError::processing_stage_error(
            "stitching",
            &format!(
                "expected a {}x{} result for a {}x{} region at scale {scale}, got {result_width}x{result_height}",
                region.width * scale,
                region.height * scale,
                region.width,
                region.height,
            ),
            None,
        ));
    }

    let out = output.get_or_insert_with(|| {
        Array3::zeros((input_dims.0 * scale, input_dims.1 * scale, result_channels))
    });
    if out.dim().2 != result_channels {
        return Err(UpscaleError::internal(
            "Model produced inconsistent channel counts across regions",
        ));
    }

    out.slice_mut(s![
        region.y * scale..(region.y + region.height) * scale,
        region.x * scale..(region.x + region.width) * scale,
        ..
    ])
    .assign(result);
    Ok(())
}

/// Empirically discovered split depths, keyed by pipeline-stage index
///
/// Only stage 0 is populated today; the keyed form is the extension point
/// for sequential multi-model chaining. The cache is a performance hint,
/// never a correctness requirement: a stale depth merely costs an extra
/// split or a retried probe, and last-writer-wins is acceptable if the
/// cache is ever shared.
#[derive(Debug, Clone, Default)]
pub struct SplitDepthCache {
    depths: HashMap<usize, usize>,
}

impl SplitDepthCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the recorded depth for a pipeline stage
    #[must_use]
    pub fn get(&self, stage: usize) -> Option<usize> {
        self.depths.get(&stage).copied()
    }

    /// Record the depth a stage required, keeping the maximum seen
    pub fn record(&mut self, stage: usize, depth: usize) {
        self.depths
            .entry(stage)
            .and_modify(|d| *d = (*d).max(depth))
            .or_insert(depth);
    }

    /// Whether any depth has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}
