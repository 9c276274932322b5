//! Seamless border padding and cropping
//!
//! Boundary artifacts are avoided by extending the image on all four sides
//! before inference and cropping the scaled margin back out of the result.
//! Pad and crop are exact inverses on the unscaled image.

use crate::config::SeamlessMode;
use crate::error::{Result, UpscaleError};
use ndarray::Array3;

/// Fixed padding margin in pixels, applied to each side before inference
pub const SEAMLESS_MARGIN: usize = 16;

/// Extend the image by [`SEAMLESS_MARGIN`] pixels on every side
///
/// `SeamlessMode::None` returns the buffer unchanged.
#[must_use]
pub fn pad_seamless(img: &Array3<f32>, mode: SeamlessMode) -> Array3<f32> {
    if mode == SeamlessMode::None {
        return img.clone();
    }

    let (height, width, channels) = img.dim();
    let m = SEAMLESS_MARGIN as isize;

    Array3::from_shape_fn(
        (height + 2 * SEAMLESS_MARGIN, width + 2 * SEAMLESS_MARGIN, channels),
        |(y, x, c)| {
            let src_y = map_index(y as isize - m, height, mode);
            let src_x = map_index(x as isize - m, width, mode);
            match (src_y, src_x) {
                (Some(sy), Some(sx)) => img[[sy, sx, c]],
                _ => 0.0,
            }
        },
    )
}

/// Crop `SEAMLESS_MARGIN * final_scale` pixels from each side of the
/// upscaled result
///
/// # Errors
///
/// Returns `UpscaleError::Processing` when the buffer is not strictly larger
/// than the total margin.
pub fn crop_seamless(img: &Array3<f32>, final_scale: usize) -> Result<Array3<f32>> {
    let (height, width, _) = img.dim();
    let margin = SEAMLESS_MARGIN * final_scale;

    if height <= 2 * margin || width <= 2 * margin {
        return Err(UpscaleError::processing(format!(
            "Cannot crop a {margin}px seamless margin from a {width}x{height} result"
        )));
    }

    Ok(img
        .slice(ndarray::s![
            margin..height - margin,
            margin..width - margin,
            ..
        ])
        .to_owned())
}

/// Map a possibly out-of-range index into the source range, or `None` for
/// constant (transparent) padding
fn map_index(idx: isize, len: usize, mode: SeamlessMode) -> Option<usize> {
    let n = len as isize;
    if (0..n).contains(&idx) {
        return Some(idx as usize);
    }

    match mode {
        SeamlessMode::None => None,
        SeamlessMode::Tile => Some(idx.rem_euclid(n) as usize),
        SeamlessMode::Mirror => Some(reflect_101(idx, len)),
        SeamlessMode::Replicate => Some(idx.clamp(0, n - 1) as usize),
        SeamlessMode::AlphaPad => None,
    }
}

/// Reflective index without duplicating the edge sample (-1 maps to 1)
fn reflect_101(idx: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let j = idx.rem_euclid(period);
    if j >= len as isize {
        (period - j) as usize
    } else {
        j as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(height: usize, width: usize, channels: usize) -> Array3<f32> {
        Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
            (y * 1000 + x * 10 + c) as f32
        })
    }

    #[test]
    fn test_pad_crop_are_exact_inverses() {
        let img = gradient(20, 24, 3);
        for mode in [
            SeamlessMode::Tile,
            SeamlessMode::Mirror,
            SeamlessMode::Replicate,
            SeamlessMode::AlphaPad,
        ] {
            let padded = pad_seamless(&img, mode);
            assert_eq!(padded.dim(), (52, 56, 3));
            let cropped = crop_seamless(&padded, 1).unwrap();
            assert_eq!(cropped, img, "pad/crop not inverse for {mode}");
        }
    }

    #[test]
    fn test_none_mode_is_identity() {
        let img = gradient(8, 8, 4);
        assert_eq!(pad_seamless(&img, SeamlessMode::None), img);
    }

    #[test]
    fn test_tile_wraps_around() {
        let img = gradient(20, 20, 1);
        let padded = pad_seamless(&img, SeamlessMode::Tile);
        // The pixel at -1 equals the pixel at len-1.
        assert_eq!(
            padded[[SEAMLESS_MARGIN - 1, SEAMLESS_MARGIN, 0]],
            img[[19, 0, 0]]
        );
        assert_eq!(
            padded[[SEAMLESS_MARGIN, SEAMLESS_MARGIN - 1, 0]],
            img[[0, 19, 0]]
        );
    }

    #[test]
    fn test_mirror_does_not_duplicate_edge() {
        let img = gradient(20, 20, 1);
        let padded = pad_seamless(&img, SeamlessMode::Mirror);
        // reflect-101: -1 maps to 1, not 0.
        assert_eq!(padded[[SEAMLESS_MARGIN - 1, SEAMLESS_MARGIN, 0]], img[[1, 0, 0]]);
        assert_eq!(padded[[SEAMLESS_MARGIN - 2, SEAMLESS_MARGIN, 0]], img[[2, 0, 0]]);
    }

    #[test]
    fn test_replicate_repeats_edge() {
        let img = gradient(20, 20, 1);
        let padded = pad_seamless(&img, SeamlessMode::Replicate);
        assert_eq!(padded[[0, SEAMLESS_MARGIN, 0]], img[[0, 0, 0]]);
        assert_eq!(
            padded[[SEAMLESS_MARGIN + 25, SEAMLESS_MARGIN, 0]],
            img[[19, 0, 0]]
        );
    }

    #[test]
    fn test_alpha_pad_border_is_transparent() {
        let img = Array3::from_elem((20, 20, 4), 255.0);
        let padded = pad_seamless(&img, SeamlessMode::AlphaPad);
        for c in 0..4 {
            assert_eq!(padded[[0, 0, c]], 0.0);
            assert_eq!(padded[[51, 51, c]], 0.0);
        }
        assert_eq!(padded[[SEAMLESS_MARGIN, SEAMLESS_MARGIN, 3]], 255.0);
    }

    #[test]
    fn test_crop_accounts_for_scale() {
        // 64x64 padded to 96x96 then upscaled 4x to 384x384 crops to 256x256.
        let upscaled = Array3::<f32>::zeros((384, 384, 3));
        let cropped = crop_seamless(&upscaled, 4).unwrap();
        assert_eq!(cropped.dim(), (256, 256, 3));
    }

    #[test]
    fn test_crop_rejects_undersized_result() {
        let img = Array3::<f32>::zeros((32, 32, 3));
        assert!(crop_seamless(&img, 1).is_err());
    }

    #[test]
    fn test_mirror_on_tiny_image() {
        // Reflection must stay in range even when the margin exceeds the image.
        let img = gradient(3, 3, 1);
        let padded = pad_seamless(&img, SeamlessMode::Mirror);
        assert_eq!(padded.dim(), (35, 35, 1));
        let cropped = crop_seamless(&padded, 1).unwrap();
        assert_eq!(cropped, img);
    }
}
