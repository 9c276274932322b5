//! Alpha compositing strategies
//!
//! Invoked when the source image carries an alpha channel but the model
//! accepts and returns exactly 3 channels. Each strategy runs the model once
//! or twice on channel recombinations of the RGBA input and recombines the
//! results into an RGBA output. The model-invoking closure executes under
//! the tile splitter's supervision, so a resource exhaustion raised here
//! splits the enclosing tile.

use crate::config::UpscaleConfig;
use crate::error::{Result, UpscaleError};
use ndarray::{s, Array3};

/// Apply an alpha compositing strategy to a normalized RGBA buffer
///
/// `run` invokes the model on a 3-channel buffer in [0, 1] and returns the
/// upscaled 3-channel result.
///
/// # Errors
///
/// Propagates any failure from `run` unmodified, and fails with a processing
/// error when two runs of the model disagree on output dimensions.
pub fn composite<F>(
    img: &Array3<f32>,
    config: &UpscaleConfig,
    run: &mut F,
) -> Result<Array3<f32>>
where
    F: FnMut(&Array3<f32>) -> Result<Array3<f32>>,
{
    use crate::config::AlphaMode;

    let mut output = match config.alpha_mode {
        AlphaMode::None => drop_alpha(img, run)?,
        AlphaMode::BgDifference => bg_difference(img, run)?,
        AlphaMode::Separate => separate(img, run)?,
        AlphaMode::Swapping => swapping(img, run)?,
    };

    if config.binary_alpha || config.ternary_alpha {
        quantize_alpha(&mut output, config);
    }

    Ok(output)
}

/// Drop alpha, run once on RGB, attach a fully-opaque alpha channel
fn drop_alpha<F>(img: &Array3<f32>, run: &mut F) -> Result<Array3<f32>>
where
    F: FnMut(&Array3<f32>) -> Result<Array3<f32>>,
{
    let rgb = img.slice(s![.., .., ..3]).to_owned();
    let out = run(&rgb)?;
    let (height, width, _) = out.dim();

    Ok(Array3::from_shape_fn((height, width, 4), |(y, x, c)| {
        if c < 3 {
            out[[y, x, c]]
        } else {
            1.0
        }
    }))
}

/// Composite against black and white backgrounds and derive alpha from the
/// per-pixel difference of the two results
fn bg_difference<F>(img: &Array3<f32>, run: &mut F) -> Result<Array3<f32>>
where
    F: FnMut(&Array3<f32>) -> Result<Array3<f32>>,
{
    let (height, width, _) = img.dim();

    let black = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        img[[y, x, c]] * img[[y, x, 3]]
    });
    let white = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        (img[[y, x, c]] - 1.0) * img[[y, x, 3]] + 1.0
    });

    let out_black = run(&black)?;
    let out_white = run(&white)?;
    check_consistent(&out_black, &out_white)?;
    let (out_height, out_width, _) = out_black.dim();

    let output = Array3::from_shape_fn((out_height, out_width, 4), |(y, x, c)| {
        if c < 3 {
            out_black[[y, x, c]]
        } else {
            let mut diff = 0.0;
            for ch in 0..3 {
                diff += out_white[[y, x, ch]] - out_black[[y, x, ch]];
            }
            1.0 - diff / 3.0
        }
    });

    Ok(output.mapv(|v| v.clamp(0.0, 1.0)))
}

/// Upscale the alpha channel as its own grayscale image in a second run
fn separate<F>(img: &Array3<f32>, run: &mut F) -> Result<Array3<f32>>
where
    F: FnMut(&Array3<f32>) -> Result<Array3<f32>>,
{
    let (height, width, _) = img.dim();

    let rgb = img.slice(s![.., .., ..3]).to_owned();
    let alpha_gray =
        Array3::from_shape_fn((height, width, 3), |(y, x, _)| img[[y, x, 3]]);

    let out_rgb = run(&rgb)?;
    let out_alpha = run(&alpha_gray)?;
    check_consistent(&out_rgb, &out_alpha)?;
    let (out_height, out_width, _) = out_rgb.dim();

    Ok(Array3::from_shape_fn(
        (out_height, out_width, 4),
        |(y, x, c)| {
            if c < 3 {
                out_rgb[[y, x, c]]
            } else {
                out_alpha[[y, x, 0]]
            }
        },
    ))
}

/// Run on (R,G,B) and (G,B,A), treating alpha as a regular color channel
fn swapping<F>(img: &Array3<f32>, run: &mut F) -> Result<Array3<f32>>
where
    F: FnMut(&Array3<f32>) -> Result<Array3<f32>>,
{
    let (height, width, _) = img.dim();

    let rgb = img.slice(s![.., .., ..3]).to_owned();
    let gba = Array3::from_shape_fn((height, width, 3), |(y, x, c)| img[[y, x, c + 1]]);

    let out_rgb = run(&rgb)?;
    let out_gba = run(&gba)?;
    check_consistent(&out_rgb, &out_gba)?;
    let (out_height, out_width, _) = out_rgb.dim();

    Ok(Array3::from_shape_fn(
        (out_height, out_width, 4),
        |(y, x, c)| {
            if c < 3 {
                out_rgb[[y, x, c]]
            } else {
                out_gba[[y, x, 2]]
            }
        },
    ))
}

/// Quantize the alpha channel of an RGBA buffer
///
/// Binary: below the threshold becomes 0, at or above becomes 1. Ternary:
/// three-way classification around `threshold +- boundary_offset`, with the
/// boundary inclusive on the upper side (a value exactly at the threshold
/// classifies as half-transparent).
pub fn quantize_alpha(img: &mut Array3<f32>, config: &UpscaleConfig) {
    let (height, width, channels) = img.dim();
    if channels < 4 {
        return;
    }

    if config.binary_alpha {
        for y in 0..height {
            for x in 0..width {
                let a = img[[y, x, 3]];
                img[[y, x, 3]] = if a < config.alpha_threshold { 0.0 } else { 1.0 };
            }
        }
    } else if config.ternary_alpha {
        let lower = config.alpha_threshold - config.alpha_boundary_offset;
        let upper = config.alpha_threshold + config.alpha_boundary_offset;
        for y in 0..height {
            for x in 0..width {
                let a = img[[y, x, 3]];
                img[[y, x, 3]] = if a < lower {
                    0.0
                } else if a <= upper {
                    0.5
                } else {
                    1.0
                };
            }
        }
    }
}

fn check_consistent(first: &Array3<f32>, second: &Array3<f32>) -> Result<()> {
    if first.dim() == second.dim() {
        Ok(())
    } else {
        Err(UpscaleError::processing_stage_error(
            "alpha_compositing",
            "model produced inconsistent dimensions across two runs",
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlphaMode;

    /// Pure per-pixel identity model at scale 1
    fn identity(input: &Array3<f32>) -> Result<Array3<f32>> {
        Ok(input.clone())
    }

    fn rgba_test_image() -> Array3<f32> {
        Array3::from_shape_fn((4, 4, 4), |(y, x, c)| match c {
            0 => 0.2,
            1 => 0.5,
            2 => 0.8,
            _ => (y * 4 + x) as f32 / 15.0,
        })
    }

    fn config_with_mode(mode: AlphaMode) -> UpscaleConfig {
        UpscaleConfig::builder().alpha_mode(mode).build().unwrap()
    }

    #[test]
    fn test_none_mode_attaches_full_opacity() {
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::None);
        let out = composite(&img, &config, &mut identity).unwrap();
        assert_eq!(out.dim(), (4, 4, 4));
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(out[[y, x, 3]], 1.0);
                assert_eq!(out[[y, x, 0]], img[[y, x, 0]]);
            }
        }
    }

    #[test]
    fn test_bg_difference_recovers_alpha_for_pure_model() {
        // For an identity model: white - black = 1 - a per channel, so the
        // derived alpha equals the input alpha exactly.
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::BgDifference);
        let out = composite(&img, &config, &mut identity).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert!((out[[y, x, 3]] - img[[y, x, 3]]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_bg_difference_clips_to_unit_range() {
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::BgDifference);
        // A model that overshoots the valid domain.
        let mut overshoot = |input: &Array3<f32>| Ok(input.mapv(|v| v * 1.5 - 0.2));
        let out = composite(&img, &config, &mut overshoot).unwrap();
        for v in &out {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn test_separate_takes_first_channel_of_alpha_run() {
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::Separate);
        let out = composite(&img, &config, &mut identity).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                // The alpha run sees the alpha replicated in channel 0.
                assert_eq!(out[[y, x, 3]], img[[y, x, 3]]);
                assert_eq!(out[[y, x, 1]], img[[y, x, 1]]);
            }
        }
    }

    #[test]
    fn test_swapping_takes_third_channel_of_second_run() {
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::Swapping);
        let out = composite(&img, &config, &mut identity).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                // Second run sees (G,B,A); its channel 2 is the alpha.
                assert_eq!(out[[y, x, 3]], img[[y, x, 3]]);
            }
        }
    }

    #[test]
    fn test_run_count_per_strategy() {
        let img = rgba_test_image();
        for (mode, expected_runs) in [
            (AlphaMode::None, 1),
            (AlphaMode::BgDifference, 2),
            (AlphaMode::Separate, 2),
            (AlphaMode::Swapping, 2),
        ] {
            let mut runs = 0;
            let mut counting = |input: &Array3<f32>| {
                runs += 1;
                identity(input)
            };
            let config = config_with_mode(mode);
            composite(&img, &config, &mut counting).unwrap();
            assert_eq!(runs, expected_runs, "wrong run count for {mode}");
        }
    }

    #[test]
    fn test_resource_exhaustion_propagates() {
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::BgDifference);
        let mut failing = |_: &Array3<f32>| -> Result<Array3<f32>> {
            Err(UpscaleError::resource_exhausted("tile too large"))
        };
        let err = composite(&img, &config, &mut failing).unwrap_err();
        assert!(err.is_resource_exhausted());
    }

    #[test]
    fn test_binary_alpha_threshold_boundaries() {
        let mut img = Array3::zeros((1, 3, 4));
        img[[0, 0, 3]] = 0.49;
        img[[0, 1, 3]] = 0.5;
        img[[0, 2, 3]] = 0.51;
        let config = UpscaleConfig::builder().binary_alpha(true).build().unwrap();
        quantize_alpha(&mut img, &config);
        assert_eq!(img[[0, 0, 3]], 0.0);
        assert_eq!(img[[0, 1, 3]], 1.0); // at threshold: opaque
        assert_eq!(img[[0, 2, 3]], 1.0);
    }

    #[test]
    fn test_ternary_alpha_classification() {
        let mut img = Array3::zeros((1, 5, 4));
        img[[0, 0, 3]] = 0.1; // below lower bound
        img[[0, 1, 3]] = 0.3; // exactly at lower bound
        img[[0, 2, 3]] = 0.5; // exactly at threshold
        img[[0, 3, 3]] = 0.7; // exactly at upper bound (inclusive)
        img[[0, 4, 3]] = 0.9; // above upper bound
        let config = UpscaleConfig::builder()
            .ternary_alpha(true)
            .build()
            .unwrap();
        quantize_alpha(&mut img, &config);
        assert_eq!(img[[0, 0, 3]], 0.0);
        assert_eq!(img[[0, 1, 3]], 0.5);
        assert_eq!(img[[0, 2, 3]], 0.5);
        assert_eq!(img[[0, 3, 3]], 0.5);
        assert_eq!(img[[0, 4, 3]], 1.0);
    }

    #[test]
    fn test_continuous_alpha_kept_without_quantization() {
        let img = rgba_test_image();
        let config = config_with_mode(AlphaMode::Separate);
        let out = composite(&img, &config, &mut identity).unwrap();
        assert!((out[[0, 1, 3]] - 1.0 / 15.0).abs() < 1e-6);
    }
}
