//! Q, the Wang-Bovik universal image quality index (Wang and Bovik 2002).
//!
//! Per band, the product of three components:
//!
//! - correlation: Pearson correlation between reference and assessment
//!   (population form, computed through region sums)
//! - luminance: `2*xbar*ybar / (xbar^2 + ybar^2)`, 1.0 for equal means
//! - contrast: `2*sx*sy / (sx^2 + sy^2)`, 1.0 for equal stddevs
//!
//! `Q = 1` indicates identical images. This is the one metric that
//! aligns its inputs itself: the reference is bicubically resampled
//! onto the assessment's grid before any statistic is computed.
//!
//! Degeneracy policy: a 0/0 where both bands are identically degenerate
//! (both constant, or both zero-mean) resolves to the component's
//! identity value 1.0, keeping `Q(I, I) = 1` exact; a one-sided
//! degenerate denominator is an error naming the band.

use crate::engine::{ReduceOptions, Reducer, ResampleKind, ReductionEngine};
use crate::error::{Result, SharpEvalError};
use crate::raster::RasterImage;
use crate::stats::{self, broadcast_constant, DEGENERATE_EPS};

use super::{validate_pair, MetricOptions, MetricResult};

/// Calculate the universal image quality index between a reference
/// image and an assessment image.
///
/// # Errors
///
/// Fails on differing band counts, on CRS label mismatch (the internal
/// resampling cannot reproject), or when exactly one of a band pair is
/// constant, which leaves the correlation undefined.
pub fn calculate_q(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &MetricOptions,
) -> Result<MetricResult> {
    validate_pair(reference, assessment)?;

    // Align the reference to the assessment grid and origin.
    let reference = engine.resample(reference, ResampleKind::Bicubic, &assessment.grid_spec())?;
    let reduce = options.reduce_options();

    let correlation = correlation(engine, &reference, assessment, &reduce)?;
    let luminance = luminance(engine, &reference, assessment, &reduce)?;
    let contrast = contrast(engine, &reference, assessment, &reduce)?;

    let values = correlation
        .iter()
        .zip(luminance.iter())
        .zip(contrast.iter())
        .map(|((&r, &l), &c)| r * l * c)
        .collect();
    Ok(MetricResult::from_band_values(values, options.per_band))
}

/// Per-band Pearson correlation via centered region sums.
fn correlation(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &ReduceOptions,
) -> Result<Vec<f64>> {
    let xbar = stats::reduce(engine, reference, Reducer::Mean, options)?;
    let ybar = stats::reduce(engine, assessment, Reducer::Mean, options)?;

    let x_centered = reference.subtract(&broadcast_constant(reference, &xbar)?)?;
    let y_centered = assessment.subtract(&broadcast_constant(assessment, &ybar)?)?;

    let numerator = stats::reduce(
        engine,
        &x_centered.multiply(&y_centered)?,
        Reducer::Sum,
        options,
    )?;
    let x_sum = stats::reduce(engine, &x_centered.powi(2), Reducer::Sum, options)?;
    let y_sum = stats::reduce(engine, &y_centered.powi(2), Reducer::Sum, options)?;

    let mut values = Vec::with_capacity(numerator.len());
    for (band, &num) in numerator.iter().enumerate() {
        let denominator = (x_sum[band] * y_sum[band]).sqrt();
        if denominator < DEGENERATE_EPS {
            let x_flat = x_sum[band] < DEGENERATE_EPS;
            let y_flat = y_sum[band] < DEGENERATE_EPS;
            if x_flat && y_flat {
                // Both bands constant: identical degeneracy, identity value.
                values.push(1.0);
                continue;
            }
            return Err(SharpEvalError::DegenerateBand {
                band: reference.band_names()[band].clone(),
                context: "Q correlation",
                reason: format!(
                    "{} band is constant, correlation is undefined",
                    if x_flat { "reference" } else { "assessment" }
                ),
            });
        }
        values.push(num / denominator);
    }
    Ok(values)
}

/// Per-band luminance closeness of means.
fn luminance(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &ReduceOptions,
) -> Result<Vec<f64>> {
    let xbar = stats::reduce(engine, reference, Reducer::Mean, options)?;
    let ybar = stats::reduce(engine, assessment, Reducer::Mean, options)?;

    Ok(xbar
        .iter()
        .zip(ybar.iter())
        .map(|(&x, &y)| {
            let denominator = x * x + y * y;
            if denominator < DEGENERATE_EPS {
                // Both means zero: equal, so the component is exact 1.
                1.0
            } else {
                2.0 * x * y / denominator
            }
        })
        .collect())
}

/// Per-band contrast closeness of standard deviations.
fn contrast(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &ReduceOptions,
) -> Result<Vec<f64>> {
    let x_stddev = stats::reduce(engine, reference, Reducer::StdDev, options)?;
    let y_stddev = stats::reduce(engine, assessment, Reducer::StdDev, options)?;
    let x_variance = stats::reduce(engine, reference, Reducer::Variance, options)?;
    let y_variance = stats::reduce(engine, assessment, Reducer::Variance, options)?;

    Ok((0..x_stddev.len())
        .map(|band| {
            let denominator = x_variance[band] + y_variance[band];
            if denominator < DEGENERATE_EPS {
                // Both bands constant: equal stddevs, identity value.
                1.0
            } else {
                2.0 * x_stddev[band] * y_stddev[band] / denominator
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use crate::raster::Extent;

    fn extent() -> Extent {
        Extent::new(0.0, 0.0, 40.0, 40.0)
    }

    fn image(names: &[&str], bands: Vec<Vec<f64>>) -> RasterImage {
        RasterImage::new(
            names.iter().map(|n| n.to_string()).collect(),
            bands,
            4,
            4,
            extent(),
            10.0,
        )
        .unwrap()
    }

    fn gradient() -> Vec<f64> {
        (0..16).map(|v| v as f64).collect()
    }

    #[test]
    fn test_q_identity_on_constant_bands() {
        // Identical 3-band constant image: Q must be exactly 1 per band.
        let engine = InMemoryEngine::new();
        let img = image(
            &["red", "green", "blue"],
            vec![vec![10.0; 16], vec![20.0; 16], vec![30.0; 16]],
        );
        let per_band = calculate_q(&engine, &img, &img, &MetricOptions::new().per_band()).unwrap();
        assert_eq!(per_band.as_per_band(), Some(&[1.0, 1.0, 1.0][..]));
        let aggregate = calculate_q(&engine, &img, &img, &MetricOptions::default()).unwrap();
        assert_eq!(aggregate.as_aggregate(), Some(1.0));
    }

    #[test]
    fn test_q_identity_on_varying_band() {
        let engine = InMemoryEngine::new();
        let img = image(&["pan"], vec![gradient()]);
        let q = calculate_q(&engine, &img, &img, &MetricOptions::default())
            .unwrap()
            .as_aggregate()
            .unwrap();
        assert!((q - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_q_components_in_range() {
        let engine = InMemoryEngine::new();
        let reference = image(&["pan"], vec![gradient()]);
        let assessment = image(
            &["pan"],
            vec![gradient().iter().map(|v| v * 1.1 + 2.0).collect()],
        );
        let q = calculate_q(&engine, &reference, &assessment, &MetricOptions::default())
            .unwrap()
            .as_aggregate()
            .unwrap();
        assert!(q > 0.0 && q < 1.0);
    }

    #[test]
    fn test_q_anticorrelated_is_negative() {
        let engine = InMemoryEngine::new();
        let reference = image(&["pan"], vec![gradient()]);
        let reversed: Vec<f64> = gradient().into_iter().rev().collect();
        let assessment = image(&["pan"], vec![reversed]);
        let q = calculate_q(&engine, &reference, &assessment, &MetricOptions::default())
            .unwrap()
            .as_aggregate()
            .unwrap();
        assert!(q < 0.0);
    }

    #[test]
    fn test_correlation_scale_invariance() {
        // Scaling one image changes luminance and contrast but not the
        // correlation component.
        let engine = InMemoryEngine::new();
        let reference = image(&["pan"], vec![gradient()]);
        let assessment = image(&["pan"], vec![gradient().iter().map(|v| v + 1.0).collect()]);
        let scaled = image(
            &["pan"],
            vec![gradient().iter().map(|v| (v + 1.0) * 3.0).collect()],
        );
        let options = ReduceOptions::default();
        let plain = correlation(&engine, &reference, &assessment, &options).unwrap();
        let stretched = correlation(&engine, &reference, &scaled, &options).unwrap();
        assert!((plain[0] - stretched[0]).abs() < 1e-9);

        let lum_plain = luminance(&engine, &reference, &assessment, &options).unwrap();
        let lum_stretched = luminance(&engine, &reference, &scaled, &options).unwrap();
        assert!((lum_plain[0] - lum_stretched[0]).abs() > 1e-6);

        let con_plain = contrast(&engine, &reference, &assessment, &options).unwrap();
        let con_stretched = contrast(&engine, &reference, &scaled, &options).unwrap();
        assert!((con_plain[0] - con_stretched[0]).abs() > 1e-6);
    }

    #[test]
    fn test_q_symmetric_components() {
        let engine = InMemoryEngine::new();
        let a = image(&["pan"], vec![gradient()]);
        let b = image(&["pan"], vec![gradient().iter().map(|v| v * 2.0).collect()]);
        let options = ReduceOptions::default();
        let ab = correlation(&engine, &a, &b, &options).unwrap();
        let ba = correlation(&engine, &b, &a, &options).unwrap();
        assert!((ab[0] - ba[0]).abs() < 1e-12);
        let lum_ab = luminance(&engine, &a, &b, &options).unwrap();
        let lum_ba = luminance(&engine, &b, &a, &options).unwrap();
        assert!((lum_ab[0] - lum_ba[0]).abs() < 1e-12);
        let con_ab = contrast(&engine, &a, &b, &options).unwrap();
        let con_ba = contrast(&engine, &b, &a, &options).unwrap();
        assert!((con_ab[0] - con_ba[0]).abs() < 1e-12);
    }

    #[test]
    fn test_q_one_sided_constant_band_flagged() {
        let engine = InMemoryEngine::new();
        let reference = image(&["pan"], vec![vec![5.0; 16]]);
        let assessment = image(&["pan"], vec![gradient()]);
        let err =
            calculate_q(&engine, &reference, &assessment, &MetricOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SharpEvalError::DegenerateBand { context: "Q correlation", .. }
        ));
    }

    #[test]
    fn test_q_resamples_coarser_reference() {
        // Reference at half the assessment resolution: Q aligns it
        // internally and still reports a near-perfect score for a
        // matching smooth ramp.
        let engine = InMemoryEngine::new();
        let coarse: Vec<f64> = (0..4)
            .flat_map(|r| (0..4).map(move |c| (r * 2) as f64 + (c * 2) as f64))
            .collect();
        let reference =
            RasterImage::new(vec!["pan".into()], vec![coarse], 4, 4, extent(), 10.0).unwrap();
        let fine: Vec<f64> = (0..8)
            .flat_map(|r| {
                (0..8).map(move |c| (r as f64 - 0.5).max(0.0) + (c as f64 - 0.5).max(0.0))
            })
            .collect();
        let assessment =
            RasterImage::new(vec!["pan".into()], vec![fine], 8, 8, extent(), 5.0).unwrap();
        let q = calculate_q(&engine, &reference, &assessment, &MetricOptions::default())
            .unwrap()
            .as_aggregate()
            .unwrap();
        assert!(q > 0.9, "q = {}", q);
    }

    #[test]
    fn test_q_rejects_band_count_mismatch() {
        let engine = InMemoryEngine::new();
        let a = image(&["red", "nir"], vec![gradient(), gradient()]);
        let b = image(&["red"], vec![gradient()]);
        assert!(calculate_q(&engine, &a, &b, &MetricOptions::default()).is_err());
    }
}
