//! ERGAS (Dimensionless Global Relative Error of Synthesis).
//!
//! Per band, `100 * (h / l) * sqrt(MSE / xbar^2)` where `xbar` is the
//! reference band mean and `h / l` is the assessment-to-reference
//! nominal-scale ratio. The ratio term penalizes larger up-sampling
//! ratios, compensating for the expectation that a greater resolution
//! gain causes greater spectral distortion. Values near zero indicate
//! low distortion.

use crate::engine::{Reducer, ReductionEngine};
use crate::error::{Result, SharpEvalError};
use crate::raster::RasterImage;
use crate::stats::{self, DEGENERATE_EPS};

use super::{mse::band_mse, validate_pair, MetricOptions, MetricResult};

/// Calculate ERGAS between a reference image and an assessment image.
///
/// Inputs must be pre-aligned, as for MSE.
///
/// # Errors
///
/// A reference band with (near-)zero mean makes the relative error
/// undefined and is reported as a degenerate band rather than silently
/// producing infinity.
pub fn calculate_ergas(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &MetricOptions,
) -> Result<MetricResult> {
    validate_pair(reference, assessment)?;
    let mse = band_mse(engine, reference, assessment, options)?;
    let xbar = stats::reduce(engine, reference, Reducer::Mean, &options.reduce_options())?;

    let coefficient = 100.0 * (assessment.nominal_scale() / reference.nominal_scale());

    let mut values = Vec::with_capacity(mse.len());
    for (band, (&mse, &xbar)) in mse.iter().zip(xbar.iter()).enumerate() {
        if xbar.abs() < DEGENERATE_EPS {
            return Err(SharpEvalError::DegenerateBand {
                band: reference.band_names()[band].clone(),
                context: "ERGAS",
                reason: format!("reference band mean {} is too close to zero", xbar),
            });
        }
        values.push((mse / (xbar * xbar)).sqrt() * coefficient);
    }
    Ok(MetricResult::from_band_values(values, options.per_band))
}
