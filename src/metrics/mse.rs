//! MSE (Mean Squared Error) between a reference and assessment image.
//!
//! Per band, the mean of the squared per-pixel difference over the
//! region. MSE is relative to image intensity; see Hagag et al. 2013,
//! equation 5.
//!
//! Inputs must already be pixel-aligned: this metric performs no
//! resampling, and images on differing grids are rejected.

use crate::engine::{Reducer, ReductionEngine};
use crate::error::Result;
use crate::raster::RasterImage;
use crate::stats;

use super::{validate_pair, MetricOptions, MetricResult};

/// Calculate MSE between a reference image and an assessment image.
///
/// Returns the band average, or one value per band with
/// [`MetricOptions::per_band`]. `MSE = 0` means the sampled regions are
/// identical.
///
/// # Errors
///
/// Fails on differing band counts or grids, or if the reduction fails.
pub fn calculate_mse(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &MetricOptions,
) -> Result<MetricResult> {
    let values = band_mse(engine, reference, assessment, options)?;
    Ok(MetricResult::from_band_values(values, options.per_band))
}

/// Per-band MSE vector. PSNR and ERGAS compose on this.
pub(crate) fn band_mse(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &MetricOptions,
) -> Result<Vec<f64>> {
    validate_pair(reference, assessment)?;
    let squared_error = reference.subtract(assessment)?.powi(2);
    stats::reduce(
        engine,
        &squared_error,
        Reducer::Mean,
        &options.reduce_options(),
    )
}
