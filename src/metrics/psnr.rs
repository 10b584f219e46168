//! PSNR (Peak Signal-to-Noise Ratio) in dB.
//!
//! Per band, `20 * log10(g / sqrt(MSE))` where `g` is the band's peak
//! reference value. Larger values mean less distortion; unlike MSE,
//! PSNR is not relative to image intensity (Hagag et al. 2013).
//!
//! A band with `MSE = 0` is a perfect reconstruction and reports
//! `f64::INFINITY`; the band average propagates it. Inputs must be
//! pre-aligned, as for MSE.

use crate::engine::{Reducer, ReductionEngine};
use crate::error::Result;
use crate::raster::RasterImage;
use crate::stats;

use super::{mse::band_mse, validate_pair, MetricOptions, MetricResult};

/// Calculate PSNR between a reference image and an assessment image.
///
/// The aggregate is the arithmetic mean of the per-band dB values, not
/// a PSNR re-derived from an aggregate MSE.
///
/// # Errors
///
/// Fails on differing band counts or grids, or if the reduction fails.
pub fn calculate_psnr(
    engine: &dyn ReductionEngine,
    reference: &RasterImage,
    assessment: &RasterImage,
    options: &MetricOptions,
) -> Result<MetricResult> {
    validate_pair(reference, assessment)?;
    let mse = band_mse(engine, reference, assessment, options)?;
    let peaks = stats::reduce(engine, reference, Reducer::Max, &options.reduce_options())?;

    let values = peaks
        .iter()
        .zip(mse.iter())
        .map(|(&peak, &mse)| {
            if mse == 0.0 {
                f64::INFINITY
            } else {
                20.0 * (peak / mse.sqrt()).log10()
            }
        })
        .collect();
    Ok(MetricResult::from_band_values(values, options.per_band))
}
