//! Statistical and band-algebra utilities shared by the metrics and the
//! sharpening preparation steps: reductions, range, constant broadcast,
//! band rescaling, and weighted intensity.

use crate::engine::{ReduceOptions, Reducer, ReductionEngine};
use crate::error::{Result, SharpEvalError};
use crate::raster::RasterImage;

/// Denominator magnitude below which a band statistic is treated as zero.
pub(crate) const DEGENERATE_EPS: f64 = 1e-12;

/// Reduce every band of `image` to one scalar, band order preserved.
pub fn reduce(
    engine: &dyn ReductionEngine,
    image: &RasterImage,
    reducer: Reducer,
    options: &ReduceOptions,
) -> Result<Vec<f64>> {
    engine.reduce(image, reducer, options)
}

/// Per-band value range, `max - min`.
pub fn range(
    engine: &dyn ReductionEngine,
    image: &RasterImage,
    options: &ReduceOptions,
) -> Result<Vec<f64>> {
    let max = engine.reduce(image, Reducer::Max, options)?;
    let min = engine.reduce(image, Reducer::Min, options)?;
    Ok(max.iter().zip(min.iter()).map(|(hi, lo)| hi - lo).collect())
}

/// Build an image on `template`'s grid and band names where every pixel
/// of band `i` equals `values[i]`. Turns a per-band scalar vector back
/// into an image-algebra operand (e.g., for centering).
pub fn broadcast_constant(template: &RasterImage, values: &[f64]) -> Result<RasterImage> {
    if values.len() != template.band_count() {
        return Err(SharpEvalError::ImageData(format!(
            "{} constant value(s) for {} band(s)",
            values.len(),
            template.band_count()
        )));
    }
    let samples = template.width() * template.height();
    let bands = values.iter().map(|&v| vec![v; samples]).collect();
    RasterImage::new(
        template.band_names().to_vec(),
        bands,
        template.width(),
        template.height(),
        template.extent(),
        template.nominal_scale(),
    )
    .map(|img| img.with_crs(template.crs().to_string()))
}

fn single_band_name(image: &RasterImage, role: &str) -> Result<String> {
    if image.band_count() != 1 {
        return Err(SharpEvalError::ImageData(format!(
            "{} must be single-band, got {} bands",
            role,
            image.band_count()
        )));
    }
    Ok(image.band_names()[0].clone())
}

/// Rescale a single-band image toward a reference band.
///
/// With `match_moments == false` the target's min/range are linearly
/// aligned to the reference's; with `true` its mean/stddev are matched
/// instead (z-score style). Adapted from the SAGA GIS pan-sharpening
/// rescaling. A constant target band (zero range or stddev) cannot be
/// rescaled and is reported as a degenerate band.
pub fn rescale_band(
    engine: &dyn ReductionEngine,
    target: &RasterImage,
    reference: &RasterImage,
    match_moments: bool,
) -> Result<RasterImage> {
    let target_name = single_band_name(target, "rescale target")?;
    single_band_name(reference, "rescale reference")?;
    let options = ReduceOptions::default();

    let (offset_target, offset, scale) = if match_moments {
        let target_stddev = engine.reduce(target, Reducer::StdDev, &options)?[0];
        if target_stddev.abs() < DEGENERATE_EPS {
            return Err(SharpEvalError::DegenerateBand {
                band: target_name,
                context: "rescale_band",
                reason: "target band has zero standard deviation".into(),
            });
        }
        let offset_target = engine.reduce(target, Reducer::Mean, &options)?[0];
        let offset = engine.reduce(reference, Reducer::Mean, &options)?[0];
        let reference_stddev = engine.reduce(reference, Reducer::StdDev, &options)?[0];
        (offset_target, offset, reference_stddev / target_stddev)
    } else {
        let target_range = range(engine, target, &options)?[0];
        if target_range.abs() < DEGENERATE_EPS {
            return Err(SharpEvalError::DegenerateBand {
                band: target_name,
                context: "rescale_band",
                reason: "target band has zero value range".into(),
            });
        }
        let offset_target = engine.reduce(target, Reducer::Min, &options)?[0];
        let offset = engine.reduce(reference, Reducer::Min, &options)?[0];
        let reference_range = range(engine, reference, &options)?[0];
        (offset_target, offset, reference_range / target_range)
    };

    let centered = target.subtract(&broadcast_constant(target, &[offset_target])?)?;
    let scaled = centered.multiply(&broadcast_constant(target, &[scale])?)?;
    scaled.add(&broadcast_constant(target, &[offset])?)
}

/// Weighted single-band intensity from the red, green, and blue bands:
/// `w_red * R + w_green * G + w_blue * B`.
///
/// Weights are used as given; they are neither normalized nor defaulted
/// here, and non-finite weights are rejected rather than coerced.
pub fn weighted_intensity(
    image: &RasterImage,
    red_band: &str,
    green_band: &str,
    blue_band: &str,
    w_red: f64,
    w_green: f64,
    w_blue: f64,
) -> Result<RasterImage> {
    for (name, weight) in [("red", w_red), ("green", w_green), ("blue", w_blue)] {
        if !weight.is_finite() {
            return Err(SharpEvalError::Config(format!(
                "{} weight must be finite, got {}",
                name, weight
            )));
        }
    }
    let red = image.band_by_name(red_band)?;
    let green = image.band_by_name(green_band)?;
    let blue = image.band_by_name(blue_band)?;

    let intensity: Vec<f64> = red
        .iter()
        .zip(green.iter())
        .zip(blue.iter())
        .map(|((&r, &g), &b)| w_red * r + w_green * g + w_blue * b)
        .collect();

    RasterImage::new(
        vec!["intensity".into()],
        vec![intensity],
        image.width(),
        image.height(),
        image.extent(),
        image.nominal_scale(),
    )
    .map(|img| img.with_crs(image.crs().to_string()))
}
