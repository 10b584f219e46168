//! Fusion quality metrics for comparing a reference image against a
//! pan-sharpened (or otherwise modified) assessment image:
//!
//! - **MSE**: per-band mean squared error
//! - **PSNR**: peak signal-to-noise ratio in dB, built on MSE
//! - **ERGAS**: resolution-ratio-weighted relative error
//! - **Q**: Wang-Bovik universal image quality index
//!
//! All four share the same calling convention: reference first,
//! assessment second, a [`MetricOptions`] choosing per-band or
//! band-averaged output, and a [`MetricResult`] back.
//!
//! # Example
//!
//! ```rust,ignore
//! use sharpeval::{calculate_psnr, InMemoryEngine, MetricOptions};
//!
//! let engine = InMemoryEngine::new();
//! let psnr = calculate_psnr(&engine, &reference, &sharpened, &MetricOptions::default())?;
//! println!("PSNR: {:.2} dB", psnr.as_aggregate().unwrap());
//! ```

mod ergas;
mod mse;
mod psnr;
mod q;
mod report;

pub use ergas::calculate_ergas;
pub use mse::calculate_mse;
pub use psnr::calculate_psnr;
pub use q::calculate_q;
pub use report::{FusionComparator, QualityReport};

use serde::{Deserialize, Serialize};

use crate::engine::{ReduceOptions, DEFAULT_MAX_PIXELS};
use crate::error::{Result, SharpEvalError};
use crate::raster::{RasterImage, Region};

/// Options shared by all four metrics.
///
/// Defaults: band-averaged output, the image's own extent, native
/// resolution, and a large sampling cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricOptions {
    /// Return one value per band instead of the band average.
    pub per_band: bool,
    /// Region to compute statistics over. Defaults to the image extent.
    pub geometry: Option<Region>,
    /// Sampling resolution override, in map units.
    pub scale: Option<f64>,
    /// Maximum number of pixels sampled per reduction.
    pub max_pixels: u64,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            per_band: false,
            geometry: None,
            scale: None,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl MetricOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request per-band output.
    pub fn per_band(mut self) -> Self {
        self.per_band = true;
        self
    }

    /// Restrict statistics to a region.
    pub fn geometry(mut self, region: Region) -> Self {
        self.geometry = Some(region);
        self
    }

    /// Override the sampling resolution.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Cap the number of sampled pixels.
    pub fn max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub(crate) fn reduce_options(&self) -> ReduceOptions {
        ReduceOptions {
            geometry: self.geometry,
            scale: self.scale,
            max_pixels: self.max_pixels,
        }
    }
}

/// A metric outcome: one scalar per band, or their arithmetic mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricResult {
    /// Band-averaged scalar.
    Aggregate(f64),
    /// One value per band, in band order.
    PerBand(Vec<f64>),
}

impl MetricResult {
    /// Fold per-band values into the requested shape. The aggregate is
    /// the arithmetic mean; IEEE non-finite band values propagate
    /// through it.
    pub(crate) fn from_band_values(values: Vec<f64>, per_band: bool) -> Self {
        if per_band {
            MetricResult::PerBand(values)
        } else {
            MetricResult::Aggregate(mean(&values))
        }
    }

    /// The band-averaged scalar, if this is an aggregate result.
    pub fn as_aggregate(&self) -> Option<f64> {
        match self {
            MetricResult::Aggregate(v) => Some(*v),
            MetricResult::PerBand(_) => None,
        }
    }

    /// The per-band values, if this is a per-band result.
    pub fn as_per_band(&self) -> Option<&[f64]> {
        match self {
            MetricResult::Aggregate(_) => None,
            MetricResult::PerBand(values) => Some(values),
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Reject pairs the metrics cannot compare before any reduction runs.
pub(crate) fn validate_pair(reference: &RasterImage, assessment: &RasterImage) -> Result<()> {
    if reference.band_count() != assessment.band_count() {
        return Err(SharpEvalError::BandCountMismatch {
            reference: reference.band_count(),
            assessment: assessment.band_count(),
        });
    }
    Ok(())
}
