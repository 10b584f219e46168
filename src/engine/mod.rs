//! Region reduction engine.
//!
//! Everything that touches raw pixels lives behind [`ReductionEngine`]:
//! per-band statistical reductions over a region, and grid resampling.
//! The metric layer only ever sees per-band scalar vectors, so a
//! distributed or tiled backend can replace [`InMemoryEngine`] without
//! touching any metric code.

mod resample;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SharpEvalError};
use crate::raster::{GridSpec, RasterImage, Region};

/// Default cap on the number of pixels sampled per reduction.
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000_000;

/// Statistical reduction applied per band.
///
/// `StdDev` and `Variance` are population-form (no Bessel correction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reducer {
    /// Arithmetic mean.
    Mean,
    /// Population standard deviation.
    StdDev,
    /// Population variance.
    Variance,
    /// Minimum sample value.
    Min,
    /// Maximum sample value.
    Max,
    /// Sum of sample values.
    Sum,
}

/// Interpolation used when resampling onto a target grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResampleKind {
    /// Nearest-neighbor lookup.
    Nearest,
    /// Bilinear interpolation.
    Bilinear,
    /// Catmull-Rom bicubic interpolation.
    #[default]
    Bicubic,
}

/// Options for a region reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceOptions {
    /// Region to reduce over. Defaults to the image's own extent.
    pub geometry: Option<Region>,
    /// Sampling resolution override, in map units. Defaults to the
    /// image's native resolution.
    pub scale: Option<f64>,
    /// Maximum number of pixels to sample per band. When the region
    /// holds more, sampling is thinned to stay under the cap.
    pub max_pixels: u64,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            geometry: None,
            scale: None,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl ReduceOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the reduction to a region.
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
}

/// The sole pixel-touching capability the metrics consume.
pub trait ReductionEngine {
    /// Reduce every band of `image` to one scalar. Output order matches
    /// the image's band order.
    fn reduce(
        &self,
        image: &RasterImage,
        reducer: Reducer,
        options: &ReduceOptions,
    ) -> Result<Vec<f64>>;

    /// Resample `image` onto `target`'s grid. CRS labels must match;
    /// real reprojection is out of scope for this engine.
    fn resample(
        &self,
        image: &RasterImage,
        kind: ResampleKind,
        target: &GridSpec,
    ) -> Result<RasterImage>;
}

/// Eager, in-process engine over materialized band grids. Band
/// reductions run in parallel; nothing is cached between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryEngine;

impl InMemoryEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }
}

/// Inclusive-exclusive pixel window plus sampling stride.
struct SampleWindow {
    row_start: usize,
    row_end: usize,
    col_start: usize,
    col_end: usize,
    step: usize,
}

impl SampleWindow {
    fn sampled(range: (usize, usize), step: usize) -> usize {
        (range.1 - range.0).div_ceil(step)
    }

    fn count(&self) -> usize {
        Self::sampled((self.row_start, self.row_end), self.step)
            * Self::sampled((self.col_start, self.col_end), self.step)
    }
}

/// Resolve geometry, scale, and the pixel cap into a concrete window.
fn sample_window(image: &RasterImage, options: &ReduceOptions) -> Result<SampleWindow> {
    if options.max_pixels == 0 {
        return Err(SharpEvalError::Config("max_pixels must be positive".into()));
    }

    let extent = image.extent();
    let window = match options.geometry {
        Some(region) => extent.intersect(&region).ok_or_else(|| {
            SharpEvalError::Reduction(format!(
                "geometry {:?} does not intersect image extent {:?}",
                region, extent
            ))
        })?,
        None => extent,
    };

    let (pw, ph) = image.pixel_size();
    let col_start = ((window.x_min - extent.x_min) / pw).floor().max(0.0) as usize;
    let col_end = (((window.x_max - extent.x_min) / pw).ceil() as usize).min(image.width());
    let row_start = ((extent.y_max - window.y_max) / ph).floor().max(0.0) as usize;
    let row_end = (((extent.y_max - window.y_min) / ph).ceil() as usize).min(image.height());
    if col_start >= col_end || row_start >= row_end {
        return Err(SharpEvalError::Reduction(
            "geometry intersection covers no whole pixel".into(),
        ));
    }

    let mut step = match options.scale {
        Some(scale) => {
            if scale <= 0.0 || !scale.is_finite() {
                return Err(SharpEvalError::Config(format!(
                    "sampling scale must be positive, got {}",
                    scale
                )));
            }
            ((scale / image.nominal_scale()).round() as usize).max(1)
        }
        None => 1,
    };

    let mut window = SampleWindow {
        row_start,
        row_end,
        col_start,
        col_end,
        step,
    };
    let count = window.count() as u64;
    if count > options.max_pixels {
        let widen = ((count as f64 / options.max_pixels as f64).sqrt()).ceil() as usize;
        step *= widen.max(2);
        log::warn!(
            "reduction window of {} pixels exceeds max_pixels={}; thinning stride to {}",
            count,
            options.max_pixels,
            step
        );
        window.step = step;
    }
    Ok(window)
}

/// One-pass accumulator over a sampled window.
struct Accumulator {
    n: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

fn accumulate(data: &[f64], width: usize, window: &SampleWindow) -> Accumulator {
    let mut acc = Accumulator {
        n: 0,
        sum: 0.0,
        sum_sq: 0.0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };
    for row in (window.row_start..window.row_end).step_by(window.step) {
        for col in (window.col_start..window.col_end).step_by(window.step) {
            let v = data[row * width + col];
            acc.n += 1;
            acc.sum += v;
            acc.sum_sq += v * v;
            acc.min = acc.min.min(v);
            acc.max = acc.max.max(v);
        }
    }
    acc
}

impl Accumulator {
    fn finish(&self, reducer: Reducer) -> f64 {
        let n = self.n as f64;
        match reducer {
            Reducer::Mean => self.sum / n,
            Reducer::Sum => self.sum,
            Reducer::Min => self.min,
            Reducer::Max => self.max,
            Reducer::Variance | Reducer::StdDev => {
                let mean = self.sum / n;
                let variance = (self.sum_sq / n - mean * mean).max(0.0);
                if reducer == Reducer::Variance {
                    variance
                } else {
                    variance.sqrt()
                }
            }
        }
    }
}

impl ReductionEngine for InMemoryEngine {
    fn reduce(
        &self,
        image: &RasterImage,
        reducer: Reducer,
        options: &ReduceOptions,
    ) -> Result<Vec<f64>> {
        let window = sample_window(image, options)?;
        if window.count() == 0 {
            return Err(SharpEvalError::Reduction(
                "no pixels sampled in reduction window".into(),
            ));
        }
        log::debug!(
            "reducing {} band(s) with {:?} over {} sampled pixel(s)",
            image.band_count(),
            reducer,
            window.count()
        );
        let values = (0..image.band_count())
            .into_par_iter()
            .map(|b| accumulate(image.band(b), image.width(), &window).finish(reducer))
            .collect();
        Ok(values)
    }

    fn resample(
        &self,
        image: &RasterImage,
        kind: ResampleKind,
        target: &GridSpec,
    ) -> Result<RasterImage> {
        resample::resample_grid(image, kind, target)
    }
}
