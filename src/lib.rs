//! Pan-Sharpening Quality Assessment Library
//!
//! Quality metrics for image fusion: given a reference multi-band
//! raster and a modified (e.g., pan-sharpened) version of it, this
//! library quantifies the spectral and spatial distortion between them.
//!
//! # Metrics
//!
//! - **MSE**: per-band mean squared error
//! - **PSNR**: peak signal-to-noise ratio in dB
//! - **ERGAS**: relative error weighted by the resolution-gain ratio
//! - **Q**: Wang-Bovik universal image quality index
//!   (correlation x luminance x contrast)
//!
//! Each metric reports either a band average (the default) or one value
//! per band, and reads pixels only through the [`ReductionEngine`]
//! trait, so the bundled eager [`InMemoryEngine`] can be swapped for a
//! tiled or distributed backend without touching metric code.
//!
//! The [`stats`] module carries the raster-algebra utilities used when
//! preparing images for sharpening: band rescaling (range- or
//! moment-matching) and weighted RGB intensity.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sharpeval::{FusionComparator, MetricOptions, RasterImage};
//!
//! let comparator = FusionComparator::new();
//! let report = comparator.compare(&reference, &sharpened)?;
//! println!("{}", report);
//! ```
//!
//! # Alignment
//!
//! MSE, PSNR, and ERGAS assume the two images are already aligned
//! pixel-for-pixel and reject differing grids. Q is the exception: it
//! resamples the reference onto the assessment's grid (bicubic) before
//! computing any statistic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod metrics;
pub mod raster;
pub mod stats;

// Re-export commonly used types
pub use engine::{
    InMemoryEngine, ReduceOptions, Reducer, ReductionEngine, ResampleKind, DEFAULT_MAX_PIXELS,
};
pub use error::{Result, SharpEvalError};
pub use metrics::{
    calculate_ergas, calculate_mse, calculate_psnr, calculate_q, FusionComparator, MetricOptions,
    MetricResult, QualityReport,
};
pub use raster::{Extent, GridSpec, RasterImage, Region};

/// Library version information.
pub mod version {
    /// Library version string.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Library name.
    pub const NAME: &str = env!("CARGO_PKG_NAME");

    /// Get full version string.
    pub fn full_version() -> String {
        format!("{} {}", NAME, VERSION)
    }
}
