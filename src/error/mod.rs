//! Error types for the pan-sharpening quality assessment library.

use thiserror::Error;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, SharpEvalError>;

/// Main error type for the pan-sharpening quality assessment library.
#[derive(Error, Debug)]
pub enum SharpEvalError {
    /// Reference and assessment images have differing band counts.
    #[error("Band count mismatch: reference has {reference} bands, assessment has {assessment}")]
    BandCountMismatch {
        /// Band count of the reference image.
        reference: usize,
        /// Band count of the assessment image.
        assessment: usize,
    },

    /// A band statistic produced a zero denominator that the metric
    /// cannot interpret (e.g., zero reference mean under ERGAS, a
    /// constant band under Q's correlation, zero range under rescaling).
    #[error("Degenerate band {band:?} in {context}: {reason}")]
    DegenerateBand {
        /// Name of the offending band.
        band: String,
        /// The metric or utility that detected the condition.
        context: &'static str,
        /// What was zero or undefined.
        reason: String,
    },

    /// Image grids or band shapes are unusable (size mismatch, unknown
    /// band name, misaligned extents).
    #[error("Image data error: {0}")]
    ImageData(String),

    /// The reduction engine could not produce a statistic (e.g., an
    /// empty region after geometry intersection).
    #[error("Reduction error: {0}")]
    Reduction(String),

    /// Invalid option values (e.g., non-finite intensity weights).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
