//! Fusion comparator for comprehensive quality analysis.
//!
//! Runs all four metrics over one reference/assessment pair and
//! combines them into a single serializable report.

use serde::Serialize;

use crate::engine::{InMemoryEngine, ReductionEngine};
use crate::error::Result;
use crate::raster::RasterImage;

use super::{calculate_ergas, calculate_mse, calculate_psnr, calculate_q, mean, MetricOptions};

/// Comprehensive quality report combining all four fusion metrics.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    /// Band names of the compared pair (reference order).
    pub band_names: Vec<String>,

    /// Band-averaged MSE.
    pub mse: f64,
    /// Per-band MSE.
    pub mse_bands: Vec<f64>,

    /// Band-averaged PSNR in dB (infinite for identical regions).
    pub psnr_db: f64,
    /// Per-band PSNR in dB.
    pub psnr_bands: Vec<f64>,

    /// Band-averaged ERGAS.
    pub ergas: f64,
    /// Per-band ERGAS.
    pub ergas_bands: Vec<f64>,

    /// Band-averaged universal image quality index.
    pub q: f64,
    /// Per-band universal image quality index.
    pub q_bands: Vec<f64>,
}

impl QualityReport {
    /// Check whether the compared regions were identical.
    pub fn is_lossless(&self) -> bool {
        self.mse_bands.iter().all(|&v| v == 0.0)
    }

    /// Coarse quality rating from the Q index and PSNR.
    pub fn overall_quality(&self) -> &'static str {
        if self.is_lossless() {
            return "Identical";
        }
        if self.q >= 0.98 && self.psnr_db >= 40.0 {
            "Excellent"
        } else if self.q >= 0.95 && self.psnr_db >= 35.0 {
            "Very Good"
        } else if self.q >= 0.90 && self.psnr_db >= 30.0 {
            "Good"
        } else if self.q >= 0.80 {
            "Fair"
        } else {
            "Poor"
        }
    }

    /// Serialize the report to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for QualityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Fusion Quality Report")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Overall: {}", self.overall_quality())?;
        writeln!(f)?;
        writeln!(f, "MSE:   {:.6}", self.mse)?;
        if self.psnr_db.is_infinite() {
            writeln!(f, "PSNR:  Infinity (identical)")?;
        } else {
            writeln!(f, "PSNR:  {:.2} dB", self.psnr_db)?;
        }
        writeln!(f, "ERGAS: {:.4}", self.ergas)?;
        writeln!(f, "Q:     {:.4}", self.q)?;
        writeln!(f)?;
        writeln!(f, "Per band:")?;
        for (i, name) in self.band_names.iter().enumerate() {
            writeln!(
                f,
                "  {:<12} MSE {:>12.6}  PSNR {:>8.2}  ERGAS {:>8.4}  Q {:>7.4}",
                name, self.mse_bands[i], self.psnr_bands[i], self.ergas_bands[i], self.q_bands[i]
            )?;
        }
        Ok(())
    }
}

/// Utility for comparing a reference image against its sharpened (or
/// otherwise modified) counterpart with all four metrics at once.
#[derive(Debug, Clone)]
pub struct FusionComparator<E = InMemoryEngine> {
    engine: E,
    options: MetricOptions,
}

impl Default for FusionComparator<InMemoryEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl FusionComparator<InMemoryEngine> {
    /// Create a comparator backed by the in-memory engine.
    pub fn new() -> Self {
        Self {
            engine: InMemoryEngine::new(),
            options: MetricOptions::default(),
        }
    }
}

impl<E: ReductionEngine> FusionComparator<E> {
    /// Create a comparator over a custom reduction engine.
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            options: MetricOptions::default(),
        }
    }

    /// Set metric options (geometry, scale, sampling cap). The
    /// `per_band` flag is ignored; the report always carries both
    /// shapes.
    pub fn options(mut self, options: MetricOptions) -> Self {
        self.options = options;
        self
    }

    /// Compare two images and produce a full quality report.
    ///
    /// # Errors
    ///
    /// Propagates the first metric failure (band count mismatch,
    /// misaligned grids, degenerate bands, reduction errors).
    pub fn compare(
        &self,
        reference: &RasterImage,
        assessment: &RasterImage,
    ) -> Result<QualityReport> {
        let per_band = MetricOptions {
            per_band: true,
            ..self.options.clone()
        };

        let mse_bands = calculate_mse(&self.engine, reference, assessment, &per_band)?
            .as_per_band()
            .unwrap_or_default()
            .to_vec();
        let psnr_bands = calculate_psnr(&self.engine, reference, assessment, &per_band)?
            .as_per_band()
            .unwrap_or_default()
            .to_vec();
        let ergas_bands = calculate_ergas(&self.engine, reference, assessment, &per_band)?
            .as_per_band()
            .unwrap_or_default()
            .to_vec();
        let q_bands = calculate_q(&self.engine, reference, assessment, &per_band)?
            .as_per_band()
            .unwrap_or_default()
            .to_vec();

        Ok(QualityReport {
            band_names: reference.band_names().to_vec(),
            mse: mean(&mse_bands),
            mse_bands,
            psnr_db: mean(&psnr_bands),
            psnr_bands,
            ergas: mean(&ergas_bands),
            ergas_bands,
            q: mean(&q_bands),
            q_bands,
        })
    }
}
