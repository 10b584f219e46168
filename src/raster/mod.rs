//! In-memory multi-band raster model and the band algebra the metrics
//! are built from.
//!
//! A [`RasterImage`] is an ordered set of named bands sharing one grid,
//! plus the metadata the metrics care about: a rectangular [`Extent`] in
//! map coordinates, a nominal ground-sample resolution (`scale`), and a
//! CRS label. Images are immutable; every algebra operation produces a
//! new image.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SharpEvalError};

/// Axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum x (west edge).
    pub x_min: f64,
    /// Minimum y (south edge).
    pub y_min: f64,
    /// Maximum x (east edge).
    pub x_max: f64,
    /// Maximum y (north edge).
    pub y_max: f64,
}

/// A region of interest is just a rectangular extent at this layer.
pub type Region = Extent;

impl Extent {
    /// Create an extent from its corner coordinates.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Width in map units.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height in map units.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Intersection with another extent, or `None` if they do not overlap.
    pub fn intersect(&self, other: &Extent) -> Option<Extent> {
        let x_min = self.x_min.max(other.x_min);
        let y_min = self.y_min.max(other.y_min);
        let x_max = self.x_max.min(other.x_max);
        let y_max = self.y_max.min(other.y_max);
        if x_min < x_max && y_min < y_max {
            Some(Extent::new(x_min, y_min, x_max, y_max))
        } else {
            None
        }
    }
}

/// Target grid for resampling: dimensions, placement, and resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Grid width in pixels.
    pub width: usize,
    /// Grid height in pixels.
    pub height: usize,
    /// Extent covered by the grid.
    pub extent: Extent,
    /// Nominal ground-sample resolution.
    pub scale: f64,
    /// CRS label (metadata only; no reprojection math is performed).
    pub crs: String,
}

/// An ordered mapping from band name to a 2D sample grid, with spatial
/// metadata. Band identity for the metrics is positional; names exist
/// for selection and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    band_names: Vec<String>,
    bands: Vec<Vec<f64>>,
    width: usize,
    height: usize,
    extent: Extent,
    scale: f64,
    crs: String,
}

impl RasterImage {
    /// Build an image from named band grids.
    ///
    /// Each grid is row-major `width * height` samples; row 0 is the
    /// north edge of the extent. Fails if the name and band counts
    /// differ, any grid has the wrong length, or the grid is empty.
    pub fn new(
        band_names: Vec<String>,
        bands: Vec<Vec<f64>>,
        width: usize,
        height: usize,
        extent: Extent,
        scale: f64,
    ) -> Result<Self> {
        if band_names.len() != bands.len() {
            return Err(SharpEvalError::ImageData(format!(
                "{} band names for {} bands",
                band_names.len(),
                bands.len()
            )));
        }
        if bands.is_empty() {
            return Err(SharpEvalError::ImageData("image has no bands".into()));
        }
        if width == 0 || height == 0 {
            return Err(SharpEvalError::ImageData(format!(
                "empty grid: {}x{}",
                width, height
            )));
        }
        if scale <= 0.0 || !scale.is_finite() {
            return Err(SharpEvalError::ImageData(format!(
                "nominal scale must be positive, got {}",
                scale
            )));
        }
        let expected = width * height;
        for (name, band) in band_names.iter().zip(bands.iter()) {
            if band.len() != expected {
                return Err(SharpEvalError::ImageData(format!(
                    "band {:?} has {} samples, expected {}",
                    name,
                    band.len(),
                    expected
                )));
            }
        }
        Ok(Self {
            band_names,
            bands,
            width,
            height,
            extent,
            scale,
            crs: "EPSG:4326".into(),
        })
    }

    /// Replace the CRS label.
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Ordered band names.
    pub fn band_names(&self) -> &[String] {
        &self.band_names
    }

    /// Samples of band `index`, row-major.
    pub fn band(&self, index: usize) -> &[f64] {
        &self.bands[index]
    }

    /// Samples of the band with the given name.
    pub fn band_by_name(&self, name: &str) -> Result<&[f64]> {
        let index = self
            .band_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| {
                SharpEvalError::ImageData(format!("no band named {:?}", name))
            })?;
        Ok(&self.bands[index])
    }

    /// Grid width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Extent in map coordinates.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Nominal ground-sample resolution.
    pub fn nominal_scale(&self) -> f64 {
        self.scale
    }

    /// CRS label.
    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Pixel size in map units, `(x, y)`.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.extent.width() / self.width as f64,
            self.extent.height() / self.height as f64,
        )
    }

    /// The image's own grid, as a resampling target.
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec {
            width: self.width,
            height: self.height,
            extent: self.extent,
            scale: self.scale,
            crs: self.crs.clone(),
        }
    }

    /// Select a subset of bands by name, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<RasterImage> {
        let mut band_names = Vec::with_capacity(names.len());
        let mut bands = Vec::with_capacity(names.len());
        for name in names {
            bands.push(self.band_by_name(name)?.to_vec());
            band_names.push((*name).to_string());
        }
        RasterImage::new(
            band_names,
            bands,
            self.width,
            self.height,
            self.extent,
            self.scale,
        )
        .map(|img| img.with_crs(self.crs.clone()))
    }

    /// Apply `f` to every sample of every band.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> RasterImage {
        let bands = self
            .bands
            .iter()
            .map(|band| band.iter().map(|&v| f(v)).collect())
            .collect();
        Self {
            band_names: self.band_names.clone(),
            bands,
            width: self.width,
            height: self.height,
            extent: self.extent,
            scale: self.scale,
            crs: self.crs.clone(),
        }
    }

    /// Combine two images sample-by-sample. Band names come from `self`.
    fn zip_with(&self, other: &RasterImage, f: impl Fn(f64, f64) -> f64) -> Result<RasterImage> {
        if self.band_count() != other.band_count() {
            return Err(SharpEvalError::BandCountMismatch {
                reference: self.band_count(),
                assessment: other.band_count(),
            });
        }
        if self.width != other.width || self.height != other.height {
            return Err(SharpEvalError::ImageData(format!(
                "grid mismatch: {}x{} vs {}x{}; align images before comparing",
                self.width, self.height, other.width, other.height
            )));
        }
        let bands = self
            .bands
            .iter()
            .zip(other.bands.iter())
            .map(|(a, b)| a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect())
            .collect();
        Ok(Self {
            band_names: self.band_names.clone(),
            bands,
            width: self.width,
            height: self.height,
            extent: self.extent,
            scale: self.scale,
            crs: self.crs.clone(),
        })
    }

    /// Per-band, per-sample difference `self - other`.
    pub fn subtract(&self, other: &RasterImage) -> Result<RasterImage> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Per-band, per-sample sum.
    pub fn add(&self, other: &RasterImage) -> Result<RasterImage> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Per-band, per-sample product.
    pub fn multiply(&self, other: &RasterImage) -> Result<RasterImage> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Raise every sample to an integer power.
    pub fn powi(&self, exp: i32) -> RasterImage {
        self.map_values(|v| v.powi(exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_extent() -> Extent {
        Extent::new(0.0, 0.0, 40.0, 40.0)
    }

    fn two_band_image() -> RasterImage {
        RasterImage::new(
            vec!["red".into(), "nir".into()],
            vec![vec![1.0; 16], vec![2.0; 16]],
            4,
            4,
            test_extent(),
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_grid() {
        let result = RasterImage::new(
            vec!["red".into()],
            vec![vec![0.0; 15]],
            4,
            4,
            test_extent(),
            10.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_name_count_mismatch() {
        let result = RasterImage::new(
            vec!["red".into(), "nir".into()],
            vec![vec![0.0; 16]],
            4,
            4,
            test_extent(),
            10.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_extent_intersect() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, 5.0, 20.0, 20.0);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i, Extent::new(5.0, 5.0, 10.0, 10.0));

        let c = Extent::new(11.0, 11.0, 20.0, 20.0);
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_band_by_name() {
        let img = two_band_image();
        assert_eq!(img.band_by_name("nir").unwrap()[0], 2.0);
        assert!(img.band_by_name("blue").is_err());
    }

    #[test]
    fn test_select_preserves_order() {
        let img = two_band_image();
        let sel = img.select(&["nir", "red"]).unwrap();
        assert_eq!(sel.band_names(), &["nir".to_string(), "red".to_string()]);
        assert_eq!(sel.band(0)[0], 2.0);
        assert_eq!(sel.band(1)[0], 1.0);
    }

    #[test]
    fn test_subtract_and_powi() {
        let a = two_band_image();
        let b = a.map_values(|v| v + 3.0);
        let diff = b.subtract(&a).unwrap();
        assert!(diff.band(0).iter().all(|&v| v == 3.0));
        let sq = diff.powi(2);
        assert!(sq.band(1).iter().all(|&v| v == 9.0));
    }

    #[test]
    fn test_zip_rejects_grid_mismatch() {
        let a = two_band_image();
        let b = RasterImage::new(
            vec!["red".into(), "nir".into()],
            vec![vec![1.0; 4], vec![2.0; 4]],
            2,
            2,
            test_extent(),
            20.0,
        )
        .unwrap();
        assert!(a.subtract(&b).is_err());
    }

    #[test]
    fn test_pixel_size() {
        let img = two_band_image();
        assert_eq!(img.pixel_size(), (10.0, 10.0));
    }
}
