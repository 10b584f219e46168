//! Grid resampling kernels: nearest, bilinear, and Catmull-Rom bicubic.
//!
//! Target pixel centers are mapped through map coordinates into
//! fractional source pixel coordinates; source lookups are edge-clamped.

use rayon::prelude::*;

use crate::error::{Result, SharpEvalError};
use crate::raster::{GridSpec, RasterImage};

use super::ResampleKind;

pub(crate) fn resample_grid(
    image: &RasterImage,
    kind: ResampleKind,
    target: &GridSpec,
) -> Result<RasterImage> {
    if image.crs() != target.crs {
        return Err(SharpEvalError::ImageData(format!(
            "CRS mismatch: {:?} vs {:?}; reprojection between coordinate systems is not supported",
            image.crs(),
            target.crs
        )));
    }
    if target.width == 0 || target.height == 0 {
        return Err(SharpEvalError::ImageData(format!(
            "empty target grid: {}x{}",
            target.width, target.height
        )));
    }

    let (spw, sph) = image.pixel_size();
    let tpw = target.extent.width() / target.width as f64;
    let tph = target.extent.height() / target.height as f64;
    let src_extent = image.extent();

    let bands: Vec<Vec<f64>> = (0..image.band_count())
        .into_par_iter()
        .map(|b| {
            let data = image.band(b);
            let mut out = Vec::with_capacity(target.width * target.height);
            for row in 0..target.height {
                let y = target.extent.y_max - (row as f64 + 0.5) * tph;
                let fr = (src_extent.y_max - y) / sph - 0.5;
                for col in 0..target.width {
                    let x = target.extent.x_min + (col as f64 + 0.5) * tpw;
                    let fc = (x - src_extent.x_min) / spw - 0.5;
                    out.push(sample(data, image.width(), image.height(), fr, fc, kind));
                }
            }
            out
        })
        .collect();

    RasterImage::new(
        image.band_names().to_vec(),
        bands,
        target.width,
        target.height,
        target.extent,
        target.scale,
    )
    .map(|img| img.with_crs(target.crs.clone()))
}

fn sample(data: &[f64], width: usize, height: usize, fr: f64, fc: f64, kind: ResampleKind) -> f64 {
    match kind {
        ResampleKind::Nearest => {
            let r = clamp_index(fr.round() as isize, height);
            let c = clamp_index(fc.round() as isize, width);
            data[r * width + c]
        }
        ResampleKind::Bilinear => {
            let r0 = fr.floor();
            let c0 = fc.floor();
            let dr = fr - r0;
            let dc = fc - c0;
            let mut value = 0.0;
            for (ri, rw) in [(r0 as isize, 1.0 - dr), (r0 as isize + 1, dr)] {
                let r = clamp_index(ri, height);
                for (ci, cw) in [(c0 as isize, 1.0 - dc), (c0 as isize + 1, dc)] {
                    let c = clamp_index(ci, width);
                    value += rw * cw * data[r * width + c];
                }
            }
            value
        }
        ResampleKind::Bicubic => {
            let r0 = fr.floor() as isize;
            let c0 = fc.floor() as isize;
            let dr = fr - r0 as f64;
            let dc = fc - c0 as f64;
            let mut rows = [0.0; 4];
            for (i, row) in rows.iter_mut().enumerate() {
                let r = clamp_index(r0 - 1 + i as isize, height);
                let mut cols = [0.0; 4];
                for (j, col) in cols.iter_mut().enumerate() {
                    let c = clamp_index(c0 - 1 + j as isize, width);
                    *col = data[r * width + c];
                }
                *row = catmull_rom(cols, dc);
            }
            catmull_rom(rows, dr)
        }
    }
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Catmull-Rom interpolation of four equally spaced samples at
/// parameter `t` in [0, 1] between `p[1]` and `p[2]`.
fn catmull_rom(p: [f64; 4], t: f64) -> f64 {
    let [p0, p1, p2, p3] = p;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t * t
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t * t * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InMemoryEngine, ReductionEngine};
    use crate::raster::Extent;

    fn source_image() -> RasterImage {
        let data: Vec<f64> = (0..16).map(|v| v as f64).collect();
        RasterImage::new(
            vec!["pan".into()],
            vec![data],
            4,
            4,
            Extent::new(0.0, 0.0, 40.0, 40.0),
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_catmull_rom_endpoints() {
        assert_eq!(catmull_rom([0.0, 1.0, 2.0, 3.0], 0.0), 1.0);
        assert_eq!(catmull_rom([0.0, 1.0, 2.0, 3.0], 1.0), 2.0);
    }

    #[test]
    fn test_catmull_rom_reproduces_linear_ramp() {
        let v = catmull_rom([1.0, 2.0, 3.0, 4.0], 0.25);
        assert!((v - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_resample_identity_grid() {
        let engine = InMemoryEngine::new();
        let img = source_image();
        for kind in [
            ResampleKind::Nearest,
            ResampleKind::Bilinear,
            ResampleKind::Bicubic,
        ] {
            let out = engine.resample(&img, kind, &img.grid_spec()).unwrap();
            for (a, b) in img.band(0).iter().zip(out.band(0).iter()) {
                assert!((a - b).abs() < 1e-9, "{:?}: {} vs {}", kind, a, b);
            }
        }
    }

    #[test]
    fn test_resample_to_finer_grid() {
        let engine = InMemoryEngine::new();
        let img = source_image();
        let target = GridSpec {
            width: 8,
            height: 8,
            extent: img.extent(),
            scale: 5.0,
            crs: img.crs().to_string(),
        };
        let out = engine
            .resample(&img, ResampleKind::Bicubic, &target)
            .unwrap();
        assert_eq!(out.width(), 8);
        assert_eq!(out.height(), 8);
        assert_eq!(out.nominal_scale(), 5.0);
        // Interpolated values stay within a ramp's overshoot margin.
        assert!(out.band(0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_resample_constant_is_exact() {
        let engine = InMemoryEngine::new();
        let img = RasterImage::new(
            vec!["pan".into()],
            vec![vec![7.0; 16]],
            4,
            4,
            Extent::new(0.0, 0.0, 40.0, 40.0),
            10.0,
        )
        .unwrap();
        let target = GridSpec {
            width: 13,
            height: 5,
            extent: img.extent(),
            scale: 3.0,
            crs: img.crs().to_string(),
        };
        let out = engine
            .resample(&img, ResampleKind::Bicubic, &target)
            .unwrap();
        assert!(out.band(0).iter().all(|&v| (v - 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_resample_crs_mismatch_rejected() {
        let engine = InMemoryEngine::new();
        let img = source_image();
        let mut target = img.grid_spec();
        target.crs = "EPSG:32633".into();
        assert!(engine
            .resample(&img, ResampleKind::Bicubic, &target)
            .is_err());
    }
}
