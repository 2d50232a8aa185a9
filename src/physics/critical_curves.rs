//! Critical curves from the sign of the lens-mapping Jacobian, and caustics
//! obtained by mapping the curves into the source plane.

use crate::parallel::{for_each_row, map_rows};
use crate::physics::constants::{CRITICAL_BLUR_SIGMA, CURVE_INTENSITY};
use crate::physics::contour::trace_contours;
use crate::physics::lens::DeflectionField;
use crate::rendering::raster::draw_polyline_aa;
use ndarray::{Array2, Zip};

/// Cells marked around each ray-traced curve pixel: the hit cell, its right
/// and lower neighbours and the lower-right diagonal.
const CAUSTIC_FOOTPRINT: [(i64, i64); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Tangential `1 - w(kappa + gamma)` and radial `1 - w(kappa - gamma)` eigenvalue maps.
pub fn eigenvalue_maps(
    kappa: &Array2<f64>,
    shear: &Array2<f64>,
    weight: f64,
) -> (Array2<f64>, Array2<f64>) {
    let tangential = Zip::from(kappa)
        .and(shear)
        .map_collect(|&k, &g| 1.0 - weight * (k + g));
    let radial = Zip::from(kappa)
        .and(shear)
        .map_collect(|&k, &g| 1.0 - weight * (k - g));
    (tangential, radial)
}

/// Jacobian determinant, or only its tangential factor when radial curves are not wanted.
pub fn jacobian_map(
    kappa: &Array2<f64>,
    shear: &Array2<f64>,
    weight: f64,
    include_radial: bool,
) -> Array2<f64> {
    let (tangential, radial) = eigenvalue_maps(kappa, shear, weight);
    if include_radial {
        tangential * radial
    } else {
        tangential
    }
}

fn gaussian_weights(sigma: f64) -> Vec<f64> {
    let size = (sigma * 8.0 + 1.0).round() as usize | 1;
    let radius = (size / 2) as i64;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / denom).exp())
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Mirror an out-of-range index back into `[0, n)` without repeating the edge cell.
#[inline]
fn reflect_101(i: i64, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as i64 - 1);
    let k = i.rem_euclid(period);
    if k >= n as i64 {
        (period - k) as usize
    } else {
        k as usize
    }
}

fn blur_rows(src: &Array2<f64>, weights: &[f64]) -> Array2<f64> {
    let (rows, cols) = src.dim();
    let radius = (weights.len() / 2) as i64;
    let mut out = Array2::zeros((rows, cols));
    for_each_row(&mut out, |i, mut row| {
        let line = src.row(i);
        for j in 0..cols {
            let mut acc = 0.0;
            for (k, w) in weights.iter().enumerate() {
                acc += w * line[reflect_101(j as i64 + k as i64 - radius, cols)];
            }
            row[j] = acc;
        }
    });
    out
}

/// Separable Gaussian blur with mirrored borders; the kernel spans `8 sigma + 1` cells.
pub fn gaussian_blur(field: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let (rows, cols) = field.dim();
    if rows == 0 || cols == 0 || sigma <= 0.0 {
        return field.clone();
    }
    let weights = gaussian_weights(sigma);
    let horizontal = blur_rows(field, &weights);
    let transposed = horizontal.t().as_standard_layout().into_owned();
    let vertical = blur_rows(&transposed, &weights);
    vertical.t().as_standard_layout().into_owned()
}

/// 1 where the field is `<= 0`, else 0.
pub fn binarize_non_positive(field: &Array2<f64>) -> Array2<u8> {
    let mut out = Array2::zeros(field.dim());
    for_each_row(&mut out, |i, mut row| {
        for (cell, &v) in row.iter_mut().zip(field.row(i).iter()) {
            *cell = u8::from(v <= 0.0);
        }
    });
    out
}

/// Anti-aliased outlines of the smoothed regions where the Jacobian is non-positive.
pub fn critical_curve_mask(
    kappa: &Array2<f64>,
    shear: &Array2<f64>,
    weight: f64,
    include_radial: bool,
) -> Array2<u8> {
    let det = jacobian_map(kappa, shear, weight, include_radial);
    let smooth = gaussian_blur(&det, CRITICAL_BLUR_SIGMA);
    let region = binarize_non_positive(&smooth);

    let contours = trace_contours(&region);
    log::debug!("critical curves: {} contours", contours.len());

    let mut mask = Array2::zeros(region.dim());
    for contour in &contours {
        draw_polyline_aa(&mut mask, &contour.points, true, CURVE_INTENSITY);
    }
    mask
}

/// Map every critical-curve pixel to the source plane (unit scale, no
/// interpolation) and mark the rounded hit with the fixed footprint.
/// Hits outside the grid are dropped.
pub fn invert_critical_curves(
    critical: &Array2<u8>,
    deflection: &DeflectionField,
    weight: f64,
) -> Array2<u8> {
    let (rows, cols) = critical.dim();
    let hits: Vec<Vec<(i64, i64)>> = map_rows(rows, |i| {
        (0..cols)
            .filter(|&j| critical[[i, j]] > 0)
            .map(|j| {
                let (b1, b2) = deflection.raytrace(j as i32, i as i32, j, i, 1.0, weight);
                ((b1 + 0.5).floor() as i64, (b2 + 0.5).floor() as i64)
            })
            .collect()
    });

    let mut caustics = Array2::zeros((rows, cols));
    for (x, y) in hits.into_iter().flatten() {
        for (dx, dy) in CAUSTIC_FOOTPRINT {
            let (cx, cy) = (x + dx, y + dy);
            if cx >= 0 && cy >= 0 && (cx as usize) < cols && (cy as usize) < rows {
                caustics[[cy as usize, cx as usize]] = CURVE_INTENSITY;
            }
        }
    }
    caustics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_deflection(rows: usize, cols: usize, ax: f64, ay: f64) -> DeflectionField {
        DeflectionField {
            alpha_x: Array2::from_elem((rows, cols), ax),
            alpha_y: Array2::from_elem((rows, cols), ay),
            shear: Array2::zeros((rows, cols)),
        }
    }

    #[test]
    fn test_gaussian_weights_normalised() {
        let w = gaussian_weights(4.0);
        assert_eq!(w.len(), 33);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((w[0] - w[32]).abs() < 1e-15);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-17, 3), 1);
        assert_eq!(reflect_101(9, 1), 0);
    }

    #[test]
    fn test_blur_keeps_constant_field() {
        let field = Array2::from_elem((6, 9), -0.75);
        let blurred = gaussian_blur(&field, 4.0);
        assert!(blurred.iter().all(|v| (v + 0.75).abs() < 1e-12));
    }

    #[test]
    fn test_blur_spreads_impulse_symmetrically() {
        let mut field = Array2::zeros((41, 41));
        field[[20, 20]] = 1.0;
        let blurred = gaussian_blur(&field, 4.0);
        assert!((blurred.sum() - 1.0).abs() < 1e-9);
        assert!((blurred[[20, 24]] - blurred[[16, 20]]).abs() < 1e-15);
        assert!(blurred[[20, 20]] > blurred[[20, 21]]);
    }

    #[test]
    fn test_binarize_non_positive() {
        let field = Array2::from_shape_vec((1, 4), vec![-1.0, 0.0, 1e-9, 3.0]).unwrap();
        assert_eq!(binarize_non_positive(&field).into_raw_vec(), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_jacobian_map_radial_product() {
        let kappa = Array2::from_elem((2, 2), 0.5);
        let shear = Array2::from_elem((2, 2), 0.25);
        let tangential = jacobian_map(&kappa, &shear, 2.0, false);
        let full = jacobian_map(&kappa, &shear, 2.0, true);
        assert!((tangential[[0, 0]] + 0.5).abs() < 1e-12);
        assert!((full[[1, 1]] - (-0.5 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_no_curves_without_mass() {
        let zeros = Array2::zeros((12, 12));
        let mask = critical_curve_mask(&zeros, &zeros, 1.0, true);
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_supercritical_sheet_outlines_the_grid() {
        let kappa = Array2::from_elem((10, 14), 2.0);
        let shear = Array2::zeros((10, 14));
        let mask = critical_curve_mask(&kappa, &shear, 1.0, false);
        assert_eq!(mask[[0, 0]], 255);
        assert_eq!(mask[[9, 13]], 255);
        assert_eq!(mask[[0, 7]], 255);
        assert_eq!(mask[[5, 7]], 0);
    }

    #[test]
    fn test_single_curve_pixel_maps_to_footprint() {
        let mut critical = Array2::zeros((10, 10));
        critical[[5, 5]] = 255;
        let deflection = constant_deflection(10, 10, 2.0, -1.0);
        let caustics = invert_critical_curves(&critical, &deflection, 1.0);

        // (5, 5) - (2, -1) = (3, 6)
        let marked: Vec<(usize, usize)> = caustics
            .indexed_iter()
            .filter(|&(_, &v)| v > 0)
            .map(|((y, x), _)| (x, y))
            .collect();
        assert_eq!(marked, vec![(3, 6), (4, 6), (3, 7), (4, 7)]);
    }

    #[test]
    fn test_weight_scales_caustic_offset() {
        let mut critical = Array2::zeros((10, 10));
        critical[[2, 2]] = 128;
        let deflection = constant_deflection(10, 10, -1.5, -1.0);
        let caustics = invert_critical_curves(&critical, &deflection, 2.0);
        // (2, 2) - 2 * (-1.5, -1) = (5, 4)
        assert_eq!(caustics[[4, 5]], 255);
        assert_eq!(caustics[[5, 6]], 255);
        assert_eq!(caustics[[2, 2]], 0);
    }

    #[test]
    fn test_out_of_range_caustics_are_dropped() {
        let mut critical = Array2::zeros((6, 6));
        critical[[5, 5]] = 255;
        critical[[0, 0]] = 255;
        let deflection = constant_deflection(6, 6, 0.0, 0.0);
        let caustics = invert_critical_curves(&critical, &deflection, 1.0);
        assert_eq!(caustics[[5, 5]], 255);
        assert_eq!(caustics.iter().filter(|&&v| v > 0).count(), 5);

        let far = constant_deflection(6, 6, 50.0, 50.0);
        let caustics = invert_critical_curves(&critical, &far, 1.0);
        assert!(caustics.iter().all(|&v| v == 0));
    }
}
