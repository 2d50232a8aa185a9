//! Lensing potential from convergence via FFT convolution with the 2D
//! Green's function.

use crate::parallel::for_each_row;
use crate::physics::field_math::fill_convolution_kernel;
use ndarray::{s, Array2};
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

/// Smallest size `>= n` whose only prime factors are 2, 3 and 5.
pub fn optimal_transform_size(n: usize) -> usize {
    let mut m = n.max(1);
    loop {
        let mut r = m;
        for p in [2, 3, 5] {
            while r % p == 0 {
                r /= p;
            }
        }
        if r == 1 {
            return m;
        }
        m += 1;
    }
}

/// In-place 2D transform: rows first, then columns (via a transposed copy).
fn fft2(data: &mut Array2<Complex<f64>>, planner: &mut FftPlanner<f64>, direction: FftDirection) {
    let (rows, cols) = data.dim();

    let row_fft = planner.plan_fft(cols, direction);
    for_each_row(data, |_, mut row| {
        if let Some(line) = row.as_slice_mut() {
            row_fft.process(line);
        }
    });

    let mut transposed = data.t().as_standard_layout().into_owned();
    let col_fft = planner.plan_fft(rows, direction);
    for_each_row(&mut transposed, |_, mut col| {
        if let Some(line) = col.as_slice_mut() {
            col_fft.process(line);
        }
    });
    *data = transposed.t().as_standard_layout().into_owned();
}

/// psi = kappa (*) ln(r)/pi. Both grids are zero-padded to at least twice the
/// input size so the circular convolution does not wrap around.
pub fn potential_from_convergence(kappa: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = kappa.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((rows, cols));
    }
    let padded_rows = optimal_transform_size(2 * rows);
    let padded_cols = optimal_transform_size(2 * cols);
    log::debug!(
        "convolution: {}x{} padded to {}x{}",
        cols,
        rows,
        padded_cols,
        padded_rows
    );

    let mut kernel = Array2::zeros((padded_rows, padded_cols));
    fill_convolution_kernel(&mut kernel);
    let mut kernel_hat = kernel.mapv(|v| Complex::new(v, 0.0));

    let mut kappa_hat = Array2::from_elem((padded_rows, padded_cols), Complex::new(0.0, 0.0));
    kappa_hat
        .slice_mut(s![..rows, ..cols])
        .zip_mut_with(kappa, |c, &k| c.re = k);

    let mut planner = FftPlanner::new();
    fft2(&mut kernel_hat, &mut planner, FftDirection::Forward);
    fft2(&mut kappa_hat, &mut planner, FftDirection::Forward);
    kappa_hat.zip_mut_with(&kernel_hat, |a, &b| *a *= b);
    fft2(&mut kappa_hat, &mut planner, FftDirection::Inverse);

    let scale = 1.0 / (padded_rows * padded_cols) as f64;
    kappa_hat.slice(s![..rows, ..cols]).mapv(|c| c.re * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constants::{GREEN_ORIGIN_VALUE, INV_PI};

    fn green(di: i64, dj: i64) -> f64 {
        if di == 0 && dj == 0 {
            GREEN_ORIGIN_VALUE
        } else {
            INV_PI * ((di * di + dj * dj) as f64).sqrt().ln()
        }
    }

    #[test]
    fn test_optimal_transform_size() {
        assert_eq!(optimal_transform_size(0), 1);
        assert_eq!(optimal_transform_size(7), 8);
        assert_eq!(optimal_transform_size(11), 12);
        assert_eq!(optimal_transform_size(14), 15);
        assert_eq!(optimal_transform_size(97), 100);
        assert_eq!(optimal_transform_size(128), 128);
    }

    #[test]
    fn test_potential_matches_direct_convolution() {
        let kappa = Array2::from_shape_fn((5, 6), |(i, j)| ((i * 7 + j * 3) % 5) as f64 * 0.1);
        let psi = potential_from_convergence(&kappa);
        assert_eq!(psi.dim(), (5, 6));

        for r in 0..5i64 {
            for c in 0..6i64 {
                let mut direct = 0.0;
                for rr in 0..5i64 {
                    for cc in 0..6i64 {
                        direct += kappa[[rr as usize, cc as usize]] * green(r - rr, c - cc);
                    }
                }
                assert!((psi[[r as usize, c as usize]] - direct).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_convergence_gives_zero_potential() {
        let psi = potential_from_convergence(&Array2::zeros((4, 4)));
        assert!(psi.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_potential_is_linear() {
        let kappa = Array2::from_shape_fn((8, 6), |(i, j)| (i as f64 - 3.5).abs() + j as f64 * 0.2);
        let psi = potential_from_convergence(&kappa);
        let psi3 = potential_from_convergence(&(&kappa * 3.0));
        for (a, b) in psi.iter().zip(psi3.iter()) {
            assert!((3.0 * a - b).abs() < 1e-9 * (1.0 + b.abs()));
        }
    }
}
