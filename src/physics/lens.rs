//! The lens: a convergence map placed on screen together with every field
//! derived from it (potential, deflection, shear, critical curves, caustics).

use crate::physics::constants::{
    DEFAULT_WEIGHT, KAPPA_AT_FULL_GREY, KAPPA_LOG_GAIN, KAPPA_LOG_OFFSET,
};
use crate::physics::convolution::potential_from_convergence;
use crate::physics::critical_curves::{critical_curve_mask, invert_critical_curves};
use crate::physics::field_math::{derivative_x, derivative_y, median};
use log::{debug, info, warn};
use ndarray::{Array2, Zip};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LensError {
    #[error("convergence map is empty ({width}x{height})")]
    EmptyConvergence { width: usize, height: usize },
}

pub type LensResult<T> = Result<T, LensError>;

/// Convergence input as loaded from disk.
#[derive(Debug, Clone)]
pub enum ConvergenceMap {
    /// 8-bit grey values; 255 stands for a convergence of 2.
    Greyscale(Array2<u8>),
    /// Convergence in physical (dimensionless) units.
    Physical(Array2<f64>),
}

impl ConvergenceMap {
    /// `(rows, cols)` of the underlying grid.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            ConvergenceMap::Greyscale(g) => g.dim(),
            ConvergenceMap::Physical(k) => k.dim(),
        }
    }
}

fn kappa_from_greyscale(grey: &Array2<u8>) -> Array2<f64> {
    grey.mapv(|g| KAPPA_AT_FULL_GREY * g as f64 / 255.0)
}

/// Replace NaN and infinite cells by 0 and return how many were replaced.
fn zero_non_finite(kappa: &mut Array2<f64>) -> usize {
    let mut count = 0;
    kappa.mapv_inplace(|k| {
        if k.is_finite() {
            k
        } else {
            count += 1;
            0.0
        }
    });
    count
}

/// Logarithmic display compression; non-positive or NaN convergence maps to 0.
fn display_from_kappa(kappa: &Array2<f64>) -> Array2<u8> {
    kappa.mapv(|k| {
        let v = (KAPPA_LOG_GAIN * (k.ln() + KAPPA_LOG_OFFSET)).round();
        if v.is_nan() {
            0
        } else {
            v.clamp(0.0, 255.0) as u8
        }
    })
}

/// First derivatives of the potential (the deflection angle) and the shear magnitude.
#[derive(Debug, Clone)]
pub struct DeflectionField {
    pub alpha_x: Array2<f64>,
    pub alpha_y: Array2<f64>,
    pub shear: Array2<f64>,
}

impl DeflectionField {
    pub fn from_potential(psi: &Array2<f64>) -> Self {
        let alpha_x = derivative_x(psi);
        let alpha_y = derivative_y(psi);

        let psi_xx = derivative_x(&alpha_x);
        let psi_yy = derivative_y(&alpha_y);
        let psi_xy = derivative_y(&alpha_x);

        let shear = Zip::from(&psi_xx)
            .and(&psi_yy)
            .and(&psi_xy)
            .map_collect(|&xx, &yy, &xy| {
                let d = xx - yy;
                (0.25 * d * d + xy * xy).sqrt()
            });

        Self {
            alpha_x,
            alpha_y,
            shear,
        }
    }

    /// Lens equation `beta = theta - weight * scale * alpha(rel_y, rel_x)`.
    /// `rel_x`/`rel_y` must already be clamped into the grid.
    #[inline]
    pub fn raytrace(
        &self,
        x1: i32,
        x2: i32,
        rel_x: usize,
        rel_y: usize,
        scale: f64,
        weight: f64,
    ) -> (f64, f64) {
        let f = weight * scale;
        (
            x1 as f64 - f * self.alpha_x[[rel_y, rel_x]],
            x2 as f64 - f * self.alpha_y[[rel_y, rel_x]],
        )
    }
}

#[derive(Debug, Clone)]
pub struct Lens {
    origin: (i32, i32),
    width: usize,
    height: usize,
    weight: f64,
    kappa: Array2<f64>,
    kappa_display: Array2<u8>,
    psi: Array2<f64>,
    deflection: DeflectionField,
    critical_curves: Array2<u8>,
    caustics: Array2<u8>,
}

impl Lens {
    /// Build a lens centred on `(center_x, center_y)`. All derived fields are
    /// computed here, including both critical-curve branches.
    pub fn new(input: ConvergenceMap, center_x: i32, center_y: i32) -> LensResult<Self> {
        let (height, width) = input.dim();
        if width == 0 || height == 0 {
            return Err(LensError::EmptyConvergence { width, height });
        }

        let (kappa, kappa_display) = match input {
            ConvergenceMap::Greyscale(grey) => (kappa_from_greyscale(&grey), grey),
            ConvergenceMap::Physical(mut kappa) => {
                let bad = zero_non_finite(&mut kappa);
                if bad > 0 {
                    warn!("Lens: {} non-finite convergence cells set to 0", bad);
                }
                let display = display_from_kappa(&kappa);
                (kappa, display)
            }
        };
        info!("Lens: {}x{} convergence map", width, height);
        if let Some(m) = median(&kappa) {
            debug!("Lens: median convergence {:.4}", m);
        }

        info!("Performing Fourier transforms and convolution...");
        let start = Instant::now();
        let psi = potential_from_convergence(&kappa);
        debug!("Potential computed in {:?}", start.elapsed());

        info!("Creating deflection and shear fields...");
        let start = Instant::now();
        let deflection = DeflectionField::from_potential(&psi);
        debug!("Derivatives computed in {:?}", start.elapsed());

        let mut lens = Self {
            origin: (0, 0),
            width,
            height,
            weight: DEFAULT_WEIGHT,
            kappa,
            kappa_display,
            psi,
            deflection,
            critical_curves: Array2::zeros((height, width)),
            caustics: Array2::zeros((height, width)),
        };
        lens.move_to(center_x, center_y);
        lens.update_critical_curves(true);
        Ok(lens)
    }

    /// Centre the lens grid on `(x, y)`.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.origin = (x - (self.width / 2) as i32, y - (self.height / 2) as i32);
    }

    /// Recompute the critical-curve mask for the current weight and invert it into caustics.
    pub fn update_critical_curves(&mut self, include_radial: bool) {
        let start = Instant::now();
        self.critical_curves = critical_curve_mask(
            &self.kappa,
            &self.deflection.shear,
            self.weight,
            include_radial,
        );
        self.caustics = invert_critical_curves(&self.critical_curves, &self.deflection, self.weight);
        debug!(
            "Critical curves (radial: {}) updated in {:?}",
            include_radial,
            start.elapsed()
        );
    }

    /// Strictly inside on both sides of the footprint.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (ox, oy) = self.origin;
        ox < x && x < ox + self.width as i32 && oy < y && y < oy + self.height as i32
    }

    #[inline]
    pub fn raytrace_pixel(&self, x1: i32, x2: i32, rel_x: usize, rel_y: usize, scale: f64) -> (f64, f64) {
        self.deflection.raytrace(x1, x2, rel_x, rel_y, scale, self.weight)
    }

    /// Only the stored factor changes; curves are stale until the next
    /// [`Lens::update_critical_curves`].
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn convergence(&self) -> &Array2<f64> {
        &self.kappa
    }

    pub fn convergence_display(&self) -> &Array2<u8> {
        &self.kappa_display
    }

    pub fn potential(&self) -> &Array2<f64> {
        &self.psi
    }

    pub fn deflection(&self) -> &DeflectionField {
        &self.deflection
    }

    pub fn critical_curves(&self) -> &Array2<u8> {
        &self.critical_curves
    }

    pub fn caustics(&self) -> &Array2<u8> {
        &self.caustics
    }
}
