//! Physics module for the lens model
//!
//! Everything that depends only on the convergence map lives here: the
//! potential obtained by convolution, the deflection and shear fields, and
//! the critical curves and caustics extracted from them.

pub mod constants;
pub mod contour;
pub mod convolution;
pub mod critical_curves;
pub mod field_math;
pub mod lens;

// Re-export commonly used items
pub use constants::*;
pub use lens::{ConvergenceMap, DeflectionField, Lens, LensError, LensResult};
