//! Global constants for the lens computation and the viewer.
//!
//! Convergence is dimensionless. All lengths are in screen pixels, so the
//! lensing potential and deflection field come out in pixel units as well.

// ---------------------------------------------------------------------------
// Convergence Display Scaling
// ---------------------------------------------------------------------------
pub const KAPPA_AT_FULL_GREY: f64 = 2.0; // kappa assigned to grey value 255
pub const KAPPA_LOG_OFFSET: f64 = 2.5; // byte = gain * (ln kappa + offset)
pub const KAPPA_LOG_GAIN: f64 = 70.0;

// ---------------------------------------------------------------------------
// Green's Function Kernel
// ---------------------------------------------------------------------------
pub const INV_PI: f64 = std::f64::consts::FRAC_1_PI;
pub const GREEN_ORIGIN_VALUE: f64 = -1.465_871_197_758_855_4; // ln(0.01) / pi

// ---------------------------------------------------------------------------
// Critical Curves / Caustics
// ---------------------------------------------------------------------------
pub const CRITICAL_BLUR_SIGMA: f64 = 4.0;
pub const CURVE_INTENSITY: u8 = 255;

// ---------------------------------------------------------------------------
// Lens Defaults
// ---------------------------------------------------------------------------
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Control Mapping (raw slider value -> physical parameter)
// ---------------------------------------------------------------------------
pub const WEIGHT_DIVISOR: f64 = 20.0;
pub const WEIGHT_RAW_MAX: u32 = 200;
pub const WEIGHT_RAW_DEFAULT: u32 = 100;
pub const SOURCE_SIZE_DIVISOR: f64 = 100.0;
pub const SOURCE_SIZE_RAW_MAX: u32 = 400;
pub const SOURCE_SIZE_RAW_DEFAULT: u32 = 100;

// ---------------------------------------------------------------------------
// Overlay Colours (RGB)
// ---------------------------------------------------------------------------
pub const CRITICAL_CURVE_RGB: [u8; 3] = [255, 255, 255];
pub const CAUSTIC_RGB: [u8; 3] = [255, 0, 0];
pub const SOURCE_MARKER_RADIUS: i32 = 7;
pub const SOURCE_MARKER_GREY: u8 = 210;
