//! Gravitational lensing of a background image by a convergence map.
//!
//! The lens potential is obtained from the convergence by FFT convolution;
//! every screen pixel is then ray-traced through the lens equation and the
//! source image is sampled at the resulting position, with optional
//! overlays for convergence, critical curves and caustics.

pub mod parallel;
pub mod physics;
pub mod rendering;
pub mod simulation;
