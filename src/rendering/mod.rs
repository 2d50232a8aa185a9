//! Rendering module for the lensed view
//!
//! This module turns a lens and a source into screen images: the source
//! field sampled along ray-traced positions, the overlay compositing and
//! the small rasterisation helpers used for outlines and markers.

pub mod raster;
pub mod renderer;
pub mod source;

// Re-export commonly used items
pub use renderer::{OverlayMode, RenderPass, RenderTarget, Renderer};
pub use source::Source;

/// Rendering errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("source image is empty ({width}x{height})")]
    EmptySource { width: usize, height: usize },
}

pub type RenderResult<T> = Result<T, RenderError>;
