//! Reading convergence maps and source images from disk, writing rendered buffers back.

use crate::physics::ConvergenceMap;
use image::{DynamicImage, RgbImage};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Float images carry convergence in physical units; anything else is read as grey values.
pub fn convergence_from_image(image: DynamicImage) -> ConvergenceMap {
    match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let luma = image.to_luma32f();
            let (w, h) = luma.dimensions();
            ConvergenceMap::Physical(Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
                luma.get_pixel(x as u32, y as u32)[0] as f64
            }))
        }
        other => {
            let luma = other.to_luma8();
            let (w, h) = luma.dimensions();
            ConvergenceMap::Greyscale(Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
                luma.get_pixel(x as u32, y as u32)[0]
            }))
        }
    }
}

fn open(path: &Path) -> Result<DynamicImage, LoadError> {
    image::open(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_convergence(path: &Path) -> Result<ConvergenceMap, LoadError> {
    let image = open(path)?;
    log::info!(
        "Loaded convergence map {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(convergence_from_image(image))
}

pub fn load_source(path: &Path) -> Result<RgbImage, LoadError> {
    let image = open(path)?;
    log::info!(
        "Loaded source image {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image.to_rgb8())
}

pub fn to_rgb_image(buffer: &Array2<[u8; 3]>) -> RgbImage {
    let (rows, cols) = buffer.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        image::Rgb(buffer[[y as usize, x as usize]])
    })
}

/// Save an RGB buffer; the format follows the file extension.
pub fn save_rgb(buffer: &Array2<[u8; 3]>, path: &Path) -> Result<(), LoadError> {
    to_rgb_image(buffer)
        .save(path)
        .map_err(|source| LoadError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Screen size `(width, height)`: the overlap of the convergence map and the source image.
pub fn screen_size(convergence: &ConvergenceMap, source: &RgbImage) -> (usize, usize) {
    let (rows, cols) = convergence.dim();
    let (w, h) = source.dimensions();
    (cols.min(w as usize), rows.min(h as usize))
}
