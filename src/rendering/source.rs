//! The background source: an RGB image that can be moved and rescaled, sampled
//! with bilinear interpolation at ray-traced source-plane positions.

use crate::physics::field_math::relocate_index;
use crate::rendering::{RenderError, RenderResult};
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::warn;
use ndarray::Array2;

/// One byte grid per colour channel, indexed `[row, col]`.
fn split_channels(image: &RgbImage) -> [Array2<u8>; 3] {
    let (w, h) = image.dimensions();
    std::array::from_fn(|c| {
        Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
            image.get_pixel(x as u32, y as u32)[c]
        })
    })
}

#[derive(Debug, Clone)]
pub struct Source {
    original: RgbImage,
    channels: [Array2<u8>; 3],
    width: usize,
    height: usize,
    position: (i32, i32),
    origin: (i32, i32),
}

impl Source {
    pub fn new(image: RgbImage, center_x: i32, center_y: i32) -> RenderResult<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(RenderError::EmptySource {
                width: w as usize,
                height: h as usize,
            });
        }
        let channels = split_channels(&image);
        let mut source = Self {
            original: image,
            channels,
            width: w as usize,
            height: h as usize,
            position: (0, 0),
            origin: (0, 0),
        };
        source.move_to(center_x, center_y);
        Ok(source)
    }

    /// Centre the current (possibly rescaled) image on `(x, y)`.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.position = (x, y);
        self.origin = (x - (self.width / 2) as i32, y - (self.height / 2) as i32);
    }

    /// Rescale to `factor` times the original size, keeping the centre. The
    /// original image is always the resampling input. A factor that yields an
    /// empty image leaves the current image in place.
    pub fn resize_area(&mut self, factor: f64) {
        let w = (self.original.width() as f64 * factor) as usize;
        let h = (self.original.height() as f64 * factor) as usize;
        if w > 0 && h > 0 {
            let scaled = imageops::resize(&self.original, w as u32, h as u32, FilterType::Triangle);
            self.channels = split_channels(&scaled);
            self.width = w;
            self.height = h;
        } else {
            warn!(
                "Source resize by {:.2} gives an empty image, keeping {}x{}",
                factor, self.width, self.height
            );
        }
        let (x, y) = self.position;
        self.move_to(x, y);
    }

    /// Strict at the lower edge, half-open at the upper edge.
    pub fn contains(&self, b1: f64, b2: f64) -> bool {
        let (x, y) = (b1.floor(), b2.floor());
        let (ox, oy) = (self.origin.0 as f64, self.origin.1 as f64);
        ox < x && x < ox + self.width as f64 && oy < y && y < oy + self.height as f64
    }

    /// Bilinear sample at a source-plane position; black where the source has no data.
    pub fn interpolated_pixel(&self, b1: f64, b2: f64) -> [u8; 3] {
        if !self.contains(b1, b2) {
            return [0; 3];
        }
        let rx = b1 - self.origin.0 as f64;
        let ry = b2 - self.origin.1 as f64;
        let (x0, y0) = (rx.floor(), ry.floor());
        let (fx, fy) = (rx - x0, ry - y0);

        let left = relocate_index(x0 as i64, self.width);
        let right = relocate_index(x0 as i64 + 1, self.width);
        let top = relocate_index(y0 as i64, self.height);
        let bottom = relocate_index(y0 as i64 + 1, self.height);

        std::array::from_fn(|c| {
            let ch = &self.channels[c];
            let v = ch[[top, left]] as f64 * (1.0 - fx) * (1.0 - fy)
                + ch[[top, right]] as f64 * fx * (1.0 - fy)
                + ch[[bottom, left]] as f64 * (1.0 - fx) * fy
                + ch[[bottom, right]] as f64 * fx * fy;
            v.round().clamp(0.0, 255.0) as u8
        })
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
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

    pub fn original(&self) -> &RgbImage {
        &self.original
    }

    pub fn channels(&self) -> &[Array2<u8>; 3] {
        &self.channels
    }
}
