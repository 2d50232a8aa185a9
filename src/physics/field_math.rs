//! Numerical helpers shared by the lens field and the renderer: index
//! clamping with exponential fall-off, the Green's function kernel and
//! finite differences on scalar grids.

use crate::physics::constants::{GREEN_ORIGIN_VALUE, INV_PI};
use ndarray::{s, Array2};

/// Nearest grid index to a floating-point coordinate, clamped to `[0, len-1]`.
#[inline]
pub fn relocate(coord: f64, len: usize) -> usize {
    relocate_index((coord + 0.5).floor() as i64, len)
}

/// Clamp an already rounded coordinate to `[0, len-1]`.
#[inline]
pub fn relocate_index(coord: i64, len: usize) -> usize {
    if coord <= 0 {
        0
    } else if coord as usize >= len {
        len.saturating_sub(1)
    } else {
        coord as usize
    }
}

/// Exponential fall-off of the deflection strength outside the area covered
/// by lens data. `half` is half the interval length, `last` is `len - 1`.
/// [`relocate_with_fall_off`] pairs this weight with the clamped index.
#[inline]
pub fn fall_off(rel: i32, len: usize, half: f64, last: f64) -> f64 {
    if rel < 0 {
        (rel as f64 / half).exp()
    } else if rel as usize >= len {
        ((last - rel as f64) / half).exp()
    } else {
        1.0
    }
}

/// Clamp `rel` into the lens grid and return the 1D fall-off weight in the
/// same call. For 2D, multiply the weights of both axes.
#[inline]
pub fn relocate_with_fall_off(rel: i32, len: usize, half: f64, last: f64) -> (usize, f64) {
    let index = if rel < 0 {
        0
    } else if rel as usize >= len {
        len.saturating_sub(1)
    } else {
        rel as usize
    };
    (index, fall_off(rel, len, half, last))
}

/// Precomputed fall-off parameters for one axis of the lens grid.
#[derive(Debug, Clone, Copy)]
pub struct FallOff {
    len: usize,
    half: f64,
    last: f64,
}

impl FallOff {
    pub fn new(len: usize) -> Self {
        let l = len as f64;
        Self {
            len,
            half: 0.5 * l,
            last: l - 1.0,
        }
    }

    #[inline]
    pub fn apply(&self, rel: i32) -> (usize, f64) {
        relocate_with_fall_off(rel, self.len, self.half, self.last)
    }
}

/// Fill `kernel` with the 2D Green's function `ln(r) / pi`, laid out with the
/// origin at `[0, 0]` and negative offsets wrapped to the far edges. One
/// quadrant is evaluated and mirrored into the other three.
pub fn fill_convolution_kernel(kernel: &mut Array2<f64>) {
    let (rows, cols) = kernel.dim();
    if rows == 0 || cols == 0 {
        return;
    }
    let half_rows = rows / 2;
    let half_cols = cols / 2;

    for i in 0..=half_rows {
        let mirror_i = rows - i;
        let i_sq = i * i;
        for j in 0..=half_cols {
            let mirror_j = cols - j;
            let val = if i == 0 && j == 0 {
                GREEN_ORIGIN_VALUE
            } else {
                INV_PI * ((i_sq + j * j) as f64).sqrt().ln()
            };

            kernel[[i, j]] = val;
            if i != 0 {
                kernel[[mirror_i, j]] = val;
                if j != 0 {
                    kernel[[mirror_i, mirror_j]] = val;
                }
            }
            if j != 0 {
                kernel[[i, mirror_j]] = val;
            }
        }
    }
}

/// Direction in which grid content moves under [`shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Translate the content of `grid` by `n` cells, zero-filling vacated cells.
pub fn shift(grid: &Array2<f64>, n: usize, direction: Direction) -> Array2<f64> {
    let (rows, cols) = grid.dim();
    let mut out = Array2::zeros((rows, cols));
    match direction {
        Direction::Up if n < rows => out
            .slice_mut(s![..rows - n, ..])
            .assign(&grid.slice(s![n.., ..])),
        Direction::Down if n < rows => out
            .slice_mut(s![n.., ..])
            .assign(&grid.slice(s![..rows - n, ..])),
        Direction::Left if n < cols => out
            .slice_mut(s![.., ..cols - n])
            .assign(&grid.slice(s![.., n..])),
        Direction::Right if n < cols => out
            .slice_mut(s![.., n..])
            .assign(&grid.slice(s![.., ..cols - n])),
        _ => {}
    }
    out
}

/// Central difference along x. The two outermost columns on each side are
/// replaced by the nearest interior value.
pub fn derivative_x(field: &Array2<f64>) -> Array2<f64> {
    let mut d = (shift(field, 1, Direction::Left) - shift(field, 1, Direction::Right)) * 0.5;
    let cols = d.ncols();
    if cols >= 3 {
        for mut row in d.rows_mut() {
            let head = row[2];
            let tail = row[cols - 3];
            row[0] = head;
            row[1] = head;
            row[cols - 1] = tail;
            row[cols - 2] = tail;
        }
    }
    d
}

/// Central difference along y, with the same border policy as [`derivative_x`].
pub fn derivative_y(field: &Array2<f64>) -> Array2<f64> {
    let mut d = (shift(field, 1, Direction::Up) - shift(field, 1, Direction::Down)) * 0.5;
    let rows = d.nrows();
    if rows >= 3 {
        for mut col in d.columns_mut() {
            let head = col[2];
            let tail = col[rows - 3];
            col[0] = head;
            col[1] = head;
            col[rows - 1] = tail;
            col[rows - 2] = tail;
        }
    }
    d
}

/// Lower median of all grid values, `None` for an empty grid.
pub fn median(grid: &Array2<f64>) -> Option<f64> {
    let mut flat: Vec<f64> = grid.iter().copied().collect();
    if flat.is_empty() {
        return None;
    }
    let mid = (flat.len() - 1) / 2;
    let (_, m, _) = flat.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*m)
}
