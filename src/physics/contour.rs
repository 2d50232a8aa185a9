//! Closed outlines of the non-zero regions of a byte mask, traced with the
//! Moore neighbourhood. Outer boundaries and hole boundaries are both
//! returned as separate contours.

use ndarray::Array2;

/// Moore neighbourhood as `(dx, dy)`, clockwise on screen (y grows down), starting east.
const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// West, north, east, south: candidate start directions for a new trace.
const START_BACKTRACK: [usize; 4] = [4, 6, 0, 2];

/// Closed polyline of pixel positions `(x, y)`; the last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<(i64, i64)>,
}

#[inline]
fn inside(mask: &Array2<u8>, x: i64, y: i64) -> bool {
    let (rows, cols) = mask.dim();
    x >= 0 && y >= 0 && (x as usize) < cols && (y as usize) < rows && mask[[y as usize, x as usize]] != 0
}

fn is_boundary(mask: &Array2<u8>, x: i64, y: i64) -> bool {
    inside(mask, x, y)
        && START_BACKTRACK
            .iter()
            .any(|&d| !inside(mask, x + NEIGHBOURS[d].0, y + NEIGHBOURS[d].1))
}

fn direction_of(dx: i64, dy: i64) -> Option<usize> {
    NEIGHBOURS.iter().position(|&n| n == (dx, dy))
}

/// Trace all region outlines in `mask` (non-zero = inside).
pub fn trace_contours(mask: &Array2<u8>) -> Vec<Contour> {
    let (rows, cols) = mask.dim();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut contours = Vec::new();

    for y in 0..rows as i64 {
        for x in 0..cols as i64 {
            if visited[[y as usize, x as usize]] || !is_boundary(mask, x, y) {
                continue;
            }
            let points = trace_from(mask, x, y, &mut visited);
            contours.push(Contour {
                points: compress(points),
            });
        }
    }
    contours
}

fn trace_from(mask: &Array2<u8>, sx: i64, sy: i64, visited: &mut Array2<bool>) -> Vec<(i64, i64)> {
    let mut back = START_BACKTRACK
        .iter()
        .copied()
        .find(|&d| !inside(mask, sx + NEIGHBOURS[d].0, sy + NEIGHBOURS[d].1))
        .unwrap_or(4);

    let mut points = vec![(sx, sy)];
    visited[[sy as usize, sx as usize]] = true;

    let (rows, cols) = mask.dim();
    let step_limit = 4 * rows * cols + 8;
    let (mut x, mut y) = (sx, sy);
    let mut first_step = None;

    for _ in 0..step_limit {
        let next = (1..8).map(|k| (back + k) % 8).find_map(|d| {
            let (nx, ny) = (x + NEIGHBOURS[d].0, y + NEIGHBOURS[d].1);
            inside(mask, nx, ny).then_some((d, nx, ny))
        });
        // isolated pixel
        let Some((d, nx, ny)) = next else { break };

        if (x, y) == (sx, sy) {
            match first_step {
                None => first_step = Some((nx, ny)),
                Some(step) if step == (nx, ny) => break,
                Some(_) => {}
            }
        }

        // The last empty cell examined becomes the backtrack of the new position.
        let (px, py) = (x + NEIGHBOURS[(d + 7) % 8].0, y + NEIGHBOURS[(d + 7) % 8].1);
        back = direction_of(px - nx, py - ny).unwrap_or(back);
        x = nx;
        y = ny;
        points.push((x, y));
        visited[[y as usize, x as usize]] = true;
    }

    if points.len() > 1 && points.last() == Some(&(sx, sy)) {
        points.pop();
    }
    points
}

/// Drop points lying in the middle of straight horizontal, vertical or diagonal runs.
fn compress(points: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    let n = points.len();
    if n < 3 {
        return points;
    }
    let kept: Vec<(i64, i64)> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.0 - prev.0, cur.1 - prev.1) != (next.0 - cur.0, next.1 - cur.1)
        })
        .map(|i| points[i])
        .collect();
    if kept.is_empty() {
        points
    } else {
        kept
    }
}
