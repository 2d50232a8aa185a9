//! Rasterisation of overlay primitives: anti-aliased contour outlines into
//! byte masks and filled discs into RGB buffers.

use ndarray::Array2;

#[inline]
fn plot_max(mask: &mut Array2<u8>, x: i64, y: i64, value: f64) {
    let (rows, cols) = mask.dim();
    if x < 0 || y < 0 || x as usize >= cols || y as usize >= rows {
        return;
    }
    let v = value.clamp(0.0, 255.0).round() as u8;
    let cell = &mut mask[[y as usize, x as usize]];
    if v > *cell {
        *cell = v;
    }
}

/// Anti-aliased 1px line between two pixel centres. Along the major axis each
/// step splits `intensity` between the two pixels straddling the ideal line;
/// existing brighter pixels are kept.
pub fn draw_line_aa(mask: &mut Array2<u8>, from: (f64, f64), to: (f64, f64), intensity: u8) {
    let (mut x0, mut y0) = from;
    let (mut x1, mut y1) = to;
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let gradient = if dx.abs() < 1e-9 { 0.0 } else { (y1 - y0) / dx };
    let full = intensity as f64;

    for major in x0.round() as i64..=x1.round() as i64 {
        let minor = y0 + gradient * (major as f64 - x0);
        let base = minor.floor();
        let frac = minor - base;
        let base = base as i64;
        if steep {
            plot_max(mask, base, major, (1.0 - frac) * full);
            plot_max(mask, base + 1, major, frac * full);
        } else {
            plot_max(mask, major, base, (1.0 - frac) * full);
            plot_max(mask, major, base + 1, frac * full);
        }
    }
}

/// Outline through `points`; `closed` joins the last point back to the first.
pub fn draw_polyline_aa(mask: &mut Array2<u8>, points: &[(i64, i64)], closed: bool, intensity: u8) {
    match points {
        [] => {}
        [(x, y)] => plot_max(mask, *x, *y, intensity as f64),
        _ => {
            let as_f = |p: &(i64, i64)| (p.0 as f64, p.1 as f64);
            for pair in points.windows(2) {
                draw_line_aa(mask, as_f(&pair[0]), as_f(&pair[1]), intensity);
            }
            if closed {
                if let (Some(last), Some(first)) = (points.last(), points.first()) {
                    draw_line_aa(mask, as_f(last), as_f(first), intensity);
                }
            }
        }
    }
}

/// Filled disc centred on `(cx, cy)`, clipped to the buffer.
pub fn fill_disc(buffer: &mut Array2<[u8; 3]>, cx: i32, cy: i32, radius: i32, colour: [u8; 3]) {
    let (rows, cols) = buffer.dim();
    let r_sq = radius * radius;
    for dy in -radius..=radius {
        let y = cy + dy;
        if y < 0 || y as usize >= rows {
            continue;
        }
        for dx in -radius..=radius {
            let x = cx + dx;
            if x < 0 || x as usize >= cols || dx * dx + dy * dy > r_sq {
                continue;
            }
            buffer[[y as usize, x as usize]] = colour;
        }
    }
}
