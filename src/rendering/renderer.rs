//! Per-pixel compositing of the lensed source with the lens overlays.
//!
//! A full pass ray-traces every screen pixel through the lens and samples the
//! source; an overlay-only pass reuses the lensed buffer from the previous
//! full pass and only recomposites the overlays on top of it.

use crate::parallel::for_each_row_pair;
use crate::physics::constants::{
    CAUSTIC_RGB, CRITICAL_CURVE_RGB, CURVE_INTENSITY, SOURCE_MARKER_GREY, SOURCE_MARKER_RADIUS,
};
use crate::physics::field_math::FallOff;
use crate::physics::Lens;
use crate::rendering::raster::fill_disc;
use crate::rendering::source::Source;
use ndarray::Array2;

/// Which overlay layers are drawn on top of the lensed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    None,
    #[default]
    Convergence,
    CriticalCurves,
    CriticalCurvesWithRadial,
    ConvergenceAndCriticalCurves,
}

impl OverlayMode {
    pub const ALL: [OverlayMode; 5] = [
        OverlayMode::None,
        OverlayMode::Convergence,
        OverlayMode::CriticalCurves,
        OverlayMode::CriticalCurvesWithRadial,
        OverlayMode::ConvergenceAndCriticalCurves,
    ];

    /// Slider position `0..=4`.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u8 {
        match self {
            OverlayMode::None => 0,
            OverlayMode::Convergence => 1,
            OverlayMode::CriticalCurves => 2,
            OverlayMode::CriticalCurvesWithRadial => 3,
            OverlayMode::ConvergenceAndCriticalCurves => 4,
        }
    }

    pub fn show_overlays(self) -> bool {
        self != OverlayMode::None
    }

    pub fn show_convergence(self) -> bool {
        matches!(
            self,
            OverlayMode::Convergence | OverlayMode::ConvergenceAndCriticalCurves
        )
    }

    /// Critical curves and caustics.
    pub fn show_critical_curves(self) -> bool {
        matches!(
            self,
            OverlayMode::CriticalCurves
                | OverlayMode::CriticalCurvesWithRadial
                | OverlayMode::ConvergenceAndCriticalCurves
        )
    }

    pub fn include_radial(self) -> bool {
        matches!(
            self,
            OverlayMode::CriticalCurvesWithRadial | OverlayMode::ConvergenceAndCriticalCurves
        )
    }

    pub fn marks_source(self) -> bool {
        self.show_critical_curves()
    }

    pub fn description(self) -> &'static str {
        match self {
            OverlayMode::None => "",
            OverlayMode::Convergence => "Add lens convergence",
            OverlayMode::CriticalCurves => "Add critical curves (t) + source center (dot)",
            OverlayMode::CriticalCurvesWithRadial => {
                "Add critical curves (t+r) + source center (dot)"
            }
            OverlayMode::ConvergenceAndCriticalCurves => {
                "Add lens + critical curves + source center (dot)"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Ray-trace every pixel, then composite.
    Full,
    /// Recomposite overlays over the lensed buffer of the last full pass.
    OverlayOnly,
}

/// Screen-sized RGB buffers written by the renderer.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    lensed: Array2<[u8; 3]>,
    composited: Array2<[u8; 3]>,
}

impl RenderTarget {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            lensed: Array2::from_elem((height, width), [0; 3]),
            composited: Array2::from_elem((height, width), [0; 3]),
        }
    }

    pub fn width(&self) -> usize {
        self.lensed.ncols()
    }

    pub fn height(&self) -> usize {
        self.lensed.nrows()
    }

    /// Ray-traced source colours before any overlay.
    pub fn lensed(&self) -> &Array2<[u8; 3]> {
        &self.lensed
    }

    /// Final image shown to the user.
    pub fn composited(&self) -> &Array2<[u8; 3]> {
        &self.composited
    }
}

/// Read-only view of a lens and a source for one render pass.
pub struct Renderer<'a> {
    lens: &'a Lens,
    source: &'a Source,
}

impl<'a> Renderer<'a> {
    pub fn new(lens: &'a Lens, source: &'a Source) -> Self {
        Self { lens, source }
    }

    pub fn render(&self, target: &mut RenderTarget, mode: OverlayMode, pass: RenderPass) {
        let lens = self.lens;
        let source = self.source;
        let recompute = pass == RenderPass::Full;

        let show_overlays = mode.show_overlays();
        let show_cc = mode.show_critical_curves();
        let show_kappa = mode.show_convergence();

        let (ox, oy) = lens.origin();
        let fall_x = FallOff::new(lens.width());
        let fall_y = FallOff::new(lens.height());
        let critical = lens.critical_curves();
        let caustics = lens.caustics();
        let kappa8 = lens.convergence_display();
        let cols = target.width();

        for_each_row_pair(
            &mut target.lensed,
            &mut target.composited,
            |i, mut lensed, mut out| {
                let y = i as i32;
                let rel_i = y - oy;
                let (safe_i, fi) = if recompute {
                    fall_y.apply(rel_i)
                } else {
                    (0, 1.0)
                };

                for j in 0..cols {
                    let x = j as i32;
                    let rel_j = x - ox;

                    let mut overlay = 0u32;
                    let mut on_caustic = false;
                    if show_overlays && lens.contains(x, y) {
                        let (ri, rj) = (rel_i as usize, rel_j as usize);
                        if show_cc {
                            let cc = critical[[ri, rj]];
                            if cc == CURVE_INTENSITY && !recompute {
                                out[j] = CRITICAL_CURVE_RGB;
                                continue;
                            }
                            overlay += cc as u32;

                            if caustics[[ri, rj]] > 0 {
                                on_caustic = true;
                                out[j] = CAUSTIC_RGB;
                                if !recompute {
                                    continue;
                                }
                            }
                        }
                        if show_kappa {
                            overlay += kappa8[[ri, rj]] as u32;
                        }
                    }

                    if recompute {
                        let (safe_j, fj) = fall_x.apply(rel_j);
                        let (b1, b2) = lens.raytrace_pixel(x, y, safe_j, safe_i, fi * fj);
                        lensed[j] = source.interpolated_pixel(b1, b2);
                    }

                    if !on_caustic {
                        out[j] = lensed[j].map(|c| (c as u32 + overlay).min(255) as u8);
                    }
                }
            },
        );

        if mode.marks_source() {
            let (sx, sy) = source.position();
            fill_disc(
                &mut target.composited,
                sx,
                sy,
                SOURCE_MARKER_RADIUS,
                [SOURCE_MARKER_GREY; 3],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ConvergenceMap;
    use image::{Rgb, RgbImage};

    fn checker(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 13 % 256) as u8, (y * 17 % 256) as u8, ((x + y) * 5 % 256) as u8])
        })
    }

    fn flat_lens(w: usize, h: usize, cx: i32, cy: i32) -> Lens {
        Lens::new(ConvergenceMap::Physical(Array2::zeros((h, w))), cx, cy).unwrap()
    }

    #[test]
    fn test_overlay_mode_flags() {
        assert_eq!(OverlayMode::default(), OverlayMode::Convergence);
        for (i, mode) in OverlayMode::ALL.iter().enumerate() {
            assert_eq!(OverlayMode::from_index(i as u8), Some(*mode));
            assert_eq!(mode.index() as usize, i);
            assert_eq!(mode.show_overlays(), i > 0);
            assert_eq!(mode.show_convergence(), i == 1 || i == 4);
            assert_eq!(mode.show_critical_curves(), (2..=4).contains(&i));
            assert_eq!(mode.include_radial(), i == 3 || i == 4);
        }
        assert_eq!(OverlayMode::from_index(5), None);
    }

    #[test]
    fn test_flat_lens_reproduces_source() {
        let image = checker(12, 10);
        let lens = flat_lens(6, 6, 6, 5);
        let source = Source::new(image.clone(), 6, 5).unwrap();
        let mut target = RenderTarget::new(12, 10);
        Renderer::new(&lens, &source).render(&mut target, OverlayMode::None, RenderPass::Full);

        for y in 0..10 {
            for x in 0..12 {
                let expected = if x == 0 || y == 0 {
                    [0; 3]
                } else {
                    image.get_pixel(x as u32, y as u32).0
                };
                assert_eq!(target.lensed()[[y, x]], expected);
                assert_eq!(target.composited()[[y, x]], expected);
            }
        }
    }

    #[test]
    fn test_convergence_overlay_saturates() {
        let kappa = Array2::from_elem((4, 4), 1.0);
        let lens = Lens::new(ConvergenceMap::Physical(kappa), 5, 5).unwrap();
        let source = Source::new(RgbImage::from_pixel(20, 20, Rgb([100, 50, 0])), 5, 5).unwrap();
        let mut target = RenderTarget::new(10, 10);
        let renderer = Renderer::new(&lens, &source);
        renderer.render(&mut target, OverlayMode::None, RenderPass::Full);
        let lensed = target.lensed()[[5, 5]];

        renderer.render(&mut target, OverlayMode::Convergence, RenderPass::OverlayOnly);
        assert_eq!(target.lensed()[[5, 5]], lensed);
        // display byte for kappa = 1 is 175
        let expected = lensed.map(|c| (c as u32 + 175).min(255) as u8);
        assert_eq!(target.composited()[[5, 5]], expected);
        // outside the lens footprint nothing is added
        assert_eq!(target.composited()[[0, 0]], target.lensed()[[0, 0]]);
    }

    #[test]
    fn test_overlay_only_keeps_lensed_buffer() {
        let lens = flat_lens(6, 6, 6, 5);
        let source = Source::new(checker(12, 10), 6, 5).unwrap();
        let mut target = RenderTarget::new(12, 10);
        let renderer = Renderer::new(&lens, &source);
        renderer.render(&mut target, OverlayMode::None, RenderPass::Full);
        let before = target.lensed().clone();

        let moved = Source::new(checker(12, 10), 0, 0).unwrap();
        Renderer::new(&lens, &moved).render(&mut target, OverlayMode::None, RenderPass::OverlayOnly);
        assert_eq!(target.lensed(), &before);
        assert_eq!(target.composited(), &before);
    }

    /// Supercritical disc with both curve branches inside a 64x64 map.
    fn disc_lens(cx: i32, cy: i32) -> Lens {
        let kappa = Array2::from_shape_fn((64, 64), |(i, j)| {
            let (dx, dy) = (j as f64 - 32.0, i as f64 - 32.0);
            if dx * dx + dy * dy < 64.0 {
                8.0
            } else {
                0.0
            }
        });
        Lens::new(ConvergenceMap::Physical(kappa), cx, cy).unwrap()
    }

    #[test]
    fn test_critical_curves_and_caustics_are_drawn() {
        let lens = disc_lens(32, 32);
        let source = Source::new(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])), 100, 100).unwrap();
        let mut target = RenderTarget::new(64, 64);
        let renderer = Renderer::new(&lens, &source);
        renderer.render(&mut target, OverlayMode::None, RenderPass::Full);
        renderer.render(
            &mut target,
            OverlayMode::CriticalCurvesWithRadial,
            RenderPass::OverlayOnly,
        );

        let (ox, oy) = lens.origin();
        let mut saw_curve = false;
        let mut saw_caustic = false;
        for ((ri, rj), &cc) in lens.critical_curves().indexed_iter() {
            let (x, y) = (rj as i32 + ox, ri as i32 + oy);
            if !lens.contains(x, y) {
                continue;
            }
            let px = target.composited()[[y as usize, x as usize]];
            if cc == 255 {
                assert_eq!(px, CRITICAL_CURVE_RGB);
                saw_curve = true;
            } else if cc == 0 && lens.caustics()[[ri, rj]] > 0 {
                assert_eq!(px, CAUSTIC_RGB);
                saw_caustic = true;
            }
        }
        assert!(saw_curve);
        assert!(saw_caustic);
    }

    #[test]
    fn test_full_pass_with_curves_composites_over_lensed() {
        let lens = disc_lens(32, 32);
        // marker disc at (72, 72) stays clear of the lens footprint
        let source = Source::new(checker(160, 160), 72, 72).unwrap();
        let renderer = Renderer::new(&lens, &source);

        let mut plain = RenderTarget::new(80, 80);
        renderer.render(&mut plain, OverlayMode::None, RenderPass::Full);
        let mut target = RenderTarget::new(80, 80);
        renderer.render(&mut target, OverlayMode::CriticalCurvesWithRadial, RenderPass::Full);

        // caustic and curve pixels are still ray-traced
        assert_eq!(target.lensed(), plain.lensed());

        let (ox, oy) = lens.origin();
        let mut saw_white = false;
        let mut saw_caustic = false;
        for ((ri, rj), &cc) in lens.critical_curves().indexed_iter() {
            let (x, y) = (rj as i32 + ox, ri as i32 + oy);
            if !lens.contains(x, y) {
                continue;
            }
            let (xu, yu) = (x as usize, y as usize);
            let px = target.composited()[[yu, xu]];
            let lensed = target.lensed()[[yu, xu]];
            if lens.caustics()[[ri, rj]] > 0 {
                assert_eq!(px, CAUSTIC_RGB);
                if cc == 0 {
                    let (b1, b2) = lens.raytrace_pixel(x, y, rj, ri, 1.0);
                    assert_eq!(lensed, source.interpolated_pixel(b1, b2));
                    saw_caustic = true;
                }
            } else if cc == 255 {
                assert_eq!(px, [255, 255, 255]);
                saw_white = true;
            } else {
                assert_eq!(px, lensed.map(|c| (c as u32 + cc as u32).min(255) as u8));
            }
        }
        assert!(saw_white);
        assert!(saw_caustic);

        for (x, y) in [(70, 10), (10, 70), (0, 0), (64, 30)] {
            assert_eq!(target.composited()[[y, x]], target.lensed()[[y, x]]);
        }
        assert_eq!(target.composited()[[72, 72]], [SOURCE_MARKER_GREY; 3]);
    }

    #[test]
    fn test_source_marker_drawn_for_curve_modes() {
        let lens = flat_lens(4, 4, 50, 50);
        let source = Source::new(checker(8, 8), 20, 20).unwrap();
        let mut target = RenderTarget::new(40, 40);
        let renderer = Renderer::new(&lens, &source);

        renderer.render(&mut target, OverlayMode::Convergence, RenderPass::Full);
        assert_ne!(target.composited()[[20, 27]], [SOURCE_MARKER_GREY; 3]);

        renderer.render(&mut target, OverlayMode::CriticalCurves, RenderPass::OverlayOnly);
        assert_eq!(target.composited()[[20, 20]], [SOURCE_MARKER_GREY; 3]);
        assert_eq!(target.composited()[[20, 27]], [SOURCE_MARKER_GREY; 3]);
        assert_eq!(target.composited()[[28, 20]], [0; 3]);
    }
}
