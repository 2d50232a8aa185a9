//! Interactive state: the lens, the source, the screen buffers and the
//! control values, with one handler per user action.

use crate::physics::constants::{
    SOURCE_SIZE_DIVISOR, SOURCE_SIZE_RAW_DEFAULT, SOURCE_SIZE_RAW_MAX, WEIGHT_DIVISOR,
    WEIGHT_RAW_DEFAULT, WEIGHT_RAW_MAX,
};
use crate::physics::Lens;
use crate::rendering::{OverlayMode, RenderPass, RenderTarget, Renderer, Source};
use log::{debug, warn};
use ndarray::Array2;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("overlay mode {0} is out of range (0..=4)")]
    InvalidOverlayMode(u8),
}

/// Discrete user actions, as delivered by a mouse or slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    MoveLens { x: i32, y: i32 },
    /// Raw slider value; weight = raw / 20.
    SetWeight(u32),
    /// Slider position `0..=4`.
    SetOverlayMode(u8),
    /// Raw slider value; size factor = raw / 100.
    ResizeSource(u32),
}

pub struct Session {
    lens: Lens,
    source: Source,
    target: RenderTarget,
    overlay_mode: OverlayMode,
    weight_raw: u32,
    source_size_raw: u32,
    curves_stale: bool,
    curves_radial: bool,
}

impl Session {
    /// Takes ownership of the lens and source, applies the default weight and
    /// renders the first frame.
    pub fn new(lens: Lens, source: Source, width: usize, height: usize) -> Self {
        let mut session = Self {
            lens,
            source,
            target: RenderTarget::new(width, height),
            overlay_mode: OverlayMode::default(),
            weight_raw: WEIGHT_RAW_DEFAULT,
            source_size_raw: SOURCE_SIZE_RAW_DEFAULT,
            curves_stale: true,
            curves_radial: false,
        };
        session.apply_weight(WEIGHT_RAW_DEFAULT);
        session
    }

    pub fn handle(&mut self, event: ControlEvent) -> Result<(), SessionError> {
        debug!("Session event: {:?}", event);
        match event {
            ControlEvent::MoveLens { x, y } => {
                self.lens.move_to(x, y);
                self.refresh(RenderPass::Full);
            }
            ControlEvent::SetWeight(raw) => self.apply_weight(raw),
            ControlEvent::SetOverlayMode(index) => {
                let mode =
                    OverlayMode::from_index(index).ok_or(SessionError::InvalidOverlayMode(index))?;
                self.apply_overlay_mode(mode);
            }
            ControlEvent::ResizeSource(raw) => {
                let raw = clamp_raw("source size", raw, SOURCE_SIZE_RAW_MAX);
                self.source_size_raw = raw;
                self.source.resize_area(raw as f64 / SOURCE_SIZE_DIVISOR);
                self.refresh(RenderPass::Full);
            }
        }
        Ok(())
    }

    fn apply_weight(&mut self, raw: u32) {
        let raw = clamp_raw("weight", raw, WEIGHT_RAW_MAX);
        self.weight_raw = raw;
        self.lens.set_weight(raw as f64 / WEIGHT_DIVISOR);
        if self.overlay_mode.show_critical_curves() {
            self.extract_curves();
        } else {
            self.curves_stale = true;
        }
        self.refresh(RenderPass::Full);
    }

    fn apply_overlay_mode(&mut self, mode: OverlayMode) {
        self.overlay_mode = mode;
        if mode.show_critical_curves() {
            if self.curves_radial != mode.include_radial() {
                self.curves_stale = true;
            }
            if self.curves_stale {
                self.extract_curves();
            }
        }
        self.refresh(RenderPass::OverlayOnly);
    }

    fn extract_curves(&mut self) {
        let radial = self.overlay_mode.include_radial();
        self.lens.update_critical_curves(radial);
        self.curves_radial = radial;
        self.curves_stale = false;
    }

    fn refresh(&mut self, pass: RenderPass) {
        let start = Instant::now();
        Renderer::new(&self.lens, &self.source).render(&mut self.target, self.overlay_mode, pass);
        debug!("Rendered ({:?}) in {:?}", pass, start.elapsed());
    }

    /// Text shown while an overlay mode is active; empty when no overlays are drawn.
    pub fn status_message(&self) -> &'static str {
        self.overlay_mode.description()
    }

    pub fn overlay_mode(&self) -> OverlayMode {
        self.overlay_mode
    }

    pub fn weight_raw(&self) -> u32 {
        self.weight_raw
    }

    pub fn source_size_raw(&self) -> u32 {
        self.source_size_raw
    }

    pub fn curves_stale(&self) -> bool {
        self.curves_stale
    }

    pub fn lens(&self) -> &Lens {
        &self.lens
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn composited(&self) -> &Array2<[u8; 3]> {
        self.target.composited()
    }

    pub fn lensed(&self) -> &Array2<[u8; 3]> {
        self.target.lensed()
    }
}

fn clamp_raw(name: &str, raw: u32, max: u32) -> u32 {
    if raw > max {
        warn!("{} control value {} above maximum, using {}", name, raw, max);
        max
    } else {
        raw
    }
}
