//! Theater chase: every third pixel lit, marching along the segment.

use super::{Effect, Parameter, RenderContext, frame_due};
use crate::color;
use crate::time::Millis;

/// Lights pixels where `(i - start) % 3` equals a rotating offset, with the
/// lit pixels' hue slowly walking the color wheel.
pub struct TheaterChase {
    params: [Parameter; 1],
    first_hue: u32,
    offset: u8,
    last_update: Option<Millis>,
}

impl TheaterChase {
    /// Canonical registry name.
    pub const NAME: &'static str = "TheaterChase";

    const HUE_STEP: u32 = 65536 / 90;

    /// Creates the effect at its default speed.
    pub fn new() -> Self {
        Self {
            params: [Parameter::integer("speed", 50, 5, 100)],
            first_hue: 0,
            offset: 0,
            last_update: None,
        }
    }
}

impl Default for TheaterChase {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for TheaterChase {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        let speed = self.params[0].as_i32() as Millis;
        if !frame_due(&mut self.last_update, ctx.now(), speed) {
            return;
        }

        ctx.clear_all();
        let len = ctx.len() as u32;
        let mut i = usize::from(self.offset);
        while i < ctx.len() {
            let hue = self.first_hue.wrapping_add(i as u32 * 65536 / len);
            ctx.set(i, color::hsv16(hue as u16, 255, 255));
            i += 3;
        }

        self.offset = (self.offset + 1) % 3;
        self.first_hue = self.first_hue.wrapping_add(Self::HUE_STEP);
    }

    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    fn parameter_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.params.get_mut(index)
    }
}
