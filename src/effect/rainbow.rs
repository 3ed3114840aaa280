//! Rainbow family: a hue gradient sliding along the segment.

use super::{Effect, Parameter, RenderContext, frame_due};
use crate::color;
use crate::time::Millis;

/// Full saturation/value rainbow spread across the segment, with the hue
/// offset advancing 256 steps of the 16-bit hue space per frame.
pub struct RainbowChase {
    params: [Parameter; 1],
    first_hue: u32,
    last_update: Option<Millis>,
}

impl RainbowChase {
    /// Canonical registry name.
    pub const NAME: &'static str = "RainbowChase";

    /// Creates the effect at its default speed.
    pub fn new() -> Self {
        Self {
            params: [Parameter::integer("speed", 30, 5, 100)],
            first_hue: 0,
            last_update: None,
        }
    }
}

impl Default for RainbowChase {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for RainbowChase {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        let speed = self.params[0].as_i32() as Millis;
        if !frame_due(&mut self.last_update, ctx.now(), speed) {
            return;
        }

        paint_rainbow(ctx, self.first_hue);
        self.first_hue = self.first_hue.wrapping_add(256);
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

/// Same gradient as [`RainbowChase`] but the hue offset wraps after five
/// turns of the color wheel, restarting the cycle.
pub struct RainbowCycle {
    params: [Parameter; 1],
    first_hue: u32,
    last_update: Option<Millis>,
}

impl RainbowCycle {
    /// Canonical registry name.
    pub const NAME: &'static str = "RainbowCycle";

    const WRAP: u32 = 5 * 65536;

    /// Creates the effect at its default speed.
    pub fn new() -> Self {
        Self {
            params: [Parameter::integer("speed", 20, 5, 100)],
            first_hue: 0,
            last_update: None,
        }
    }
}

impl Default for RainbowCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for RainbowCycle {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        let speed = self.params[0].as_i32() as Millis;
        if !frame_due(&mut self.last_update, ctx.now(), speed) {
            return;
        }

        paint_rainbow(ctx, self.first_hue);
        self.first_hue = (self.first_hue + 256) % Self::WRAP;
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

fn paint_rainbow(ctx: &mut RenderContext<'_>, first_hue: u32) {
    let len = ctx.len() as u32;
    for i in 0..ctx.len() {
        let hue = first_hue.wrapping_add(i as u32 * 65536 / len);
        ctx.set(i, color::hsv16(hue as u16, 255, 255));
    }
}
