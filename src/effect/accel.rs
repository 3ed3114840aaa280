//! Accel-meter: a spirit-level bubble positioned by the accelerometer.

use super::{Effect, Parameter, RenderContext, frame_due};
use crate::time::Millis;

const FRAME_INTERVAL: Millis = 10;

/// Maps the accelerometer x axis linearly onto the segment and draws a
/// bubble of configurable size at the mapped position.
pub struct AccelMeter {
    params: [Parameter; 2],
    last_update: Option<Millis>,
}

impl AccelMeter {
    /// Canonical registry name.
    pub const NAME: &'static str = "AccelMeter";

    /// Creates the effect with a green five-pixel bubble.
    pub fn new() -> Self {
        Self {
            params: [
                Parameter::color("color", 0x0000_FF00),
                Parameter::integer("size", 5, 1, 20),
            ],
            last_update: None,
        }
    }
}

impl Default for AccelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for AccelMeter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        if !frame_due(&mut self.last_update, ctx.now(), FRAME_INTERVAL) {
            return;
        }

        let len = ctx.len();
        let size = (self.params[1].as_i32().max(1) as usize).min(len);
        let travel = (len - size) as f32;

        // x in -1..=1 maps onto 0..=len-size
        let mapped = (ctx.accel_x() + 1.0) * travel / 2.0;
        let start = (mapped as i32).clamp(0, (len - size) as i32) as usize;

        ctx.clear_all();
        let color = self.params[0].as_color();
        for i in 0..size {
            ctx.set(start + i, color);
        }
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
