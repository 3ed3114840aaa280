//! Kinetic ripple: a motion-triggered ring expanding from the center.

use super::{Effect, Parameter, RenderContext, frame_due};
use crate::color;
use crate::time::Millis;

const FRAME_INTERVAL: Millis = 5;
const MIN_LIFETIME_MS: Millis = 100;

/// On a rising edge of the shared motion trigger, draws two bars expanding
/// symmetrically from the segment midpoint, fading with distance. The ripple
/// ends once it has left the segment and lived at least 100 ms.
pub struct KineticRipple {
    params: [Parameter; 3],
    ripple_start: Option<Millis>,
    last_update: Option<Millis>,
}

impl KineticRipple {
    /// Canonical registry name.
    pub const NAME: &'static str = "KineticRipple";

    /// Creates the effect with its default color, width and speed.
    pub fn new() -> Self {
        Self {
            params: [
                Parameter::color("color", 0x0000_00FF),
                Parameter::integer("width", 3, 1, 20),
                Parameter::float("speed", 0.2, 0.01, 2.0),
            ],
            ripple_start: None,
            last_update: None,
        }
    }

    fn draw_bar(ctx: &mut RenderContext<'_>, center: i32, width: i32, color: color::Color) -> bool {
        let mut drawn = false;
        let half_width = width / 2;
        for i in 0..width {
            let pixel = center - half_width + i;
            if pixel >= 0 && (pixel as usize) < ctx.len() {
                ctx.set(pixel as usize, color);
                drawn = true;
            }
        }
        drawn
    }
}

impl Default for KineticRipple {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for KineticRipple {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        if !frame_due(&mut self.last_update, ctx.now(), FRAME_INTERVAL) {
            return;
        }

        if ctx.ripple_triggered() && self.ripple_start.is_none() {
            self.ripple_start = Some(ctx.now());
        }

        ctx.clear_all();

        let Some(started) = self.ripple_start else {
            return;
        };

        let elapsed = ctx.now() - started;
        let speed = self.params[2].as_f32();
        let radius = (elapsed as f32 * speed) as i32;

        let len = ctx.len() as i32;
        let center = (len - 1) / 2;
        let half_length = ((len - 1) / 2).max(1);

        // fade out proportionally to how far the ring has travelled
        let brightness = (255 - radius * 255 / half_length).clamp(0, 255) as u8;
        let faded = color::scale(self.params[0].as_color(), brightness);
        let width = self.params[1].as_i32().max(1);

        let mut drawn = Self::draw_bar(ctx, center + radius, width, faded);
        if radius != 0 {
            drawn |= Self::draw_bar(ctx, center - radius, width, faded);
        }

        if !drawn && elapsed > MIN_LIFETIME_MS {
            self.ripple_start = None;
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
