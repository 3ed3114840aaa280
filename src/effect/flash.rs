//! Flash-on-trigger: a binary gate on the segment's trigger input.

use super::{Effect, Parameter, RenderContext};
use crate::color;

/// While the segment's trigger is active, fills the range with the base
/// color dimmed by the trigger intensity; otherwise the segment is dark.
pub struct FlashOnTrigger {
    params: [Parameter; 1],
}

impl FlashOnTrigger {
    /// Canonical registry name.
    pub const NAME: &'static str = "FlashOnTrigger";

    /// Creates the effect with a white base color.
    pub fn new() -> Self {
        Self {
            params: [Parameter::color("color", 0x00FF_FFFF)],
        }
    }
}

impl Default for FlashOnTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for FlashOnTrigger {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        if ctx.trigger_active() {
            let flash = color::scale(self.params[0].as_color(), ctx.trigger_level());
            for i in 0..ctx.len() {
                ctx.set(i, flash);
            }
        } else {
            ctx.clear_all();
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
