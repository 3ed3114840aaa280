//! Single-color fill.

use super::{Effect, Parameter, RenderContext};

/// Fills the whole segment with one configurable color.
pub struct SolidColor {
    params: [Parameter; 1],
}

impl SolidColor {
    /// Canonical registry name.
    pub const NAME: &'static str = "SolidColor";

    /// Creates the effect with its default purple fill.
    pub fn new() -> Self {
        Self {
            params: [Parameter::color("color", 0x0080_0080)],
        }
    }
}

impl Default for SolidColor {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for SolidColor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        let color = self.params[0].as_color();
        for i in 0..ctx.len() {
            ctx.set(i, color);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::ParamValue;
    use crate::effect::tests_support::run_frame;

    #[test]
    fn fills_the_segment_with_the_configured_color() {
        let mut fx = SolidColor::new();
        fx.set_parameter("color", ParamValue::Color(0x0000_00FF))
            .unwrap();
        let pixels = run_frame(&mut fx, 10, 255, 0);
        assert!(pixels.iter().all(|&px| px == 0x0000_00FF));
    }

    #[test]
    fn writes_are_dimmed_by_segment_brightness() {
        let mut fx = SolidColor::new();
        fx.set_parameter("color", ParamValue::Color(0x00FF_FFFF))
            .unwrap();
        let pixels = run_frame(&mut fx, 4, 127, 0);
        assert!(pixels.iter().all(|&px| px == 0x007F_7F7F));
    }
}
