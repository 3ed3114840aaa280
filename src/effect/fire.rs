//! Fire family: heat-diffusion simulations rendered through color ramps.
//!
//! All three variants share the same per-cell dynamics: cool every cell by a
//! random amount scaled by `cooling`, diffuse heat upward, then randomly
//! inject sparks near the base with probability `sparking`/255. They differ
//! in how heat maps to color and in where the spark probability comes from.

use alloc::vec;
use alloc::vec::Vec;

use rand::Rng;
use rand::rngs::SmallRng;

use super::{Effect, Parameter, RenderContext, frame_due};
use crate::color;
use crate::time::Millis;

const FRAME_INTERVAL: Millis = 15;

/// One step of the shared heat simulation over `heat[..len]`.
fn advance_heat(heat: &mut [u8], cooling: u8, sparking: u8, rng: &mut SmallRng) {
    let len = heat.len();
    if len == 0 {
        return;
    }

    // Cool down every cell a little
    let max_cool = u32::from(cooling) * 10 / len as u32 + 2;
    for cell in heat.iter_mut() {
        *cell = cell.saturating_sub(rng.gen_range(0..max_cool) as u8);
    }

    // Heat drifts up and diffuses
    for k in (2..len).rev() {
        heat[k] = ((u16::from(heat[k - 1]) + 2 * u16::from(heat[k - 2])) / 3) as u8;
    }

    // Randomly ignite new sparks near the base
    if rng.gen_range(0..255u32) < u32::from(sparking) {
        let y = rng.gen_range(0..len.min(7));
        heat[y] = heat[y].saturating_add(rng.gen_range(160..255u32) as u8);
    }
}

/// Classic fire: monochrome heat ramp from red through yellow to white.
pub struct Fire {
    params: [Parameter; 2],
    heat: Vec<u8>,
    last_update: Option<Millis>,
}

impl Fire {
    /// Canonical registry name.
    pub const NAME: &'static str = "Fire";

    /// Creates the effect with a heat buffer sized to the owning segment.
    pub fn new(segment_len: usize) -> Self {
        Self {
            params: [
                Parameter::integer("sparking", 120, 0, 255),
                Parameter::integer("cooling", 55, 0, 100),
            ],
            heat: vec![0; segment_len],
            last_update: None,
        }
    }
}

impl Effect for Fire {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        if !frame_due(&mut self.last_update, ctx.now(), FRAME_INTERVAL) {
            return;
        }

        // The buffer was sized at construction; a re-ranged segment only
        // gets a bigger buffer on effect replacement.
        let len = self.heat.len().min(ctx.len());
        let sparking = self.params[0].as_i32() as u8;
        let cooling = self.params[1].as_i32() as u8;
        advance_heat(&mut self.heat[..len], cooling, sparking, ctx.rng());

        for j in 0..len {
            ctx.set(j, color::heat_ramp(self.heat[j]));
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

/// Fire dynamics rendered through a piecewise-linear ramp across three
/// configurable colors.
pub struct ColoredFire {
    params: [Parameter; 5],
    heat: Vec<u8>,
    last_update: Option<Millis>,
}

impl ColoredFire {
    /// Canonical registry name.
    pub const NAME: &'static str = "ColoredFire";

    /// Creates the effect with a heat buffer sized to the owning segment.
    pub fn new(segment_len: usize) -> Self {
        Self {
            params: [
                Parameter::integer("sparking", 120, 0, 255),
                Parameter::integer("cooling", 55, 0, 100),
                Parameter::color("color1", 0x0000_0000),
                Parameter::color("color2", 0x00FF_0000),
                Parameter::color("color3", 0x00FF_FF00),
            ],
            heat: vec![0; segment_len],
            last_update: None,
        }
    }
}

impl Effect for ColoredFire {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        if !frame_due(&mut self.last_update, ctx.now(), FRAME_INTERVAL) {
            return;
        }

        let len = self.heat.len().min(ctx.len());
        let sparking = self.params[0].as_i32() as u8;
        let cooling = self.params[1].as_i32() as u8;
        advance_heat(&mut self.heat[..len], cooling, sparking, ctx.rng());

        let c1 = self.params[2].as_color();
        let c2 = self.params[3].as_color();
        let c3 = self.params[4].as_color();
        for j in 0..len {
            ctx.set(j, color::heat_ramp3(self.heat[j], c1, c2, c3));
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

/// Smoldering embers that flare up while the segment's trigger is active.
///
/// The baseline `sparking` stays low; a trigger scales the effective spark
/// probability by the trigger intensity.
pub struct Flare {
    params: [Parameter; 2],
    heat: Vec<u8>,
    last_update: Option<Millis>,
}

impl Flare {
    /// Canonical registry name.
    pub const NAME: &'static str = "Flare";

    /// Creates the effect with a heat buffer sized to the owning segment.
    pub fn new(segment_len: usize) -> Self {
        Self {
            params: [
                Parameter::integer("sparking", 50, 0, 255),
                Parameter::integer("cooling", 80, 0, 100),
            ],
            heat: vec![0; segment_len],
            last_update: None,
        }
    }
}

impl Effect for Flare {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, ctx: &mut RenderContext<'_>) {
        if !frame_due(&mut self.last_update, ctx.now(), FRAME_INTERVAL) {
            return;
        }

        let len = self.heat.len().min(ctx.len());
        let cooling = self.params[1].as_i32() as u8;
        let sparking = if ctx.trigger_active() {
            // a beat maps trigger intensity onto 150..=255 spark chance
            150 + (u32::from(ctx.trigger_level()) * 105 / 255) as u8
        } else {
            self.params[0].as_i32() as u8
        };
        advance_heat(&mut self.heat[..len], cooling, sparking, ctx.rng());

        for j in 0..len {
            ctx.set(j, color::heat_ramp(self.heat[j]));
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
    use crate::color::{BLACK, blue, green, red};
    use crate::effect::ParamValue;
    use crate::effect::tests_support::Harness;
    use crate::inputs::SensorSnapshot;

    fn run_frames(fx: &mut dyn Effect, h: &mut Harness, frames: usize) {
        for _ in 0..frames {
            h.frame(fx, 255);
            h.advance(FRAME_INTERVAL);
        }
    }

    #[test]
    fn sparks_eventually_light_the_base() {
        let mut fx = Fire::new(30);
        fx.set_parameter("sparking", ParamValue::Integer(255))
            .unwrap();
        let mut h = Harness::new(30);
        run_frames(&mut fx, &mut h, 50);

        assert!(
            h.pixels.iter().any(|&px| px != BLACK),
            "a fully sparking fire must light some pixels"
        );
    }

    #[test]
    fn zero_sparking_cools_to_black() {
        let mut fx = Fire::new(20);
        fx.set_parameter("sparking", ParamValue::Integer(255))
            .unwrap();
        let mut h = Harness::new(20);
        run_frames(&mut fx, &mut h, 30);

        fx.set_parameter("sparking", ParamValue::Integer(0)).unwrap();
        run_frames(&mut fx, &mut h, 400);
        assert!(h.pixels.iter().all(|&px| px == BLACK));
    }

    #[test]
    fn fire_palette_stays_on_the_heat_ramp() {
        let mut fx = Fire::new(30);
        fx.set_parameter("sparking", ParamValue::Integer(255))
            .unwrap();
        let mut h = Harness::new(30);
        run_frames(&mut fx, &mut h, 60);

        // red dominates green dominates blue on the monotone ramp
        for &px in &h.pixels {
            assert!(red(px) >= green(px));
            assert!(green(px) >= blue(px) || blue(px) == 0);
        }
    }

    #[test]
    fn heat_buffer_clamps_against_a_shrunk_segment() {
        // effect built for 30 pixels, segment re-ranged down to 5
        let mut fx = Fire::new(30);
        fx.set_parameter("sparking", ParamValue::Integer(255))
            .unwrap();
        let mut h = Harness::new(5);
        run_frames(&mut fx, &mut h, 20);
        // reaching here without a panic is the point; writes stayed in range
        assert_eq!(h.pixels.len(), 5);
    }

    #[test]
    fn colored_fire_uses_its_anchor_colors() {
        let mut fx = ColoredFire::new(20);
        fx.set_parameter("sparking", ParamValue::Integer(255))
            .unwrap();
        fx.set_parameter("color1", ParamValue::Color(0x0000_0000))
            .unwrap();
        fx.set_parameter("color2", ParamValue::Color(0x0000_00FF))
            .unwrap();
        fx.set_parameter("color3", ParamValue::Color(0x0000_00FF))
            .unwrap();
        let mut h = Harness::new(20);
        run_frames(&mut fx, &mut h, 60);

        // with an all-blue ramp nothing red or green may ever appear
        for &px in &h.pixels {
            assert_eq!(red(px), 0);
            assert_eq!(green(px), 0);
        }
        assert!(h.pixels.iter().any(|&px| blue(px) > 0));
    }

    #[test]
    fn flare_stays_dim_until_triggered() {
        let mut fx = Flare::new(30);
        fx.set_parameter("sparking", ParamValue::Integer(0)).unwrap();
        let mut h = Harness::new(30);
        run_frames(&mut fx, &mut h, 50);
        let quiet: u32 = h.pixels.iter().map(|&px| u32::from(red(px))).sum();

        // drive frames with the trigger held active at full intensity
        let snap = SensorSnapshot::default();
        for _ in 0..50 {
            h.frame_with(&mut fx, 255, &snap, true, 255);
            h.advance(FRAME_INTERVAL);
        }
        let loud: u32 = h.pixels.iter().map(|&px| u32::from(red(px))).sum();
        assert!(
            loud > quiet,
            "triggered flare ({loud}) should outshine quiet embers ({quiet})"
        );
    }

    #[test]
    fn rate_limit_holds_frames_between_intervals() {
        let mut fx = Fire::new(10);
        let mut h = Harness::new(10);
        h.frame(&mut fx, 255);
        let first = h.pixels.clone();
        h.advance(5);
        h.frame(&mut fx, 255);
        assert_eq!(h.pixels, first);
    }
}
