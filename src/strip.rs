//! The strip: pixel buffer, hardware seam and segment collection.

use alloc::vec;
use alloc::vec::Vec;

use crate::color::{self, Color};
use crate::effect::{Effect, RenderContext};
use crate::inputs::SensorSnapshot;
use crate::segment::{ROOT_SEGMENT_NAME, Segment, SegmentError};
use crate::time::Millis;

/// Trait for abstracting the pixel bus hardware.
///
/// Implement this for your LED driver (RMT, PIO, SPI, bit-banged...) to let
/// the strip latch rendered frames. Handle any hardware errors internally -
/// this method cannot fail.
pub trait PixelBus {
    /// Pushes the rendered buffer to the LEDs.
    fn latch(&mut self, pixels: &[Color]);
}

/// An ordered buffer of packed `0x00RRGGBB` pixels.
///
/// Mutated only by effects through their [`RenderContext`] or by segment
/// blanking; every write index is bounds-checked against the pixel count.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pixels: Vec<Color>,
}

impl PixelBuffer {
    /// Creates an all-black buffer of `len` pixels.
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![color::BLACK; len],
        }
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True when the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Writes one pixel. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, color: Color) {
        if let Some(px) = self.pixels.get_mut(index) {
            *px = color;
        }
    }

    /// Reads one pixel; black for out-of-range indices.
    pub fn get(&self, index: usize) -> Color {
        self.pixels.get(index).copied().unwrap_or(color::BLACK)
    }

    /// Turns an inclusive index range off.
    pub fn clear_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.pixels.len().saturating_sub(1));
        if start <= end {
            for px in &mut self.pixels[start..=end] {
                *px = color::BLACK;
            }
        }
    }

    /// Turns every pixel off.
    pub fn clear_all(&mut self) {
        self.pixels.fill(color::BLACK);
    }

    /// The raw pixel words.
    pub fn as_slice(&self) -> &[Color] {
        &self.pixels
    }

    fn as_mut_slice(&mut self) -> &mut [Color] {
        &mut self.pixels
    }
}

/// The whole pixel chain plus its segment collection.
///
/// Exactly one segment exists at construction: id 0, named `"all"`, spanning
/// the full strip. It is permanent; user segments come and go around it.
///
/// # Type Parameters
/// * `B` - Pixel bus implementation type
pub struct Strip<B: PixelBus> {
    bus: B,
    buffer: PixelBuffer,
    segments: Vec<Segment>,
    next_id: u8,
}

impl<B: PixelBus> Strip<B> {
    /// Creates a strip of `led_count` pixels with the permanent root segment
    /// at `default_brightness`.
    pub fn new(bus: B, led_count: u16, default_brightness: u8) -> Self {
        let led_count = led_count.max(1);
        let root = Segment::new(0, 0, led_count - 1, ROOT_SEGMENT_NAME, default_brightness);
        Self {
            bus,
            buffer: PixelBuffer::new(usize::from(led_count)),
            segments: vec![root],
            next_id: 1,
        }
    }

    /// Number of pixels on the strip.
    pub fn pixel_count(&self) -> u16 {
        self.buffer.len() as u16
    }

    /// Segments in insertion order; the root segment is always first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Looks up a segment by id.
    pub fn segment(&self, id: u8) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == id)
    }

    /// Looks up a segment by id, mutably.
    pub fn segment_mut(&mut self, id: u8) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id() == id)
    }

    /// Adds a user segment and returns its freshly assigned id.
    ///
    /// Ids are monotonic and never reused for the lifetime of the strip.
    pub fn add_segment(&mut self, start: u16, end: u16, name: &str) -> Result<u8, SegmentError> {
        let id = self.next_id;
        if id == u8::MAX {
            return Err(SegmentError::IdSpaceExhausted);
        }
        self.insert_segment(id, start, end, name)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Adds a user segment under an id taken from a configuration document,
    /// bumping the id allocator past it so saved ids round-trip.
    pub(crate) fn adopt_segment(
        &mut self,
        id: u8,
        start: u16,
        end: u16,
        name: &str,
    ) -> Result<u8, SegmentError> {
        if self.segment(id).is_some() {
            return self.add_segment(start, end, name);
        }
        self.insert_segment(id, start, end, name)?;
        self.next_id = self.next_id.max(id.saturating_add(1));
        Ok(id)
    }

    fn insert_segment(
        &mut self,
        id: u8,
        start: u16,
        end: u16,
        name: &str,
    ) -> Result<(), SegmentError> {
        let led_count = self.pixel_count();
        if start > end || end >= led_count {
            return Err(SegmentError::InvalidRange {
                start,
                end,
                led_count,
            });
        }
        self.segments.push(Segment::new(id, start, end, name, 255));
        Ok(())
    }

    /// Removes every segment with id != 0. Their effects are dropped with
    /// them; the root segment is untouched.
    pub fn remove_user_segments(&mut self) {
        self.segments.retain(|s| s.id() == 0);
    }

    /// Changes one segment's range, validating against the pixel count.
    pub fn set_segment_range(&mut self, id: u8, start: u16, end: u16) -> Result<(), SegmentError> {
        let led_count = self.pixel_count();
        let seg = self
            .segment_mut(id)
            .ok_or(SegmentError::UnknownSegment(id))?;
        seg.set_range(start, end, led_count)
    }

    /// Latches the externally produced trigger pair into every segment.
    pub fn propagate_trigger(&mut self, active: bool, level: u8) {
        for seg in &mut self.segments {
            seg.set_trigger(active, level);
        }
    }

    /// Renders one frame: every segment in insertion order, each delegating
    /// to its bound effect or blanking its range.
    ///
    /// Later segments overwrite earlier ones where ranges overlap -
    /// deliberate last-writer-wins compositing, with the root segment drawn
    /// first.
    pub fn render_tick(&mut self, now: Millis, inputs: &SensorSnapshot) {
        let buffer = &mut self.buffer;
        for seg in &mut self.segments {
            let start = usize::from(seg.start);
            let end = usize::from(seg.end);
            // Take the effect out for the duration of the frame so the
            // context can borrow the segment's RNG alongside the buffer.
            let mut effect = seg.effect.take();
            match effect.as_mut() {
                Some(fx) => {
                    let mut ctx = RenderContext::new(
                        buffer.as_mut_slice(),
                        start,
                        end,
                        seg.brightness(),
                        seg.trigger_active(),
                        seg.trigger_level(),
                        now,
                        inputs,
                        &mut seg.rng,
                    );
                    fx.update(&mut ctx);
                }
                None => buffer.clear_range(start, end),
            }
            seg.effect = effect;
        }
    }

    /// Pushes the buffer to the hardware.
    pub fn latch(&mut self) {
        self.bus.latch(self.buffer.as_slice());
    }

    /// Writes one pixel directly. Used by effects through their context;
    /// exposed for diagnostics.
    pub fn set_pixel(&mut self, index: usize, color: Color) {
        self.buffer.set(index, color);
    }

    /// Turns one pixel off.
    pub fn clear_pixel(&mut self, index: usize) {
        self.buffer.set(index, color::BLACK);
    }

    /// The rendered buffer.
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// The pixel bus, e.g. to inspect a mock in tests.
    pub fn bus(&self) -> &B {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::registry::create_effect;
    use crate::effect::Effect;
    use alloc::vec::Vec;

    // Mock bus that records every latched frame
    struct MockBus {
        frames: core::cell::RefCell<Vec<Vec<Color>>>,
    }

    impl MockBus {
        fn new() -> Self {
            Self {
                frames: core::cell::RefCell::new(Vec::new()),
            }
        }
    }

    impl PixelBus for MockBus {
        fn latch(&mut self, pixels: &[Color]) {
            self.frames.borrow_mut().push(pixels.to_vec());
        }
    }

    fn strip() -> Strip<MockBus> {
        Strip::new(MockBus::new(), 150, 10)
    }

    #[test]
    fn construction_creates_permanent_root_segment() {
        let s = strip();
        assert_eq!(s.pixel_count(), 150);
        assert_eq!(s.segments().len(), 1);
        let root = &s.segments()[0];
        assert_eq!(root.id(), 0);
        assert_eq!(root.name(), "all");
        assert_eq!(root.start(), 0);
        assert_eq!(root.end(), 149);
        assert_eq!(root.brightness(), 10);
    }

    #[test]
    fn add_segment_assigns_monotonic_ids() {
        let mut s = strip();
        assert_eq!(s.add_segment(0, 9, "a").unwrap(), 1);
        assert_eq!(s.add_segment(10, 19, "b").unwrap(), 2);
        s.remove_user_segments();
        // ids are never reused, even after a clear
        assert_eq!(s.add_segment(0, 9, "c").unwrap(), 3);
    }

    #[test]
    fn add_segment_rejects_bad_ranges() {
        let mut s = strip();
        assert!(matches!(
            s.add_segment(10, 9, "x"),
            Err(SegmentError::InvalidRange { .. })
        ));
        assert!(matches!(
            s.add_segment(0, 150, "x"),
            Err(SegmentError::InvalidRange { .. })
        ));
    }

    #[test]
    fn remove_user_segments_preserves_root_untouched() {
        let mut s = strip();
        s.add_segment(10, 19, "wrist").unwrap();
        s.add_segment(20, 29, "arm").unwrap();
        let root_brightness = s.segments()[0].brightness();
        s.remove_user_segments();
        assert_eq!(s.segments().len(), 1);
        assert_eq!(s.segments()[0].id(), 0);
        assert_eq!(s.segments()[0].brightness(), root_brightness);
    }

    #[test]
    fn adopt_segment_round_trips_document_ids() {
        let mut s = strip();
        assert_eq!(s.adopt_segment(5, 0, 9, "five").unwrap(), 5);
        // allocator moved past the adopted id
        assert_eq!(s.add_segment(10, 19, "next").unwrap(), 6);
        // an already-taken id falls back to a fresh one
        assert_eq!(s.adopt_segment(5, 20, 29, "dup").unwrap(), 7);
    }

    #[test]
    fn set_segment_range_validates_and_applies() {
        let mut s = strip();
        let id = s.add_segment(0, 9, "a").unwrap();
        s.set_segment_range(id, 30, 39).unwrap();
        let seg = s.segment(id).unwrap();
        assert_eq!((seg.start(), seg.end()), (30, 39));
        assert!(matches!(
            s.set_segment_range(id, 140, 150),
            Err(SegmentError::InvalidRange { .. })
        ));
        assert!(matches!(
            s.set_segment_range(42, 0, 1),
            Err(SegmentError::UnknownSegment(42))
        ));
    }

    #[test]
    fn render_blanks_segments_without_effects() {
        let mut s = strip();
        s.set_pixel(5, 0x00FF_FFFF);
        s.render_tick(0, &SensorSnapshot::default());
        assert_eq!(s.buffer().get(5), color::BLACK);
    }

    #[test]
    fn later_segments_overwrite_earlier_ones() {
        let mut s = strip();
        // root gets a solid fill, the overlay clears its own sub-range
        let fx = create_effect("SolidColor", 150).unwrap();
        s.segment_mut(0).unwrap().set_effect(Some(fx));
        s.segment_mut(0)
            .unwrap()
            .effect_mut()
            .unwrap()
            .set_parameter("color", crate::effect::ParamValue::Color(0x00FF_0000))
            .unwrap();
        s.segment_mut(0).unwrap().set_brightness(255);
        s.add_segment(10, 19, "hole").unwrap();

        s.render_tick(0, &SensorSnapshot::default());
        assert_eq!(s.buffer().get(5), 0x00FF_0000);
        assert_eq!(s.buffer().get(15), color::BLACK);
    }

    #[test]
    fn latch_pushes_the_buffer_to_the_bus() {
        let mut s = strip();
        s.set_pixel(0, 0x0012_3456);
        s.latch();
        let frames = s.bus().frames.borrow();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], 0x0012_3456);
        assert_eq!(frames[0].len(), 150);
    }

    #[test]
    fn propagate_trigger_reaches_every_segment() {
        let mut s = strip();
        s.add_segment(10, 19, "wrist").unwrap();
        s.propagate_trigger(true, 200);
        for seg in s.segments() {
            assert!(seg.trigger_active());
            assert_eq!(seg.trigger_level(), 200);
        }
    }
}
