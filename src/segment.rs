//! Segments: named, identified sub-ranges of the strip.

use alloc::boxed::Box;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::effect::Effect;

/// Maximum number of visible characters in a segment name.
pub const MAX_NAME_LEN: usize = 31;

/// Bounded segment name storage.
pub type SegmentName = heapless::String<MAX_NAME_LEN>;

/// Name reserved for the permanent root segment.
pub const ROOT_SEGMENT_NAME: &str = "all";

/// Errors from segment operations on a strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SegmentError {
    /// Range violates `0 <= start <= end < led_count`.
    InvalidRange {
        /// Requested first index (inclusive).
        start: u16,
        /// Requested last index (inclusive).
        end: u16,
        /// Number of pixels on the strip.
        led_count: u16,
    },
    /// No segment with the given id exists.
    UnknownSegment(u8),
    /// The strip already holds 255 segments and cannot assign a fresh id.
    IdSpaceExhausted,
}

impl core::fmt::Display for SegmentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SegmentError::InvalidRange {
                start,
                end,
                led_count,
            } => {
                write!(
                    f,
                    "invalid range {}-{} on a strip of {} pixels",
                    start, end, led_count
                )
            }
            SegmentError::UnknownSegment(id) => {
                write!(f, "no segment with id {}", id)
            }
            SegmentError::IdSpaceExhausted => {
                write!(f, "segment id space exhausted")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SegmentError {}

/// A contiguous, inclusive index range of the strip with its own brightness,
/// latched trigger inputs and at most one bound [`Effect`].
///
/// Segments are created and owned by a [`Strip`](crate::Strip); the segment
/// with id 0 is permanent, named `"all"`, and always spans the full strip at
/// construction time.
pub struct Segment {
    id: u8,
    name: SegmentName,
    pub(crate) start: u16,
    pub(crate) end: u16,
    brightness: u8,
    trigger_active: bool,
    trigger_level: u8,
    pub(crate) effect: Option<Box<dyn Effect>>,
    pub(crate) rng: SmallRng,
}

impl Segment {
    pub(crate) fn new(id: u8, start: u16, end: u16, name: &str, brightness: u8) -> Self {
        Self {
            id,
            name: bounded_name(name),
            start,
            end,
            brightness,
            trigger_active: false,
            trigger_level: 0,
            effect: None,
            rng: SmallRng::seed_from_u64(u64::from(id)),
        }
    }

    /// Stable id, unique within the owning strip.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Segment name (not necessarily unique; `"all"` is the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = bounded_name(name);
    }

    /// First pixel index (inclusive).
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Last pixel index (inclusive).
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of pixels covered.
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// A segment always covers at least one pixel.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Multiplicative dim applied when the bound effect writes a pixel.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Sets the brightness scalar.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Changes the covered range.
    ///
    /// `led_count` is the owning strip's pixel count; the range must satisfy
    /// `start <= end < led_count`.
    pub fn set_range(&mut self, start: u16, end: u16, led_count: u16) -> Result<(), SegmentError> {
        if start > end || end >= led_count {
            return Err(SegmentError::InvalidRange {
                start,
                end,
                led_count,
            });
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Latches the externally produced trigger pair for effects to read.
    pub fn set_trigger(&mut self, active: bool, level: u8) {
        self.trigger_active = active;
        self.trigger_level = level;
    }

    /// Latched trigger flag.
    pub fn trigger_active(&self) -> bool {
        self.trigger_active
    }

    /// Latched trigger intensity (0-255).
    pub fn trigger_level(&self) -> u8 {
        self.trigger_level
    }

    /// The bound effect, if any.
    pub fn effect(&self) -> Option<&dyn Effect> {
        self.effect.as_deref()
    }

    /// Mutable access to the bound effect, if any.
    pub fn effect_mut(&mut self) -> Option<&mut (dyn Effect + 'static)> {
        self.effect.as_deref_mut()
    }

    /// Replaces the bound effect. The previous instance is dropped first;
    /// this is the only point at which effect memory is released.
    pub fn set_effect(&mut self, effect: Option<Box<dyn Effect>>) {
        self.effect = effect;
    }
}

impl core::fmt::Debug for Segment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("name", &self.name.as_str())
            .field("start", &self.start)
            .field("end", &self.end)
            .field("brightness", &self.brightness)
            .field("effect", &self.effect.as_ref().map(|e| e.name()))
            .finish()
    }
}

/// Truncates a name to [`MAX_NAME_LEN`] characters.
pub(crate) fn bounded_name(name: &str) -> SegmentName {
    let mut out = SegmentName::new();
    for ch in name.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
