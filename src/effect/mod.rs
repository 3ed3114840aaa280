//! Effects: named, stateful renderers with introspectable parameters.
//!
//! An effect is bound to exactly one owning segment for its lifetime and
//! renders into the strip's pixel buffer through a borrowed
//! [`RenderContext`] - segment-relative indices, never raw pointers. Each
//! effect owns a fixed-count, fixed-order table of [`Parameter`]s; the
//! control plane relies only on this introspection surface and never names
//! a concrete effect.

pub mod registry;

mod accel;
mod fire;
mod flash;
mod rainbow;
mod ripple;
mod solid;
mod theater;

pub use accel::AccelMeter;
pub use fire::{ColoredFire, Fire, Flare};
pub use flash::FlashOnTrigger;
pub use rainbow::{RainbowChase, RainbowCycle};
pub use ripple::KineticRipple;
pub use solid::SolidColor;
pub use theater::TheaterChase;

use rand::rngs::SmallRng;

use crate::color::{self, Color};
use crate::inputs::SensorSnapshot;
use crate::time::Millis;

/// The kind of value a parameter holds. Tells the peer what control to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamKind {
    /// Whole number within bounds.
    Integer,
    /// Decimal number within bounds.
    Float,
    /// 24-bit packed `0x00RRGGBB` color.
    Color,
    /// True/false flag.
    Boolean,
}

impl ParamKind {
    /// Wire encoding used by SET_EFFECT_PARAMETER.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ParamKind::Integer),
            1 => Some(ParamKind::Float),
            2 => Some(ParamKind::Color),
            3 => Some(ParamKind::Boolean),
            _ => None,
        }
    }

    /// Lower-case name used in documents (`"integer"`, `"float"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Float => "float",
            ParamKind::Color => "color",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Whole number.
    Integer(i32),
    /// Decimal number.
    Float(f32),
    /// Packed 24-bit color.
    Color(Color),
    /// Flag.
    Bool(bool),
}

impl ParamValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Color(_) => ParamKind::Color,
            ParamValue::Bool(_) => ParamKind::Boolean,
        }
    }
}

/// Errors from parameter lookup and assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    /// No parameter with the requested name on this effect.
    UnknownParameter,
    /// The value's kind does not match the parameter's declared kind.
    TypeMismatch {
        /// The kind the parameter declares.
        expected: ParamKind,
    },
}

impl core::fmt::Display for ParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamError::UnknownParameter => write!(f, "unknown parameter"),
            ParamError::TypeMismatch { expected } => {
                write!(f, "type mismatch, parameter is {}", expected.as_str())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParamError {}

/// A named, typed, bounded value controlling one aspect of an effect.
///
/// Parameter names and types are part of the compatibility contract with
/// the peer; renaming one is a breaking change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    name: &'static str,
    value: ParamValue,
    min: f32,
    max: f32,
}

impl Parameter {
    /// An integer parameter with inclusive bounds.
    pub const fn integer(name: &'static str, value: i32, min: i32, max: i32) -> Self {
        Self {
            name,
            value: ParamValue::Integer(value),
            min: min as f32,
            max: max as f32,
        }
    }

    /// A float parameter with inclusive bounds.
    pub const fn float(name: &'static str, value: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            value: ParamValue::Float(value),
            min,
            max,
        }
    }

    /// A 24-bit color parameter. Bounds are informational zeros.
    pub const fn color(name: &'static str, value: Color) -> Self {
        Self {
            name,
            value: ParamValue::Color(value),
            min: 0.0,
            max: 0.0,
        }
    }

    /// A boolean parameter. Bounds are informational zeros.
    pub const fn boolean(name: &'static str, value: bool) -> Self {
        Self {
            name,
            value: ParamValue::Bool(value),
            min: 0.0,
            max: 0.0,
        }
    }

    /// Stable ASCII identifier, unique within the owning effect.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared kind.
    pub fn kind(&self) -> ParamKind {
        self.value.kind()
    }

    /// Current value.
    pub fn value(&self) -> ParamValue {
        self.value
    }

    /// Published lower bound (meaningful for numeric kinds).
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Published upper bound (meaningful for numeric kinds).
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Assigns a new value of the matching kind.
    ///
    /// Numeric values clamp into `[min, max]`; colors mask to 24 bits.
    pub fn assign(&mut self, value: ParamValue) -> Result<(), ParamError> {
        let expected = self.value.kind();
        if value.kind() != expected {
            return Err(ParamError::TypeMismatch { expected });
        }
        self.value = match value {
            ParamValue::Integer(v) => {
                ParamValue::Integer(v.clamp(self.min as i32, self.max as i32))
            }
            ParamValue::Float(v) => ParamValue::Float(v.clamp(self.min, self.max)),
            ParamValue::Color(v) => ParamValue::Color(v & 0x00FF_FFFF),
            ParamValue::Bool(v) => ParamValue::Bool(v),
        };
        Ok(())
    }

    /// Integer value, or 0 for other kinds.
    pub fn as_i32(&self) -> i32 {
        match self.value {
            ParamValue::Integer(v) => v,
            _ => 0,
        }
    }

    /// Float value, or 0.0 for other kinds.
    pub fn as_f32(&self) -> f32 {
        match self.value {
            ParamValue::Float(v) => v,
            _ => 0.0,
        }
    }

    /// Color value, or black for other kinds.
    pub fn as_color(&self) -> Color {
        match self.value {
            ParamValue::Color(v) => v,
            _ => 0,
        }
    }

    /// Boolean value, or false for other kinds.
    pub fn as_bool(&self) -> bool {
        match self.value {
            ParamValue::Bool(v) => v,
            _ => false,
        }
    }
}

/// Per-frame view an effect renders through.
///
/// Pixel indices are segment-relative (`0..len()`); writes apply the
/// segment's brightness dim and silently ignore out-of-range indices, so an
/// effect can never escape its segment.
pub struct RenderContext<'a> {
    pixels: &'a mut [Color],
    start: usize,
    end: usize,
    brightness: u8,
    trigger_active: bool,
    trigger_level: u8,
    now: Millis,
    inputs: &'a SensorSnapshot,
    rng: &'a mut SmallRng,
}

impl<'a> RenderContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        pixels: &'a mut [Color],
        start: usize,
        end: usize,
        brightness: u8,
        trigger_active: bool,
        trigger_level: u8,
        now: Millis,
        inputs: &'a SensorSnapshot,
        rng: &'a mut SmallRng,
    ) -> Self {
        Self {
            pixels,
            start,
            end,
            brightness,
            trigger_active,
            trigger_level,
            now,
            inputs,
            rng,
        }
    }

    /// Number of pixels in the segment.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A segment always covers at least one pixel.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Writes a pixel at a segment-relative index, dimmed by the segment
    /// brightness. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, color: Color) {
        if index < self.len() {
            self.pixels[self.start + index] = color::scale(color, self.brightness);
        }
    }

    /// Turns one pixel off.
    pub fn clear(&mut self, index: usize) {
        if index < self.len() {
            self.pixels[self.start + index] = color::BLACK;
        }
    }

    /// Turns the whole segment off.
    pub fn clear_all(&mut self) {
        for px in &mut self.pixels[self.start..=self.end] {
            *px = color::BLACK;
        }
    }

    /// Milliseconds since boot for this frame.
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Segment brightness scalar.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Latched trigger flag of the owning segment.
    pub fn trigger_active(&self) -> bool {
        self.trigger_active
    }

    /// Latched trigger intensity of the owning segment.
    pub fn trigger_level(&self) -> u8 {
        self.trigger_level
    }

    /// Accelerometer x axis, g units.
    pub fn accel_x(&self) -> f32 {
        self.inputs.accel_x
    }

    /// Rising edge of the shared ripple trigger for this tick.
    pub fn ripple_triggered(&self) -> bool {
        self.inputs.ripple
    }

    /// The owning segment's random number generator.
    pub fn rng(&mut self) -> &mut SmallRng {
        self.rng
    }
}

/// Behaviour shared by all effects.
///
/// `update` may consult the frame time, the segment RNG and the trigger
/// inputs; effects that animate self-rate-limit by comparing the frame time
/// against their own `speed` parameter or fixed interval.
pub trait Effect {
    /// Canonical effect name as registered; used on the wire and in
    /// configuration documents.
    fn name(&self) -> &'static str;

    /// Renders one frame into the segment.
    fn update(&mut self, ctx: &mut RenderContext<'_>);

    /// Number of parameters. Fixed for the lifetime of the instance.
    fn parameter_count(&self) -> usize;

    /// Parameter at `index`, in stable declaration order.
    fn parameter(&self, index: usize) -> Option<&Parameter>;

    /// Mutable parameter at `index`.
    fn parameter_mut(&mut self, index: usize) -> Option<&mut Parameter>;

    /// Looks up a parameter by name.
    fn find_parameter(&self, name: &str) -> Option<&Parameter> {
        (0..self.parameter_count())
            .filter_map(|i| self.parameter(i))
            .find(|p| p.name() == name)
    }

    /// Assigns a parameter by name, clamping numeric values into bounds.
    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        let mut index = None;
        for i in 0..self.parameter_count() {
            if let Some(p) = self.parameter(i) {
                if p.name() == name {
                    index = Some(i);
                    break;
                }
            }
        }
        match index.and_then(|i| self.parameter_mut(i)) {
            Some(p) => p.assign(value),
            None => Err(ParamError::UnknownParameter),
        }
    }
}

/// Returns true when `interval` milliseconds have passed since `last`,
/// updating the stamp. A `None` stamp always fires so a freshly bound
/// effect draws on its first frame.
pub(crate) fn due(last: &mut Option<Millis>, now: Millis, interval: Millis) -> bool {
    match *last {
        Some(stamp) if now.saturating_sub(stamp) < interval => false,
        _ => {
            *last = Some(now);
            true
        }
    }
}

pub(crate) use due as frame_due;
