//! The effect registry: canonical names mapped to constructors.
//!
//! Names are the authoritative identifier on the wire and in saved
//! configurations - no numeric effect ids leave the device. Matching is
//! case-insensitive; the canonical spelling is what instances report and
//! documents carry.

use alloc::boxed::Box;

use super::{
    AccelMeter, ColoredFire, Effect, Fire, Flare, FlashOnTrigger, KineticRipple, RainbowChase,
    RainbowCycle, SolidColor, TheaterChase,
};

/// Canonical effect names in registration order.
pub const EFFECT_NAMES: [&str; 10] = [
    SolidColor::NAME,
    RainbowChase::NAME,
    RainbowCycle::NAME,
    TheaterChase::NAME,
    Fire::NAME,
    ColoredFire::NAME,
    Flare::NAME,
    KineticRipple::NAME,
    FlashOnTrigger::NAME,
    AccelMeter::NAME,
];

/// The canonical name list in registration order.
pub fn effect_names() -> &'static [&'static str] {
    &EFFECT_NAMES
}

/// Canonical name at a registry index, used by GET_EFFECT_INFO.
pub fn effect_name_by_index(index: usize) -> Option<&'static str> {
    EFFECT_NAMES.get(index).copied()
}

/// Creates a fresh effect by name for a segment of `segment_len` pixels.
///
/// Matching is case-insensitive. The fire family sizes its heat buffer from
/// `segment_len`; every other effect ignores it. Returns `None` for an
/// unknown name.
pub fn create_effect(name: &str, segment_len: usize) -> Option<Box<dyn Effect>> {
    if name.eq_ignore_ascii_case(SolidColor::NAME) {
        Some(Box::new(SolidColor::new()))
    } else if name.eq_ignore_ascii_case(RainbowChase::NAME) {
        Some(Box::new(RainbowChase::new()))
    } else if name.eq_ignore_ascii_case(RainbowCycle::NAME) {
        Some(Box::new(RainbowCycle::new()))
    } else if name.eq_ignore_ascii_case(TheaterChase::NAME) {
        Some(Box::new(TheaterChase::new()))
    } else if name.eq_ignore_ascii_case(Fire::NAME) {
        Some(Box::new(Fire::new(segment_len)))
    } else if name.eq_ignore_ascii_case(ColoredFire::NAME) {
        Some(Box::new(ColoredFire::new(segment_len)))
    } else if name.eq_ignore_ascii_case(Flare::NAME) {
        Some(Box::new(Flare::new(segment_len)))
    } else if name.eq_ignore_ascii_case(KineticRipple::NAME) {
        Some(Box::new(KineticRipple::new()))
    } else if name.eq_ignore_ascii_case(FlashOnTrigger::NAME) {
        Some(Box::new(FlashOnTrigger::new()))
    } else if name.eq_ignore_ascii_case(AccelMeter::NAME) {
        Some(Box::new(AccelMeter::new()))
    } else {
        None
    }
}
