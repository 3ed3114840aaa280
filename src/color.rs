//! Packed-color helpers.
//!
//! The whole engine carries colors as packed `0x00RRGGBB` words - the format
//! of the wire protocol and the persisted configuration. This module provides
//! the conversions the effects need, particularly HSV (Hue, Saturation,
//! Value) in the 16-bit hue space the rainbow family animates in, and the
//! heat-ramp mappings used by the fire family.

use palette::{FromColor, Hsv, Srgb};

/// Packed `0x00RRGGBB` color word.
pub type Color = u32;

/// All channels off.
pub const BLACK: Color = 0x0000_0000;

/// Packs three channels into a color word.
#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Red channel of a packed color.
#[inline]
pub const fn red(color: Color) -> u8 {
    ((color >> 16) & 0xFF) as u8
}

/// Green channel of a packed color.
#[inline]
pub const fn green(color: Color) -> u8 {
    ((color >> 8) & 0xFF) as u8
}

/// Blue channel of a packed color.
#[inline]
pub const fn blue(color: Color) -> u8 {
    (color & 0xFF) as u8
}

/// Dims a color by a brightness scalar.
///
/// Channel-wise multiplication by `(brightness + 1) / 256`, rounded toward
/// zero, so brightness 255 is the identity and brightness 0 is not quite
/// black for full-intensity channels.
#[inline]
pub const fn scale(color: Color, brightness: u8) -> Color {
    let b = brightness as u32 + 1;
    let r = (red(color) as u32 * b) >> 8;
    let g = (green(color) as u32 * b) >> 8;
    let bl = (blue(color) as u32 * b) >> 8;
    rgb(r as u8, g as u8, bl as u8)
}

/// Creates a packed color from a 16-bit hue plus saturation and value.
///
/// The hue wraps over the full color wheel every 65536 steps.
pub fn hsv16(hue: u16, saturation: u8, value: u8) -> Color {
    let h = f32::from(hue) * 360.0 / 65536.0;
    let hsv = Hsv::new(h, f32::from(saturation) / 255.0, f32::from(value) / 255.0);
    let srgb: Srgb<f32> = Srgb::from_color(hsv);
    let srgb = srgb.into_format::<u8>();
    rgb(srgb.red, srgb.green, srgb.blue)
}

/// Linear interpolation between two packed colors, `t` in 0..=255.
#[inline]
pub fn lerp(a: Color, b: Color, t: u8) -> Color {
    rgb(
        lerp8(red(a), red(b), t),
        lerp8(green(a), green(b), t),
        lerp8(blue(a), blue(b), t),
    )
}

#[inline]
fn lerp8(a: u8, b: u8, t: u8) -> u8 {
    let a = i32::from(a);
    let b = i32::from(b);
    (a + (b - a) * i32::from(t) / 255) as u8
}

/// Maps a heat temperature (0-255) to the classic black-red-yellow-white
/// fire ramp.
pub fn heat_ramp(temperature: u8) -> Color {
    // scale to 0..191 with rounding, then spread the low six bits to 0..252
    let t192 = ((u16::from(temperature) * 191 + 127) / 255) as u8;
    let ramp = (t192 & 0x3F) << 2;
    if t192 > 0x80 {
        rgb(255, 255, ramp)
    } else if t192 > 0x40 {
        rgb(255, ramp, 0)
    } else {
        rgb(ramp, 0, 0)
    }
}

/// Maps a heat temperature (0-255) through a piecewise-linear ramp across
/// three colors: `c1` at zero heat, `c2` at the midpoint, `c3` at full heat.
pub fn heat_ramp3(temperature: u8, c1: Color, c2: Color, c3: Color) -> Color {
    if temperature <= 127 {
        lerp(c1, c2, temperature.wrapping_mul(2))
    } else {
        lerp(c2, c3, (temperature - 128).wrapping_mul(2))
    }
}
