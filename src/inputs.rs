//! Shared sensor inputs.
//!
//! Interrupt-driven sensor producers (audio trigger, accelerometer, motion
//! detector) publish into a [`SensorInputs`] bundle of atomics; the engine
//! reads a [`SensorSnapshot`] once per tick. Writers are single-producer and
//! the reader runs outside the interrupt, so plain relaxed atomics suffice -
//! no locking.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Lock-free input bundle written by sensor callbacks and read by the engine.
///
/// Typically lives in a `static` shared between the interrupt handlers and
/// the main loop.
#[derive(Debug)]
pub struct SensorInputs {
    trigger_active: AtomicBool,
    trigger_level: AtomicU8,
    accel_x: AtomicU32,
    accel_y: AtomicU32,
    accel_z: AtomicU32,
    ripple: AtomicBool,
}

impl SensorInputs {
    /// Creates a bundle with no trigger, level ground acceleration and no
    /// pending ripple.
    pub const fn new() -> Self {
        Self {
            trigger_active: AtomicBool::new(false),
            trigger_level: AtomicU8::new(0),
            accel_x: AtomicU32::new(0),
            accel_y: AtomicU32::new(0),
            accel_z: AtomicU32::new(0),
            ripple: AtomicBool::new(false),
        }
    }

    /// Publishes the audio trigger pair. Producer side.
    pub fn set_trigger(&self, active: bool, level: u8) {
        self.trigger_level.store(level, Ordering::Relaxed);
        self.trigger_active.store(active, Ordering::Relaxed);
    }

    /// Publishes an accelerometer sample in g units. Producer side.
    pub fn set_accel(&self, x: f32, y: f32, z: f32) {
        self.accel_x.store(x.to_bits(), Ordering::Relaxed);
        self.accel_y.store(y.to_bits(), Ordering::Relaxed);
        self.accel_z.store(z.to_bits(), Ordering::Relaxed);
    }

    /// Raises the one-shot ripple edge. Producer side.
    pub fn trigger_ripple(&self) {
        self.ripple.store(true, Ordering::Relaxed);
    }

    /// Reads the current inputs, consuming the ripple edge.
    ///
    /// Called once per engine tick; every effect updated within that tick
    /// observes the same snapshot.
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            trigger_active: self.trigger_active.load(Ordering::Relaxed),
            trigger_level: self.trigger_level.load(Ordering::Relaxed),
            accel_x: f32::from_bits(self.accel_x.load(Ordering::Relaxed)),
            accel_y: f32::from_bits(self.accel_y.load(Ordering::Relaxed)),
            accel_z: f32::from_bits(self.accel_z.load(Ordering::Relaxed)),
            ripple: self.ripple.swap(false, Ordering::Relaxed),
        }
    }
}

impl Default for SensorInputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-value view of the sensor inputs for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    /// Audio trigger currently active.
    pub trigger_active: bool,
    /// Audio trigger intensity, 0-255.
    pub trigger_level: u8,
    /// Accelerometer x axis, g units, nominally -1.0..=1.0.
    pub accel_x: f32,
    /// Accelerometer y axis.
    pub accel_y: f32,
    /// Accelerometer z axis.
    pub accel_z: f32,
    /// Rising edge of the motion/ripple trigger; consumed by the snapshot.
    pub ripple: bool,
}
