//! Time abstraction for platform-agnostic timing.

/// Milliseconds since boot.
pub type Millis = u64;

/// Trait for abstracting the platform's monotonic clock.
///
/// Effects and the control plane only ever consume a millisecond counter;
/// wrap-around handling is the implementor's concern (a `u64` counter at
/// 1 kHz outlives any device).
pub trait TimeSource {
    /// Returns milliseconds elapsed since boot.
    fn now(&self) -> Millis;
}
