#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Strip`**: the whole pixel chain plus its ordered segment collection
//! - **`Segment`**: a named, identified, contiguous sub-range with its own
//!   brightness, trigger inputs and at most one bound effect
//! - **`Effect`**: a stateful renderer owned by a segment, exposing a fixed
//!   table of introspectable [`Parameter`]s
//! - **`Dispatcher`**: the binary control plane, including the multi-part
//!   segment-transfer state machine
//! - **`Console`**: the line-oriented text command surface
//! - **`Engine`**: the cooperative main tick binding links, sensors and strip
//! - **`PixelBus`** / **`TimeSource`** / **`FrameLink`** / **`ConfigStore`**:
//!   traits to implement for your hardware and platform
//!
//! Colors are packed `0x00RRGGBB` words end to end, matching the wire and
//! persistence formats. Effects self-rate-limit against milliseconds from the
//! [`TimeSource`], so the engine tick can run as fast as the platform allows.

extern crate alloc;

pub mod codec;
pub mod color;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod effect;
pub mod engine;
pub mod inputs;
pub mod segment;
pub mod strip;
pub mod time;

pub use codec::{AckCode, FRAME_MTU, FrameLink, NackCode, Opcode};
pub use config::{ConfigError, ConfigStore, StoreError};
pub use console::{Console, ConsoleReply};
pub use dispatcher::{Dispatcher, RestartRequest, TransferState};
pub use effect::registry::{create_effect, effect_name_by_index, effect_names};
pub use effect::{Effect, ParamError, ParamKind, ParamValue, Parameter, RenderContext};
pub use engine::Engine;
pub use inputs::{SensorInputs, SensorSnapshot};
pub use segment::{Segment, SegmentError};
pub use strip::{PixelBuffer, PixelBus, Strip};
pub use time::{Millis, TimeSource};

/// LED count used when no saved configuration exists.
pub const DEFAULT_LED_COUNT: u16 = 150;

/// Brightness assigned to the root segment at strip construction.
pub const DEFAULT_BRIGHTNESS: u8 = 10;

/// Upper bound accepted by SET_LED_COUNT.
pub const MAX_LED_COUNT: u16 = 4000;
