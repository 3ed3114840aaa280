//! Wire codec: opcode tables, framing helpers and document scanning.
//!
//! The transport (radio or console line driver) delivers framed messages in
//! order; this module defines what the bytes inside a frame mean. Requests
//! carry a one-byte opcode with the high bit clear; binary responses echo the
//! opcode with the high bit set. Text documents travel as raw chunked frames
//! of at most [`FRAME_MTU`] bytes which the peer reassembles by balancing
//! braces.

use alloc::vec::Vec;

/// Link MTU the peer assumes for chunked document responses.
pub const FRAME_MTU: usize = 20;

/// Bit set on the opcode byte of binary responses.
pub const RESPONSE_BIT: u8 = 0x80;

/// Frame announcing the device is ready after boot.
pub const READY: u8 = 0xD0;

/// Trait for abstracting a message-framed duplex byte channel.
///
/// Implement this for your radio characteristic or console line driver.
/// The transport guarantees in-order delivery of whole frames; reliability
/// beyond that is its own concern.
pub trait FrameLink {
    /// Polls for the next received frame. Non-blocking; `None` when idle.
    fn poll(&mut self) -> Option<Vec<u8>>;

    /// Emits one frame. May block briefly while the chunk drains.
    fn send(&mut self, frame: &[u8]);
}

/// Request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Replace a segment's bound effect by name.
    SetEffect = 0x02,
    /// Set one segment's brightness scalar.
    SetSegBrightness = 0x04,
    /// Segment selection notice from the peer; informational only.
    SelectSegment = 0x05,
    /// Remove all user-defined segments.
    ClearSegments = 0x06,
    /// Alter one segment's range.
    SetSegRange = 0x07,
    /// Aggregate status document.
    GetStatus = 0x08,
    /// Full configuration document as chunked text.
    BatchConfig = 0x09,
    /// Set a parameter on a segment's bound effect.
    SetEffectParameter = 0x0A,
    /// Parameter schema for one registry entry.
    GetEffectInfo = 0x0B,
    /// Change the LED count, persist and restart.
    SetLedCount = 0x0C,
    /// Current LED count as a binary response.
    GetLedCount = 0x0D,
    /// Every segment's configuration as a document.
    GetAllSegmentConfigs = 0x0E,
    /// Begin the counted multi-part segment transfer.
    SetAllSegmentConfigs = 0x0F,
    /// The whole effect registry as a document.
    GetAllEffects = 0x10,
    /// Configure a single segment from a text record.
    SetSingleSegmentJson = 0x11,
    /// Persist the current configuration.
    SaveConfig = 0x12,
}

impl Opcode {
    /// Decodes a request opcode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Opcode::SetEffect),
            0x04 => Some(Opcode::SetSegBrightness),
            0x05 => Some(Opcode::SelectSegment),
            0x06 => Some(Opcode::ClearSegments),
            0x07 => Some(Opcode::SetSegRange),
            0x08 => Some(Opcode::GetStatus),
            0x09 => Some(Opcode::BatchConfig),
            0x0A => Some(Opcode::SetEffectParameter),
            0x0B => Some(Opcode::GetEffectInfo),
            0x0C => Some(Opcode::SetLedCount),
            0x0D => Some(Opcode::GetLedCount),
            0x0E => Some(Opcode::GetAllSegmentConfigs),
            0x0F => Some(Opcode::SetAllSegmentConfigs),
            0x10 => Some(Opcode::GetAllEffects),
            0x11 => Some(Opcode::SetSingleSegmentJson),
            0x12 => Some(Opcode::SaveConfig),
            _ => None,
        }
    }

    /// The opcode byte with [`RESPONSE_BIT`] set.
    pub fn response_byte(self) -> u8 {
        self as u8 | RESPONSE_BIT
    }
}

/// Positive outcome opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AckCode {
    /// Command accepted.
    Generic = 0xA0,
    /// Effect replaced.
    EffectSet = 0xA1,
    /// Parameter assigned.
    ParamSet = 0xA2,
    /// Configuration persisted.
    ConfigSaved = 0xA3,
    /// Device restarting to apply the change.
    Restarting = 0xA4,
}

/// Negative outcome opcodes, one per error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NackCode {
    /// Opcode not recognized.
    UnknownCmd = 0xE0,
    /// Payload malformed or unexpected for the current state.
    InvalidPayload = 0xE1,
    /// No segment with the given id.
    InvalidSegment = 0xE2,
    /// Segment has no bound effect.
    NoEffect = 0xE3,
    /// Effect name not in the registry.
    UnknownEffect = 0xE4,
    /// Parameter name not on the bound effect.
    UnknownParameter = 0xE5,
    /// Document failed to parse.
    JsonError = 0xE6,
    /// Persistence layer failed.
    FsError = 0xE7,
    /// Multi-part receive buffer overflowed.
    BufferOverflow = 0xE8,
}

/// Emits a single-byte ack frame.
pub fn send_ack<L: FrameLink>(link: &mut L, code: AckCode) {
    link.send(&[code as u8]);
}

/// Emits a single-byte nack frame.
pub fn send_nack<L: FrameLink>(link: &mut L, code: NackCode) {
    link.send(&[code as u8]);
}

/// Emits the READY frame.
pub fn send_ready<L: FrameLink>(link: &mut L) {
    link.send(&[READY]);
}

/// Emits a text document as a run of MTU-sized chunks.
///
/// Chunks for one document are emitted back to back; callers finish one
/// document before starting another, so responses never interleave.
pub fn send_document<L: FrameLink>(link: &mut L, doc: &str) {
    for chunk in doc.as_bytes().chunks(FRAME_MTU) {
        link.send(chunk);
    }
}

/// Incremental scanner for one balanced top-level `{...}` in a byte stream.
///
/// Brace depth is tracked outside of JSON strings (escapes included) so
/// payload text cannot fake a document boundary. Byte positions count from
/// the last [`reset`](DocScanner::reset).
#[derive(Debug, Default)]
pub struct DocScanner {
    depth: u32,
    in_string: bool,
    escaped: bool,
    start: Option<usize>,
    pos: usize,
}

impl DocScanner {
    /// Creates a scanner at depth zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True while the scanner is inside an unbalanced document.
    pub fn in_document(&self) -> bool {
        self.depth > 0
    }

    /// Feeds one byte. Returns `Some((start, end))` - byte positions since
    /// the last reset, end exclusive - when a top-level document closes.
    pub fn feed(&mut self, byte: u8) -> Option<(usize, usize)> {
        let index = self.pos;
        self.pos += 1;

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return None;
        }

        match byte {
            b'"' if self.depth > 0 => self.in_string = true,
            b'{' => {
                if self.depth == 0 {
                    self.start = Some(index);
                }
                self.depth += 1;
            }
            b'}' => {
                if self.depth > 0 {
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(start) = self.start.take() {
                            return Some((start, index + 1));
                        }
                    }
                }
            }
            _ => {}
        }
        None
    }
}
