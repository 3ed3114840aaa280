//! The control plane: binary command dispatch and multi-part transfers.
//!
//! Every decoded frame either completes immediately (single-shot writes and
//! configuration reads) or advances the multi-part state machine:
//!
//! ```text
//! IDLE ──SET_ALL_SEGMENT_CONFIGS──▶ EXPECT_COUNT ──count──▶ EXPECT_SEG_JSON
//!                                                               │ per-doc ack
//!                                            C docs applied ────┴──▶ IDLE
//! IDLE ──BATCH_CONFIG + body──▶ EXPECT_BATCH_JSON ──balanced braces──▶ IDLE
//! IDLE ──SET_SINGLE_SEGMENT_JSON + body──▶ EXPECT_SINGLE_JSON ──────▶ IDLE
//! ```
//!
//! While a transfer is active no other command is accepted on this link; an
//! unexpected frame or an expired inter-chunk timeout resets the machine to
//! IDLE with a state-reset nack. Single-shot writes never partially apply:
//! every validation happens before the first mutation.

use alloc::string::ToString;
use alloc::vec::Vec;

use serde_json::Value;

use crate::codec::{
    AckCode, DocScanner, FrameLink, NackCode, Opcode, send_ack, send_document, send_nack,
};
use crate::config::{self, ConfigStore};
use crate::effect::registry::{create_effect, effect_name_by_index};
use crate::effect::{Effect, ParamKind, ParamValue};
use crate::strip::{PixelBus, Strip};
use crate::time::Millis;

/// Maximum bytes accumulated for one multi-part document.
pub const RX_BUFFER_CAP: usize = 1024;

/// Inter-chunk timeout for multi-part transfers.
pub const TRANSFER_TIMEOUT_MS: Millis = 5000;

/// State of the multi-part receive machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    /// No transfer in progress.
    Idle,
    /// SET_ALL_SEGMENT_CONFIGS accepted, waiting for the two count bytes.
    ExpectCount,
    /// Count received, accumulating per-segment documents.
    ExpectSegmentJson,
    /// BATCH_CONFIG accepted, accumulating the full document.
    ExpectBatchJson,
    /// SET_SINGLE_SEGMENT_JSON accepted, accumulating one record.
    ExpectSingleJson,
}

/// Request to restart the device, surfaced to the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RestartRequest {
    /// LED count the device reboots into.
    pub led_count: u16,
}

/// Stateful interpreter for decoded command frames.
///
/// One dispatcher serves one link; commands on another link interleave at
/// frame boundaries through their own dispatcher instance.
pub struct Dispatcher {
    state: TransferState,
    rx: Vec<u8>,
    scanner: DocScanner,
    expected_segments: u16,
    received_segments: u16,
    last_activity: Millis,
}

impl Dispatcher {
    /// Creates an idle dispatcher.
    pub fn new() -> Self {
        Self {
            state: TransferState::Idle,
            rx: Vec::new(),
            scanner: DocScanner::new(),
            expected_segments: 0,
            received_segments: 0,
            last_activity: 0,
        }
    }

    /// Current transfer state.
    pub fn state(&self) -> TransferState {
        self.state
    }

    fn reset_transfer(&mut self) {
        self.state = TransferState::Idle;
        self.rx.clear();
        self.scanner.reset();
        self.expected_segments = 0;
        self.received_segments = 0;
    }

    /// Aborts an overdue transfer, nacking the peer.
    ///
    /// Call periodically from the main tick.
    pub fn check_timeout<L: FrameLink>(&mut self, now: Millis, link: &mut L) {
        if self.state != TransferState::Idle
            && now.saturating_sub(self.last_activity) > TRANSFER_TIMEOUT_MS
        {
            log::warn!("multi-part transfer timed out, resetting to idle");
            self.reset_transfer();
            send_nack(link, NackCode::InvalidPayload);
        }
    }

    /// Handles one decoded frame, mutating the strip and store and emitting
    /// acks, nacks and response documents on the link.
    ///
    /// Returns a restart request when the command demands a reboot.
    pub fn handle_frame<B, S, L>(
        &mut self,
        frame: &[u8],
        now: Millis,
        strip: &mut Strip<B>,
        store: &mut S,
        link: &mut L,
    ) -> Option<RestartRequest>
    where
        B: PixelBus,
        S: ConfigStore,
        L: FrameLink,
    {
        if frame.is_empty() {
            return None;
        }

        match self.state {
            TransferState::Idle => self.handle_command(frame, now, strip, store, link),
            TransferState::ExpectCount => {
                self.handle_count(frame, now, strip, link);
                None
            }
            TransferState::ExpectSegmentJson
            | TransferState::ExpectBatchJson
            | TransferState::ExpectSingleJson => {
                self.handle_body_chunk(frame, now, strip, link);
                None
            }
        }
    }

    fn handle_command<B, S, L>(
        &mut self,
        frame: &[u8],
        now: Millis,
        strip: &mut Strip<B>,
        store: &mut S,
        link: &mut L,
    ) -> Option<RestartRequest>
    where
        B: PixelBus,
        S: ConfigStore,
        L: FrameLink,
    {
        let Some(opcode) = Opcode::from_byte(frame[0]) else {
            log::warn!("unknown command byte 0x{:02X}", frame[0]);
            send_nack(link, NackCode::UnknownCmd);
            return None;
        };
        let payload = &frame[1..];

        match opcode {
            Opcode::SetEffect => self.handle_set_effect(payload, strip, link),
            Opcode::SetSegBrightness => self.handle_set_brightness(payload, strip, link),
            Opcode::SelectSegment => {
                // segment selection lives in the app; just confirm receipt
                if payload.is_empty() {
                    send_nack(link, NackCode::InvalidPayload);
                } else {
                    send_ack(link, AckCode::Generic);
                }
            }
            Opcode::ClearSegments => {
                strip.remove_user_segments();
                send_ack(link, AckCode::Generic);
            }
            Opcode::SetSegRange => self.handle_set_range(payload, strip, link),
            Opcode::GetStatus => {
                send_document(link, &config::status_document(strip).to_string());
            }
            Opcode::BatchConfig => {
                self.begin_body(TransferState::ExpectBatchJson, now);
                self.handle_body_chunk(payload, now, strip, link);
            }
            Opcode::SetEffectParameter => self.handle_set_parameter(payload, strip, link),
            Opcode::GetEffectInfo => self.handle_get_effect_info(payload, strip, link),
            Opcode::SetLedCount => {
                return self.handle_set_led_count(payload, strip, store, link);
            }
            Opcode::GetLedCount => {
                let count = strip.pixel_count();
                link.send(&[
                    Opcode::GetLedCount.response_byte(),
                    (count >> 8) as u8,
                    (count & 0xFF) as u8,
                ]);
            }
            Opcode::GetAllSegmentConfigs => {
                let records: Vec<Value> =
                    strip.segments().iter().map(config::segment_record).collect();
                let doc = serde_json::json!({ "segments": records });
                send_document(link, &doc.to_string());
            }
            Opcode::SetAllSegmentConfigs => {
                strip.remove_user_segments();
                self.begin_body(TransferState::ExpectCount, now);
                send_ack(link, AckCode::Generic);
            }
            Opcode::GetAllEffects => {
                send_document(link, &config::effects_document().to_string());
            }
            Opcode::SetSingleSegmentJson => {
                self.begin_body(TransferState::ExpectSingleJson, now);
                self.handle_body_chunk(payload, now, strip, link);
            }
            Opcode::SaveConfig => match config::save(store, strip) {
                Ok(()) => send_ack(link, AckCode::ConfigSaved),
                Err(err) => {
                    log::error!("saving configuration failed: {}", err);
                    send_nack(link, NackCode::FsError);
                }
            },
        }
        None
    }

    fn begin_body(&mut self, state: TransferState, now: Millis) {
        self.reset_transfer();
        self.state = state;
        self.last_activity = now;
    }

    fn handle_set_effect<B: PixelBus, L: FrameLink>(
        &mut self,
        payload: &[u8],
        strip: &mut Strip<B>,
        link: &mut L,
    ) {
        if payload.len() < 2 {
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        let seg_id = payload[0];
        let Ok(name) = core::str::from_utf8(&payload[1..]) else {
            send_nack(link, NackCode::InvalidPayload);
            return;
        };
        let Some(seg) = strip.segment_mut(seg_id) else {
            send_nack(link, NackCode::InvalidSegment);
            return;
        };
        match create_effect(name, seg.len()) {
            Some(fx) => {
                seg.set_effect(Some(fx));
                send_ack(link, AckCode::EffectSet);
            }
            None => {
                // previous effect stays installed
                log::warn!("unknown effect '{}'", name);
                send_nack(link, NackCode::UnknownEffect);
            }
        }
    }

    fn handle_set_brightness<B: PixelBus, L: FrameLink>(
        &mut self,
        payload: &[u8],
        strip: &mut Strip<B>,
        link: &mut L,
    ) {
        if payload.len() != 2 {
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        let Some(seg) = strip.segment_mut(payload[0]) else {
            send_nack(link, NackCode::InvalidSegment);
            return;
        };
        seg.set_brightness(payload[1]);
        send_ack(link, AckCode::Generic);
    }

    fn handle_set_range<B: PixelBus, L: FrameLink>(
        &mut self,
        payload: &[u8],
        strip: &mut Strip<B>,
        link: &mut L,
    ) {
        if payload.len() != 5 {
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        let seg_id = payload[0];
        let start = u16::from_be_bytes([payload[1], payload[2]]);
        let end = u16::from_be_bytes([payload[3], payload[4]]);
        if strip.segment(seg_id).is_none() {
            send_nack(link, NackCode::InvalidSegment);
            return;
        }
        match strip.set_segment_range(seg_id, start, end) {
            Ok(()) => send_ack(link, AckCode::Generic),
            Err(err) => {
                log::warn!("range rejected: {}", err);
                send_nack(link, NackCode::InvalidPayload);
            }
        }
    }

    fn handle_set_parameter<B: PixelBus, L: FrameLink>(
        &mut self,
        payload: &[u8],
        strip: &mut Strip<B>,
        link: &mut L,
    ) {
        // segId, type, nameLen, name..., value...
        if payload.len() < 3 {
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        let seg_id = payload[0];
        let Some(kind) = ParamKind::from_wire(payload[1]) else {
            send_nack(link, NackCode::InvalidPayload);
            return;
        };
        let name_len = usize::from(payload[2]);
        if payload.len() < 3 + name_len {
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        let Ok(name) = core::str::from_utf8(&payload[3..3 + name_len]) else {
            send_nack(link, NackCode::InvalidPayload);
            return;
        };
        let value_bytes = &payload[3 + name_len..];
        let Some(value) = decode_param_value(kind, value_bytes) else {
            send_nack(link, NackCode::InvalidPayload);
            return;
        };

        let Some(seg) = strip.segment_mut(seg_id) else {
            send_nack(link, NackCode::InvalidSegment);
            return;
        };
        let Some(fx) = seg.effect_mut() else {
            send_nack(link, NackCode::NoEffect);
            return;
        };
        let Some(param) = fx.find_parameter(name) else {
            send_nack(link, NackCode::UnknownParameter);
            return;
        };
        if param.kind() != kind {
            // the name resolved but the peer sent the wrong type
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        match fx.set_parameter(name, value) {
            Ok(()) => send_ack(link, AckCode::ParamSet),
            Err(_) => send_nack(link, NackCode::InvalidPayload),
        }
    }

    fn handle_get_effect_info<B: PixelBus, L: FrameLink>(
        &mut self,
        payload: &[u8],
        strip: &Strip<B>,
        link: &mut L,
    ) {
        if payload.len() < 2 {
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        let seg_id = payload[0];
        let index = usize::from(payload[1]);
        let Some(name) = effect_name_by_index(index) else {
            send_nack(link, NackCode::UnknownEffect);
            return;
        };

        // report the live instance when the segment is running this very
        // effect, so freshly written parameter values read back
        if let Some(fx) = strip
            .segment(seg_id)
            .and_then(|seg| seg.effect())
            .filter(|fx| fx.name().eq_ignore_ascii_case(name))
        {
            send_document(link, &config::effect_info(fx).to_string());
            return;
        }

        match config::effect_info_document(name) {
            Some(doc) => send_document(link, &doc.to_string()),
            None => send_nack(link, NackCode::UnknownEffect),
        }
    }

    fn handle_set_led_count<B, S, L>(
        &mut self,
        payload: &[u8],
        strip: &mut Strip<B>,
        store: &mut S,
        link: &mut L,
    ) -> Option<RestartRequest>
    where
        B: PixelBus,
        S: ConfigStore,
        L: FrameLink,
    {
        if payload.len() != 2 {
            send_nack(link, NackCode::InvalidPayload);
            return None;
        }
        let count = u16::from_be_bytes([payload[0], payload[1]]);
        if count == 0 || count > crate::MAX_LED_COUNT {
            send_nack(link, NackCode::InvalidPayload);
            return None;
        }
        if let Err(err) = config::save_resized(store, strip, count) {
            log::error!("saving resized configuration failed: {}", err);
            send_nack(link, NackCode::FsError);
            return None;
        }
        send_ack(link, AckCode::Restarting);
        Some(RestartRequest { led_count: count })
    }

    fn handle_count<B: PixelBus, L: FrameLink>(
        &mut self,
        frame: &[u8],
        now: Millis,
        strip: &mut Strip<B>,
        link: &mut L,
    ) {
        if frame.len() != 2 {
            log::warn!("expected a segment count, resetting transfer");
            self.reset_transfer();
            send_nack(link, NackCode::InvalidPayload);
            return;
        }
        self.expected_segments = u16::from_be_bytes([frame[0], frame[1]]);
        self.received_segments = 0;
        self.last_activity = now;
        send_ack(link, AckCode::Generic);
        if self.expected_segments == 0 {
            strip.latch();
            self.reset_transfer();
        } else {
            self.state = TransferState::ExpectSegmentJson;
        }
    }

    fn handle_body_chunk<B: PixelBus, L: FrameLink>(
        &mut self,
        chunk: &[u8],
        now: Millis,
        strip: &mut Strip<B>,
        link: &mut L,
    ) {
        self.last_activity = now;

        // Between documents the next frame must open a brace (whitespace
        // allowed); anything else is an out-of-band command interrupting
        // the transfer.
        if !self.scanner.in_document() {
            if let Some(&first) = chunk.first() {
                if first != b'{' && !first.is_ascii_whitespace() && self.rx.is_empty() {
                    log::warn!("unexpected frame during transfer, resetting to idle");
                    self.reset_transfer();
                    send_nack(link, NackCode::InvalidPayload);
                    return;
                }
            }
        }

        for &byte in chunk {
            if self.rx.len() >= RX_BUFFER_CAP {
                log::error!("receive buffer overflow, message discarded");
                self.reset_transfer();
                send_nack(link, NackCode::BufferOverflow);
                return;
            }
            self.rx.push(byte);

            if let Some((start, end)) = self.scanner.feed(byte) {
                let parsed: Result<Value, _> = match core::str::from_utf8(&self.rx[start..end]) {
                    Ok(text) => serde_json::from_str(text).map_err(|_| ()),
                    Err(_) => Err(()),
                };
                self.rx.clear();
                self.scanner.reset();

                let Ok(doc) = parsed else {
                    log::warn!("document failed to parse, aborting transfer");
                    self.reset_transfer();
                    send_nack(link, NackCode::JsonError);
                    return;
                };

                match self.state {
                    TransferState::ExpectSegmentJson => {
                        if config::apply_segment_record(strip, &doc).is_err() {
                            self.reset_transfer();
                            send_nack(link, NackCode::JsonError);
                            return;
                        }
                        self.received_segments += 1;
                        send_ack(link, AckCode::Generic);
                        if self.received_segments >= self.expected_segments {
                            strip.latch();
                            self.reset_transfer();
                            return;
                        }
                    }
                    TransferState::ExpectBatchJson => {
                        match config::apply_document(strip, &doc) {
                            Ok(()) => {
                                strip.latch();
                                send_ack(link, AckCode::Generic);
                            }
                            Err(err) => {
                                log::warn!("batch configuration rejected: {}", err);
                                send_nack(link, NackCode::JsonError);
                            }
                        }
                        self.reset_transfer();
                        return;
                    }
                    TransferState::ExpectSingleJson => {
                        match config::apply_segment_record(strip, &doc) {
                            Ok(()) => {
                                strip.latch();
                                send_ack(link, AckCode::Generic);
                            }
                            Err(err) => {
                                log::warn!("segment record rejected: {}", err);
                                send_nack(link, NackCode::JsonError);
                            }
                        }
                        self.reset_transfer();
                        return;
                    }
                    _ => {
                        self.reset_transfer();
                        return;
                    }
                }
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_param_value(kind: ParamKind, bytes: &[u8]) -> Option<ParamValue> {
    match kind {
        ParamKind::Integer => {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(ParamValue::Integer(i32::from_be_bytes(raw)))
        }
        ParamKind::Float => {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(ParamValue::Float(f32::from_be_bytes(raw)))
        }
        ParamKind::Color => {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(ParamValue::Color(u32::from_be_bytes(raw) & 0x00FF_FFFF))
        }
        ParamKind::Boolean => {
            let raw: [u8; 1] = bytes.try_into().ok()?;
            Some(ParamValue::Bool(raw[0] != 0))
        }
    }
}
