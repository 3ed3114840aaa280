//! Shared test infrastructure for strip-engine integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;
use strip_engine::codec::DocScanner;
use strip_engine::{ConfigStore, FrameLink, Millis, PixelBus, StoreError, TimeSource};

// ============================================================================
// Mock Pixel Bus
// ============================================================================

/// Mock bus that records every latched frame.
pub struct MockBus {
    pub frames: Vec<Vec<u32>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn last_frame(&self) -> Option<&[u32]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl PixelBus for MockBus {
    fn latch(&mut self, pixels: &[u32]) {
        self.frames.push(pixels.to_vec());
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock clock with controllable time advancement.
pub struct MockClock {
    now: Cell<Millis>,
}

impl MockClock {
    pub fn new() -> Self {
        Self { now: Cell::new(0) }
    }

    /// Advance time by the given number of milliseconds.
    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: Millis) {
        self.now.set(ms);
    }
}

impl TimeSource for MockClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}

// ============================================================================
// Mock Frame Link
// ============================================================================

/// Mock duplex link: queued incoming frames, recorded outgoing frames.
pub struct MockLink {
    pub incoming: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            incoming: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    /// Queues a frame for the next poll.
    pub fn push(&mut self, frame: &[u8]) {
        self.incoming.push_back(frame.to_vec());
    }

    /// Queues a text body as MTU-sized chunks, the way a peer streams a
    /// document.
    pub fn push_chunked(&mut self, body: &str) {
        for chunk in body.as_bytes().chunks(strip_engine::FRAME_MTU) {
            self.push(chunk);
        }
    }

    /// Single-byte control frames (acks, nacks, READY) in emission order.
    /// Control bytes all carry the high bit; document text is ASCII, so a
    /// one-byte trailing chunk never masquerades as one.
    pub fn control_frames(&self) -> Vec<u8> {
        self.sent
            .iter()
            .filter(|frame| frame.len() == 1 && frame[0] >= 0x80)
            .map(|frame| frame[0])
            .collect()
    }

    /// Reassembles chunked document responses by balancing braces across
    /// the sent frames, exactly as the peer would.
    pub fn documents(&self) -> Vec<Value> {
        let bytes: Vec<u8> = self.sent.iter().flatten().copied().collect();
        let mut docs = Vec::new();
        let mut scanner = DocScanner::new();
        for &byte in &bytes {
            if let Some((start, end)) = scanner.feed(byte) {
                if let Ok(text) = std::str::from_utf8(&bytes[start..end]) {
                    if let Ok(doc) = serde_json::from_str(text) {
                        docs.push(doc);
                    }
                }
            }
        }
        docs
    }

    /// Drops everything recorded so far.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl FrameLink for MockLink {
    fn poll(&mut self) -> Option<Vec<u8>> {
        self.incoming.pop_front()
    }

    fn send(&mut self, frame: &[u8]) {
        self.sent.push(frame.to_vec());
    }
}

// Forwarding impl so a test can keep hold of the link while an engine
// drives it.
impl FrameLink for &mut MockLink {
    fn poll(&mut self) -> Option<Vec<u8>> {
        FrameLink::poll(*self)
    }

    fn send(&mut self, frame: &[u8]) {
        FrameLink::send(*self, frame);
    }
}

// ============================================================================
// In-memory Config Store
// ============================================================================

/// Key→blob store backed by a map, shared between "reboots" via clone.
#[derive(Clone, Default)]
pub struct MemStore {
    pub blobs: BTreeMap<String, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, for FS error paths.
    pub fn broken() -> BrokenStore {
        BrokenStore
    }
}

impl ConfigStore for MemStore {
    fn read(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

// Forwarding impl so a test can inspect the store after an engine that
// borrowed it is gone.
impl ConfigStore for &mut MemStore {
    fn read(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        ConfigStore::read(*self, key)
    }

    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        ConfigStore::write(*self, key, data)
    }
}

/// Store that rejects every operation.
pub struct BrokenStore;

impl ConfigStore for BrokenStore {
    fn read(&mut self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::ReadFailed)
    }

    fn write(&mut self, _key: &str, _data: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed)
    }
}

// ============================================================================
// Wire helpers
// ============================================================================

/// Builds a SET_EFFECT frame.
pub fn set_effect_frame(seg_id: u8, name: &str) -> Vec<u8> {
    let mut frame = vec![0x02, seg_id];
    frame.extend_from_slice(name.as_bytes());
    frame
}

/// Builds a SET_EFFECT_PARAMETER frame for an integer parameter.
pub fn set_int_param_frame(seg_id: u8, name: &str, value: i32) -> Vec<u8> {
    let mut frame = vec![0x0A, seg_id, 0x00, name.len() as u8];
    frame.extend_from_slice(name.as_bytes());
    frame.extend_from_slice(&value.to_be_bytes());
    frame
}

/// Builds a SET_EFFECT_PARAMETER frame for a color parameter.
pub fn set_color_param_frame(seg_id: u8, name: &str, value: u32) -> Vec<u8> {
    let mut frame = vec![0x0A, seg_id, 0x02, name.len() as u8];
    frame.extend_from_slice(name.as_bytes());
    frame.extend_from_slice(&value.to_be_bytes());
    frame
}
