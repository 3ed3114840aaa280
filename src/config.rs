//! Configuration documents and persistence.
//!
//! The strip's observable state serializes to a self-describing JSON
//! document: the LED count plus one record per segment, with every
//! parameter of the bound effect flattened into the record. The same
//! document format flows over the wire (BATCH_CONFIG, the segment
//! transfer, the status reads) and into the [`ConfigStore`].

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::effect::registry::{create_effect, effect_names};
use crate::effect::{Effect, ParamKind, ParamValue};
use crate::segment::{ROOT_SEGMENT_NAME, Segment, SegmentError};
use crate::strip::{PixelBus, Strip};

/// Store key of the persisted configuration document.
pub const STATE_KEY: &str = "state.json";

/// Store key of the advertised device name blob.
pub const DEVICE_NAME_KEY: &str = "device_name";

/// Name advertised when no blob is stored.
pub const DEFAULT_DEVICE_NAME: &str = "LED-STRIP";

/// Errors surfaced by [`ConfigStore`] implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The blob could not be read.
    ReadFailed,
    /// The blob could not be written.
    WriteFailed,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::ReadFailed => write!(f, "failed to read from the config store"),
            StoreError::WriteFailed => write!(f, "failed to write to the config store"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StoreError {}

/// Trait for abstracting key→blob persistence (a filesystem, NVS, ...).
pub trait ConfigStore {
    /// Reads a blob; `None` when the key has never been written.
    fn read(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Writes a blob, replacing any previous value.
    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// Errors from document handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The document is not valid JSON or not the expected shape.
    Json,
    /// A segment operation failed while applying a record.
    Segment(SegmentError),
    /// The persistence layer failed.
    Store(StoreError),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Json => write!(f, "configuration document error"),
            ConfigError::Segment(err) => write!(f, "segment error: {}", err),
            ConfigError::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl From<SegmentError> for ConfigError {
    fn from(err: SegmentError) -> Self {
        ConfigError::Segment(err)
    }
}

impl From<StoreError> for ConfigError {
    fn from(err: StoreError) -> Self {
        ConfigError::Store(err)
    }
}

#[derive(Serialize)]
struct ParamInfo {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    value: Value,
    min: f32,
    max: f32,
}

#[derive(Serialize)]
struct EffectInfo {
    effect: &'static str,
    params: Vec<ParamInfo>,
}

fn param_value_json(value: ParamValue) -> Value {
    match value {
        ParamValue::Integer(v) => json!(v),
        ParamValue::Float(v) => json!(v),
        ParamValue::Color(v) => json!(v),
        ParamValue::Bool(v) => json!(v),
    }
}

/// Builds one segment record: identity, range, brightness, effect name and
/// the effect's parameters flattened at record top level.
pub fn segment_record(seg: &Segment) -> Value {
    let mut record = Map::new();
    record.insert("id".into(), json!(seg.id()));
    record.insert("name".into(), json!(seg.name()));
    record.insert("startLed".into(), json!(seg.start()));
    record.insert("endLed".into(), json!(seg.end()));
    record.insert("brightness".into(), json!(seg.brightness()));
    match seg.effect() {
        Some(fx) => {
            record.insert("effect".into(), json!(fx.name()));
            for i in 0..fx.parameter_count() {
                if let Some(p) = fx.parameter(i) {
                    record.insert(p.name().into(), param_value_json(p.value()));
                }
            }
        }
        None => {
            record.insert("effect".into(), json!("None"));
        }
    }
    Value::Object(record)
}

/// Builds the full Strip Configuration Document.
pub fn build_document<B: PixelBus>(strip: &Strip<B>) -> Value {
    let segments: Vec<Value> = strip.segments().iter().map(segment_record).collect();
    json!({
        "led_count": strip.pixel_count(),
        "segments": segments,
    })
}

/// Builds the aggregate status document: LED count, root brightness, the
/// registry names and every segment record.
pub fn status_document<B: PixelBus>(strip: &Strip<B>) -> Value {
    let segments: Vec<Value> = strip.segments().iter().map(segment_record).collect();
    let brightness = strip.segments().first().map(Segment::brightness).unwrap_or(0);
    json!({
        "led_count": strip.pixel_count(),
        "brightness": brightness,
        "available_effects": effect_names(),
        "segments": segments,
    })
}

/// Builds the `{effect, params: [...]}` document for an effect instance,
/// reporting its current parameter values.
pub fn effect_info(fx: &dyn Effect) -> Value {
    let params = (0..fx.parameter_count())
        .filter_map(|i| fx.parameter(i))
        .map(|p| ParamInfo {
            name: p.name(),
            kind: p.kind().as_str(),
            value: param_value_json(p.value()),
            min: p.min(),
            max: p.max(),
        })
        .collect();
    let info = EffectInfo {
        effect: fx.name(),
        params,
    };
    serde_json::to_value(info).unwrap_or(Value::Null)
}

/// Builds the schema document for one registry entry by instantiating a
/// disposable copy. `None` for unknown names.
pub fn effect_info_document(name: &str) -> Option<Value> {
    let fx = create_effect(name, 1)?;
    Some(effect_info(fx.as_ref()))
}

/// Builds the registry document listing every effect with its schema.
pub fn effects_document() -> Value {
    let effects: Vec<Value> = effect_names()
        .iter()
        .copied()
        .filter_map(effect_info_document)
        .collect();
    json!({ "effects": effects })
}

fn coerce(kind: ParamKind, field: &Value) -> Option<ParamValue> {
    match kind {
        ParamKind::Integer => field
            .as_i64()
            .or_else(|| field.as_f64().map(|v| v as i64))
            .and_then(|v| i32::try_from(v).ok())
            .map(ParamValue::Integer),
        ParamKind::Float => field.as_f64().map(|v| ParamValue::Float(v as f32)),
        ParamKind::Color => field
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(ParamValue::Color),
        ParamKind::Boolean => field
            .as_bool()
            .or_else(|| field.as_i64().map(|v| v != 0))
            .map(ParamValue::Bool),
    }
}

/// Applies one segment record: find the target by id (the root also answers
/// to the name `"all"`), creating it with the record's id when absent; then
/// merge name, range, brightness, effect and parameters.
pub fn apply_segment_record<B: PixelBus>(
    strip: &mut Strip<B>,
    record: &Value,
) -> Result<(), ConfigError> {
    let obj = record.as_object().ok_or(ConfigError::Json)?;

    let id = obj
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok());
    let name = obj.get("name").and_then(Value::as_str);
    let start = obj
        .get("startLed")
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok());
    let end = obj
        .get("endLed")
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok());

    let is_root =
        id == Some(0) || name.is_some_and(|n| n.eq_ignore_ascii_case(ROOT_SEGMENT_NAME));

    let seg_id = if is_root {
        0
    } else if let Some(existing) = id.filter(|i| strip.segment(*i).is_some()) {
        existing
    } else {
        let (s, e) = (start.unwrap_or(0), end.unwrap_or(0));
        let new_name = name.unwrap_or("segment");
        match id {
            Some(i) => strip.adopt_segment(i, s, e, new_name)?,
            None => strip.add_segment(s, e, new_name)?,
        }
    };

    if let (Some(s), Some(e)) = (start, end) {
        if let Err(err) = strip.set_segment_range(seg_id, s, e) {
            log::warn!("segment {} keeps its range: {}", seg_id, err);
        }
    }

    let seg = strip
        .segment_mut(seg_id)
        .ok_or(ConfigError::Segment(SegmentError::UnknownSegment(seg_id)))?;

    if !is_root {
        if let Some(n) = name {
            seg.rename(n);
        }
    }
    if let Some(b) = obj.get("brightness").and_then(Value::as_u64) {
        seg.set_brightness(b.min(255) as u8);
    }

    if let Some(effect_name) = obj.get("effect").and_then(Value::as_str) {
        if effect_name.eq_ignore_ascii_case("none") {
            seg.set_effect(None);
        } else {
            let differs = seg
                .effect()
                .is_none_or(|fx| !fx.name().eq_ignore_ascii_case(effect_name));
            if differs {
                let seg_len = seg.len();
                match create_effect(effect_name, seg_len) {
                    Some(fx) => seg.set_effect(Some(fx)),
                    None => {
                        log::warn!("unknown effect '{}' in document", effect_name);
                    }
                }
            }
        }
    }

    // assign every advertised parameter the record carries a field for
    if let Some(fx) = seg.effect_mut() {
        for i in 0..fx.parameter_count() {
            let Some(p) = fx.parameter(i) else { continue };
            let (pname, kind) = (p.name(), p.kind());
            if let Some(field) = obj.get(pname) {
                if let Some(value) = coerce(kind, field) {
                    let _ = fx.set_parameter(pname, value);
                } else {
                    log::warn!("field '{}' has the wrong type, ignored", pname);
                }
            }
        }
    }

    Ok(())
}

/// Applies a full document as BATCH_CONFIG does: clear user segments, then
/// apply every record in order. The document's `led_count` is ignored here;
/// it only matters at boot when the strip is constructed.
pub fn apply_document<B: PixelBus>(strip: &mut Strip<B>, doc: &Value) -> Result<(), ConfigError> {
    let segments = doc
        .get("segments")
        .and_then(Value::as_array)
        .ok_or(ConfigError::Json)?;
    strip.remove_user_segments();
    for record in segments {
        apply_segment_record(strip, record)?;
    }
    Ok(())
}

/// Reads the LED count a document was saved under.
pub fn document_led_count(doc: &Value) -> Option<u16> {
    doc.get("led_count")
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok())
        .filter(|&v| v >= 1 && v <= crate::MAX_LED_COUNT)
}

/// Loads the persisted configuration document, if any.
pub fn load<S: ConfigStore>(store: &mut S) -> Result<Option<Value>, ConfigError> {
    let Some(blob) = store.read(STATE_KEY)? else {
        return Ok(None);
    };
    let text = core::str::from_utf8(&blob).map_err(|_| ConfigError::Json)?;
    let doc = serde_json::from_str(text).map_err(|_| ConfigError::Json)?;
    Ok(Some(doc))
}

/// Serializes the current strip and persists it.
pub fn save<B: PixelBus, S: ConfigStore>(
    store: &mut S,
    strip: &Strip<B>,
) -> Result<(), StoreError> {
    let doc = build_document(strip);
    store.write(STATE_KEY, doc.to_string().as_bytes())
}

/// Persists the configuration under a new LED count.
///
/// The root segment is rewritten to span the new strip; user segments
/// entirely beyond the new count are dropped and straddling ones clamped,
/// so every saved record is valid by construction when the device reboots.
pub fn save_resized<B: PixelBus, S: ConfigStore>(
    store: &mut S,
    strip: &Strip<B>,
    new_count: u16,
) -> Result<(), StoreError> {
    let new_count = new_count.max(1);
    let mut segments = Vec::new();
    for seg in strip.segments() {
        let (start, end) = if seg.id() == 0 {
            (0, new_count - 1)
        } else if seg.start() >= new_count {
            log::warn!("segment {} dropped by the new LED count", seg.id());
            continue;
        } else {
            (seg.start(), seg.end().min(new_count - 1))
        };
        let mut record = segment_record(seg);
        record["startLed"] = json!(start);
        record["endLed"] = json!(end);
        segments.push(record);
    }
    let doc = json!({ "led_count": new_count, "segments": segments });
    store.write(STATE_KEY, doc.to_string().as_bytes())
}

/// Reads the advertised device name, falling back to the default.
pub fn load_device_name<S: ConfigStore>(store: &mut S) -> String {
    match store.read(DEVICE_NAME_KEY) {
        Ok(Some(blob)) => match String::from_utf8(blob) {
            Ok(name) if !name.is_empty() => name,
            _ => DEFAULT_DEVICE_NAME.into(),
        },
        _ => DEFAULT_DEVICE_NAME.into(),
    }
}

/// Persists the advertised device name.
pub fn save_device_name<S: ConfigStore>(store: &mut S, name: &str) -> Result<(), StoreError> {
    store.write(DEVICE_NAME_KEY, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strip::PixelBus;
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;

    struct NullBus;

    impl PixelBus for NullBus {
        fn latch(&mut self, _pixels: &[u32]) {}
    }

    struct MemStore {
        blobs: BTreeMap<String, Vec<u8>>,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                blobs: BTreeMap::new(),
            }
        }
    }

    impl ConfigStore for MemStore {
        fn read(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.blobs.get(key).cloned())
        }

        fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StoreError> {
            self.blobs.insert(key.into(), data.to_vec());
            Ok(())
        }
    }

    fn strip() -> Strip<NullBus> {
        Strip::new(NullBus, 150, 10)
    }

    #[test]
    fn segment_record_flattens_effect_parameters() {
        let mut s = strip();
        let id = s.add_segment(10, 19, "wrist").unwrap();
        let seg = s.segment_mut(id).unwrap();
        seg.set_effect(create_effect("Fire", 10));

        let record = segment_record(s.segment(id).unwrap());
        assert_eq!(record["id"], json!(1));
        assert_eq!(record["name"], json!("wrist"));
        assert_eq!(record["startLed"], json!(10));
        assert_eq!(record["endLed"], json!(19));
        assert_eq!(record["effect"], json!("Fire"));
        assert_eq!(record["sparking"], json!(120));
        assert_eq!(record["cooling"], json!(55));
    }

    #[test]
    fn record_without_effect_says_none() {
        let s = strip();
        let record = segment_record(&s.segments()[0]);
        assert_eq!(record["effect"], json!("None"));
    }

    #[test]
    fn apply_record_creates_segment_with_document_id() {
        let mut s = strip();
        let record = json!({
            "id": 3, "name": "band", "startLed": 20, "endLed": 29,
            "brightness": 128, "effect": "SolidColor", "color": 0x00FF00,
        });
        apply_segment_record(&mut s, &record).unwrap();

        let seg = s.segment(3).unwrap();
        assert_eq!(seg.name(), "band");
        assert_eq!((seg.start(), seg.end()), (20, 29));
        assert_eq!(seg.brightness(), 128);
        let fx = seg.effect().unwrap();
        assert_eq!(fx.name(), "SolidColor");
        assert_eq!(fx.find_parameter("color").unwrap().as_color(), 0x00FF00);
    }

    #[test]
    fn apply_record_updates_the_root_by_name() {
        let mut s = strip();
        let record = json!({
            "name": "ALL", "startLed": 0, "endLed": 99, "brightness": 42,
            "effect": "RainbowChase", "speed": 77,
        });
        apply_segment_record(&mut s, &record).unwrap();

        let root = s.segment(0).unwrap();
        assert_eq!(root.name(), "all", "root keeps its reserved name");
        assert_eq!((root.start(), root.end()), (0, 99));
        assert_eq!(root.brightness(), 42);
        assert_eq!(
            root.effect().unwrap().find_parameter("speed").unwrap().as_i32(),
            77
        );
    }

    #[test]
    fn apply_record_keeps_effect_instance_when_name_matches() {
        let mut s = strip();
        let root = s.segment_mut(0).unwrap();
        root.set_effect(create_effect("Fire", 150));
        root.effect_mut()
            .unwrap()
            .set_parameter("sparking", ParamValue::Integer(200))
            .unwrap();

        // same effect name, no parameter fields: nothing resets
        let record = json!({ "id": 0, "effect": "Fire" });
        apply_segment_record(&mut s, &record).unwrap();
        let fx = s.segment(0).unwrap().effect().unwrap();
        assert_eq!(fx.find_parameter("sparking").unwrap().as_i32(), 200);
    }

    #[test]
    fn apply_record_with_unknown_effect_keeps_the_previous_one() {
        let mut s = strip();
        s.segment_mut(0).unwrap().set_effect(create_effect("Fire", 150));
        let record = json!({ "id": 0, "effect": "Nonexistent" });
        apply_segment_record(&mut s, &record).unwrap();
        assert_eq!(s.segment(0).unwrap().effect().unwrap().name(), "Fire");
    }

    #[test]
    fn apply_document_round_trips_through_save_and_load() {
        let mut s = strip();
        let id = s.add_segment(10, 19, "wrist").unwrap();
        s.segment_mut(id).unwrap().set_effect(create_effect("Fire", 10));
        s.segment_mut(id)
            .unwrap()
            .effect_mut()
            .unwrap()
            .set_parameter("sparking", ParamValue::Integer(200))
            .unwrap();

        let mut store = MemStore::new();
        save(&mut store, &s).unwrap();

        let doc = load(&mut store).unwrap().unwrap();
        assert_eq!(document_led_count(&doc), Some(150));

        let mut restored = strip();
        apply_document(&mut restored, &doc).unwrap();
        assert_eq!(build_document(&restored), build_document(&s));
    }

    #[test]
    fn load_reports_missing_config_as_none() {
        let mut store = MemStore::new();
        assert_eq!(load(&mut store).unwrap(), None);
    }

    #[test]
    fn save_resized_truncates_and_drops_user_segments() {
        let mut s = strip();
        s.add_segment(40, 60, "straddle").unwrap();
        s.add_segment(100, 149, "beyond").unwrap();

        let mut store = MemStore::new();
        save_resized(&mut store, &s, 50).unwrap();

        let doc = load(&mut store).unwrap().unwrap();
        assert_eq!(document_led_count(&doc), Some(50));
        let segments = doc["segments"].as_array().unwrap();
        assert_eq!(segments.len(), 2, "the out-of-range segment is dropped");
        assert_eq!(segments[0]["endLed"], json!(49));
        assert_eq!(segments[1]["startLed"], json!(40));
        assert_eq!(segments[1]["endLed"], json!(49));
    }

    #[test]
    fn effect_info_document_matches_the_introspection_surface() {
        let doc = effect_info_document("RainbowChase").unwrap();
        assert_eq!(doc["effect"], json!("RainbowChase"));
        let params = doc["params"].as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["name"], json!("speed"));
        assert_eq!(params[0]["type"], json!("integer"));
        assert_eq!(params[0]["value"], json!(30));
        assert_eq!(params[0]["min"], json!(5.0));
        assert_eq!(params[0]["max"], json!(100.0));
        assert!(effect_info_document("Nonexistent").is_none());
    }

    #[test]
    fn device_name_defaults_and_round_trips() {
        let mut store = MemStore::new();
        assert_eq!(load_device_name(&mut store), DEFAULT_DEVICE_NAME);
        save_device_name(&mut store, "wristband-7").unwrap();
        assert_eq!(load_device_name(&mut store), "wristband-7");
    }
}
