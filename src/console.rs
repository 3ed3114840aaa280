//! The console surface: one text command per line.
//!
//! Mirrors the wireless control plane for bench work over a serial monitor.
//! Commands answer with `OK:`/`ERR:` lines or single-line JSON documents;
//! nothing here is chunked, the console line driver frames by newline.

use alloc::format;
use alloc::string::{String, ToString};

use crate::config::{self, ConfigStore};
use crate::dispatcher::RestartRequest;
use crate::effect::registry::create_effect;
use crate::effect::{Effect, ParamKind, ParamValue};
use crate::strip::{PixelBus, Strip};

/// Outcome of one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleReply {
    /// Line-terminated response text.
    pub text: String,
    /// Set when the command demands a reboot.
    pub restart: Option<RestartRequest>,
}

impl ConsoleReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            restart: None,
        }
    }
}

/// Line-oriented command handler.
pub struct Console;

impl Console {
    /// Creates the handler.
    pub fn new() -> Self {
        Self
    }

    /// Handles one command line and produces the response text.
    pub fn handle_line<B: PixelBus, S: ConfigStore>(
        &mut self,
        line: &str,
        strip: &mut Strip<B>,
        store: &mut S,
    ) -> ConsoleReply {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleReply::text("");
        }
        let (verb, args) = match line.split_once(char::is_whitespace) {
            Some((v, rest)) => (v, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "help" => ConsoleReply::text(HELP_TEXT),
            "listeffects" => ConsoleReply::text(
                serde_json::json!({ "effects": crate::effect_names() }).to_string(),
            ),
            "getstatus" => ConsoleReply::text(config::status_document(strip).to_string()),
            "getsavedconfig" => self.get_saved_config(store),
            "saveconfig" => match config::save(store, strip) {
                Ok(()) => ConsoleReply::text("OK: Config saved."),
                Err(_) => ConsoleReply::text("ERR: Failed to save config."),
            },
            "setledcount" => self.set_led_count(args, strip, store),
            "getledcount" => ConsoleReply::text(format!("LED_COUNT: {}", strip.pixel_count())),
            "listsegments" => self.list_segments(strip),
            "clearsegments" => {
                strip.remove_user_segments();
                ConsoleReply::text("OK: User segments cleared.")
            }
            "addsegment" => self.add_segment(args, strip),
            "seteffect" => self.set_effect(args, strip),
            "geteffectinfo" => self.get_effect_info(args, strip),
            "setparameter" | "setparam" => self.set_parameter(args, strip),
            "batchconfig" => self.batch_config(args, strip),
            _ => ConsoleReply::text(format!(
                "ERR: Unknown command '{}'. Type 'help' for a list of commands.",
                verb
            )),
        }
    }

    fn get_saved_config<S: ConfigStore>(&self, store: &mut S) -> ConsoleReply {
        match store.read(config::STATE_KEY) {
            Ok(Some(blob)) => match String::from_utf8(blob) {
                Ok(text) => ConsoleReply::text(text),
                Err(_) => ConsoleReply::text("{}"),
            },
            _ => ConsoleReply::text("{}"),
        }
    }

    fn set_led_count<B: PixelBus, S: ConfigStore>(
        &self,
        args: &str,
        strip: &mut Strip<B>,
        store: &mut S,
    ) -> ConsoleReply {
        let Ok(count) = args.parse::<u16>() else {
            return ConsoleReply::text("ERR: Missing LED count.");
        };
        if count == 0 || count > crate::MAX_LED_COUNT {
            return ConsoleReply::text("ERR: Invalid LED count.");
        }
        match config::save_resized(store, strip, count) {
            Ok(()) => ConsoleReply {
                text: format!(
                    "LED count set to {}. Restarting to apply changes.",
                    count
                ),
                restart: Some(RestartRequest { led_count: count }),
            },
            Err(_) => ConsoleReply::text("ERR: Failed to save config."),
        }
    }

    fn list_segments<B: PixelBus>(&self, strip: &Strip<B>) -> ConsoleReply {
        let mut out = String::new();
        for seg in strip.segments() {
            out.push_str(&format!(
                "Segment {}: '{}' ({}-{})\n",
                seg.id(),
                seg.name(),
                seg.start(),
                seg.end()
            ));
        }
        out.pop();
        ConsoleReply::text(out)
    }

    fn add_segment<B: PixelBus>(&self, args: &str, strip: &mut Strip<B>) -> ConsoleReply {
        let mut parts = args.splitn(3, char::is_whitespace);
        let start = parts.next().and_then(|v| v.parse::<u16>().ok());
        let end = parts.next().and_then(|v| v.parse::<u16>().ok());
        let (Some(start), Some(end)) = (start, end) else {
            return ConsoleReply::text("ERR: Invalid segment range. Use: addsegment <start> <end> [name]");
        };
        let fallback = format!("segment{}", strip.segments().len());
        let name = match parts.next().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => &fallback,
        };
        match strip.add_segment(start, end, name) {
            Ok(_) => ConsoleReply::text("OK: Segment added."),
            Err(err) => ConsoleReply::text(format!("ERR: {}", err)),
        }
    }

    fn set_effect<B: PixelBus>(&self, args: &str, strip: &mut Strip<B>) -> ConsoleReply {
        let Some((id_str, name)) = args.split_once(char::is_whitespace) else {
            return ConsoleReply::text("ERR: Invalid arguments. Use: seteffect <seg_id> <EffectName>");
        };
        let name = name.trim();
        let Ok(seg_id) = id_str.parse::<u8>() else {
            return ConsoleReply::text("ERR: Invalid segment index.");
        };
        let Some(seg) = strip.segment_mut(seg_id) else {
            return ConsoleReply::text("ERR: Invalid segment index.");
        };
        match create_effect(name, seg.len()) {
            Some(fx) => {
                seg.set_effect(Some(fx));
                ConsoleReply::text("OK: Effect set.")
            }
            None => ConsoleReply::text(format!("ERR: Unknown effect '{}'", name)),
        }
    }

    fn get_effect_info<B: PixelBus>(&self, args: &str, strip: &Strip<B>) -> ConsoleReply {
        let Ok(seg_id) = args.trim().parse::<u8>() else {
            return ConsoleReply::text("ERR: Missing arguments for geteffectinfo.");
        };
        let Some(seg) = strip.segment(seg_id) else {
            return ConsoleReply::text("ERR: Invalid segment index.");
        };
        match seg.effect() {
            Some(fx) => ConsoleReply::text(config::effect_info(fx).to_string()),
            None => ConsoleReply::text("ERR: No active effect on segment."),
        }
    }

    fn set_parameter<B: PixelBus>(&self, args: &str, strip: &mut Strip<B>) -> ConsoleReply {
        let mut parts = args.splitn(3, char::is_whitespace);
        let seg_id = parts.next().and_then(|v| v.parse::<u8>().ok());
        let name = parts.next();
        let value_text = parts.next().map(str::trim);
        let (Some(seg_id), Some(name), Some(value_text)) = (seg_id, name, value_text) else {
            return ConsoleReply::text(
                "ERR: Invalid arguments. Use: setparameter <seg_id> <param> <value>",
            );
        };
        let Some(seg) = strip.segment_mut(seg_id) else {
            return ConsoleReply::text("ERR: Invalid segment index.");
        };
        let Some(fx) = seg.effect_mut() else {
            return ConsoleReply::text("ERR: No active effect on segment.");
        };
        let Some(param) = fx.find_parameter(name) else {
            return ConsoleReply::text(format!("ERR: Unknown parameter '{}'", name));
        };
        let Some(value) = parse_value_text(param.kind(), value_text) else {
            return ConsoleReply::text(format!("ERR: Invalid value '{}'", value_text));
        };
        match fx.set_parameter(name, value) {
            Ok(()) => ConsoleReply::text("OK: Parameter set."),
            Err(err) => ConsoleReply::text(format!("ERR: {}", err)),
        }
    }

    fn batch_config<B: PixelBus>(&self, args: &str, strip: &mut Strip<B>) -> ConsoleReply {
        let Ok(doc) = serde_json::from_str(args) else {
            return ConsoleReply::text("ERR: JSON parse error.");
        };
        match config::apply_document(strip, &doc) {
            Ok(()) => {
                strip.latch();
                ConsoleReply::text("OK: Batch configuration applied.")
            }
            Err(err) => ConsoleReply::text(format!("ERR: {}", err)),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a console value literal by the parameter's declared kind.
fn parse_value_text(kind: ParamKind, text: &str) -> Option<ParamValue> {
    match kind {
        ParamKind::Integer => parse_number(text).map(ParamValue::Integer),
        ParamKind::Float => text.parse::<f32>().ok().map(ParamValue::Float),
        ParamKind::Color => parse_number(text).map(|v| ParamValue::Color(v as u32)),
        ParamKind::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Some(ParamValue::Bool(true)),
            "false" | "0" | "off" => Some(ParamValue::Bool(false)),
            _ => None,
        },
    }
}

fn parse_number(text: &str) -> Option<i32> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('#'))
    {
        u32::from_str_radix(hex, 16).ok().map(|v| v as i32)
    } else {
        text.parse::<i32>().ok()
    }
}

const HELP_TEXT: &str = "\
Available commands:
  help                         - Prints this help text.
  getstatus                    - Prints the current status of the device as JSON.
  getsavedconfig               - Prints the saved configuration from the filesystem.
  saveconfig                   - Saves the current configuration to the filesystem.
  getledcount                  - Prints the current LED count.
  setledcount <count>          - Sets the total number of LEDs and restarts.
  listsegments                 - Lists all current segments.
  clearsegments                - Deletes all user-defined segments.
  addsegment <start> <end> [name]
                               - Adds a new segment.
  listeffects                  - Lists all available effects.
  seteffect <seg_id> <effect>  - Sets an effect on a specific segment.
  geteffectinfo <seg_id>       - Gets parameter info for the active effect.
  setparameter <seg_id> <param> <value>
                               - Sets a parameter for the active effect on a segment.
  batchconfig <json>           - Applies a full configuration from a JSON string.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;
    use config::StoreError;

    struct NullBus;

    impl crate::strip::PixelBus for NullBus {
        fn latch(&mut self, _pixels: &[u32]) {}
    }

    struct MemStore {
        blobs: BTreeMap<String, Vec<u8>>,
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

    fn setup() -> (Console, Strip<NullBus>, MemStore) {
        (
            Console::new(),
            Strip::new(NullBus, 150, 10),
            MemStore {
                blobs: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn unknown_commands_point_at_help() {
        let (mut console, mut strip, mut store) = setup();
        let reply = console.handle_line("frobnicate", &mut strip, &mut store);
        assert!(reply.text.starts_with("ERR: Unknown command 'frobnicate'"));
    }

    #[test]
    fn getledcount_reports_the_pixel_count() {
        let (mut console, mut strip, mut store) = setup();
        let reply = console.handle_line("getledcount", &mut strip, &mut store);
        assert_eq!(reply.text, "LED_COUNT: 150");
    }

    #[test]
    fn addsegment_and_listsegments_round_trip() {
        let (mut console, mut strip, mut store) = setup();
        let reply = console.handle_line("addsegment 10 19 wrist", &mut strip, &mut store);
        assert_eq!(reply.text, "OK: Segment added.");

        let reply = console.handle_line("listsegments", &mut strip, &mut store);
        assert!(reply.text.contains("Segment 0: 'all' (0-149)"));
        assert!(reply.text.contains("Segment 1: 'wrist' (10-19)"));
    }

    #[test]
    fn addsegment_defaults_the_name() {
        let (mut console, mut strip, mut store) = setup();
        console.handle_line("addsegment 0 9", &mut strip, &mut store);
        assert_eq!(strip.segment(1).unwrap().name(), "segment1");
    }

    #[test]
    fn seteffect_is_case_insensitive_and_validates() {
        let (mut console, mut strip, mut store) = setup();
        let reply = console.handle_line("seteffect 0 rainbowchase", &mut strip, &mut store);
        assert_eq!(reply.text, "OK: Effect set.");
        assert_eq!(strip.segment(0).unwrap().effect().unwrap().name(), "RainbowChase");

        let reply = console.handle_line("seteffect 0 nosuch", &mut strip, &mut store);
        assert_eq!(reply.text, "ERR: Unknown effect 'nosuch'");
        let reply = console.handle_line("seteffect 9 SolidColor", &mut strip, &mut store);
        assert_eq!(reply.text, "ERR: Invalid segment index.");
    }

    #[test]
    fn setparameter_coerces_by_declared_kind() {
        let (mut console, mut strip, mut store) = setup();
        console.handle_line("seteffect 0 SolidColor", &mut strip, &mut store);
        let reply = console.handle_line("setparameter 0 color 0xFF8000", &mut strip, &mut store);
        assert_eq!(reply.text, "OK: Parameter set.");
        assert_eq!(
            strip
                .segment(0)
                .unwrap()
                .effect()
                .unwrap()
                .find_parameter("color")
                .unwrap()
                .as_color(),
            0x00FF_8000
        );

        console.handle_line("seteffect 0 RainbowChase", &mut strip, &mut store);
        let reply = console.handle_line("setparameter 0 speed 42", &mut strip, &mut store);
        assert_eq!(reply.text, "OK: Parameter set.");
        let reply = console.handle_line("setparameter 0 bogus 1", &mut strip, &mut store);
        assert_eq!(reply.text, "ERR: Unknown parameter 'bogus'");
    }

    #[test]
    fn geteffectinfo_reports_current_values() {
        let (mut console, mut strip, mut store) = setup();
        let reply = console.handle_line("geteffectinfo 0", &mut strip, &mut store);
        assert_eq!(reply.text, "ERR: No active effect on segment.");

        console.handle_line("seteffect 0 RainbowChase", &mut strip, &mut store);
        console.handle_line("setparameter 0 speed 75", &mut strip, &mut store);
        let reply = console.handle_line("geteffectinfo 0", &mut strip, &mut store);
        let doc: serde_json::Value = serde_json::from_str(&reply.text).unwrap();
        assert_eq!(doc["effect"], "RainbowChase");
        assert_eq!(doc["params"][0]["value"], 75);
    }

    #[test]
    fn saveconfig_then_getsavedconfig_round_trips() {
        let (mut console, mut strip, mut store) = setup();
        assert_eq!(
            console.handle_line("getsavedconfig", &mut strip, &mut store).text,
            "{}"
        );
        let reply = console.handle_line("saveconfig", &mut strip, &mut store);
        assert_eq!(reply.text, "OK: Config saved.");
        let reply = console.handle_line("getsavedconfig", &mut strip, &mut store);
        let doc: serde_json::Value = serde_json::from_str(&reply.text).unwrap();
        assert_eq!(doc["led_count"], 150);
    }

    #[test]
    fn setledcount_requests_a_restart() {
        let (mut console, mut strip, mut store) = setup();
        let reply = console.handle_line("setledcount 300", &mut strip, &mut store);
        assert_eq!(reply.restart, Some(RestartRequest { led_count: 300 }));
        assert!(reply.text.contains("Restarting"));

        let reply = console.handle_line("setledcount 9000", &mut strip, &mut store);
        assert_eq!(reply.text, "ERR: Invalid LED count.");
        assert_eq!(reply.restart, None);
    }

    #[test]
    fn batchconfig_applies_a_document_inline() {
        let (mut console, mut strip, mut store) = setup();
        let line = r#"batchconfig {"segments":[{"id":1,"name":"band","startLed":5,"endLed":14,"effect":"Fire","sparking":200}]}"#;
        let reply = console.handle_line(line, &mut strip, &mut store);
        assert_eq!(reply.text, "OK: Batch configuration applied.");
        let seg = strip.segment(1).unwrap();
        assert_eq!(seg.name(), "band");
        assert_eq!(
            seg.effect().unwrap().find_parameter("sparking").unwrap().as_i32(),
            200
        );
    }
}
