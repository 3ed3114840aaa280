//! The main tick: one cooperative loop binding links, sensors and strip.

use crate::codec::{FrameLink, send_ready};
use crate::config::{self, ConfigStore};
use crate::console::Console;
use crate::dispatcher::{Dispatcher, RestartRequest};
use crate::effect::registry::create_effect;
use crate::effect::{Effect, ParamValue};
use crate::inputs::SensorInputs;
use crate::strip::{PixelBus, Strip};
use crate::time::TimeSource;

/// Owner of the whole firmware core.
///
/// Construction loads the persisted configuration (or installs the
/// defaults), then [`tick`](Engine::tick) runs forever from the platform's
/// main loop: pump the radio link, pump the console link, sample sensors,
/// update effects, latch. The loop has no fixed period; effects rate-limit
/// themselves.
///
/// # Type Parameters
/// * `'e` - Lifetime of the borrowed time source and sensor bundle
/// * `B` - Pixel bus implementation type
/// * `T` - Time source implementation type
/// * `R` - Radio link implementation type
/// * `C` - Console link implementation type
/// * `S` - Config store implementation type
pub struct Engine<'e, B, T, R, C, S>
where
    B: PixelBus,
    T: TimeSource,
    R: FrameLink,
    C: FrameLink,
    S: ConfigStore,
{
    strip: Strip<B>,
    time: &'e T,
    radio: R,
    console_link: C,
    store: S,
    inputs: &'e SensorInputs,
    dispatcher: Dispatcher,
    console: Console,
    restart: Option<RestartRequest>,
}

impl<'e, B, T, R, C, S> Engine<'e, B, T, R, C, S>
where
    B: PixelBus,
    T: TimeSource,
    R: FrameLink,
    C: FrameLink,
    S: ConfigStore,
{
    /// Boots the engine: restore the saved configuration or install the
    /// defaults, then announce readiness on the radio link.
    pub fn boot(
        bus: B,
        time: &'e T,
        radio: R,
        console_link: C,
        mut store: S,
        inputs: &'e SensorInputs,
    ) -> Self {
        let saved = match config::load(&mut store) {
            Ok(doc) => doc,
            Err(err) => {
                log::error!("saved configuration unusable: {}", err);
                None
            }
        };

        let led_count = saved
            .as_ref()
            .and_then(config::document_led_count)
            .unwrap_or(crate::DEFAULT_LED_COUNT);
        let mut strip = Strip::new(bus, led_count, crate::DEFAULT_BRIGHTNESS);

        match &saved {
            Some(doc) => {
                if let Err(err) = config::apply_document(&mut strip, doc) {
                    log::error!("failed to apply saved configuration: {}", err);
                } else {
                    log::info!("restored {} segment(s)", strip.segments().len());
                }
            }
            None => {
                // factory state: the root segment runs SolidColor, off
                if let Some(seg) = strip.segment_mut(0) {
                    let mut fx = create_effect("SolidColor", seg.len());
                    if let Some(fx) = fx.as_deref_mut() {
                        let _ = fx.set_parameter("color", ParamValue::Color(0));
                    }
                    seg.set_effect(fx);
                }
                log::info!("no saved configuration, installed defaults");
            }
        }

        let mut engine = Self {
            strip,
            time,
            radio,
            console_link,
            store,
            inputs,
            dispatcher: Dispatcher::new(),
            console: Console::new(),
            restart: None,
        };
        send_ready(&mut engine.radio);
        engine
    }

    /// Runs one pass of the cooperative loop.
    pub fn tick(&mut self) {
        let now = self.time.now();

        // 1. pump the radio link
        while let Some(frame) = self.radio.poll() {
            if let Some(req) = self.dispatcher.handle_frame(
                &frame,
                now,
                &mut self.strip,
                &mut self.store,
                &mut self.radio,
            ) {
                self.restart = Some(req);
            }
        }

        // 2. pump the console link
        while let Some(frame) = self.console_link.poll() {
            let Ok(line) = core::str::from_utf8(&frame) else {
                continue;
            };
            let reply =
                self.console
                    .handle_line(line, &mut self.strip, &mut self.store);
            if !reply.text.is_empty() {
                self.console_link.send(reply.text.as_bytes());
            }
            if let Some(req) = reply.restart {
                self.restart = Some(req);
            }
        }

        // 3. sample sensors and latch triggers into the segments
        let snapshot = self.inputs.snapshot();
        self.strip
            .propagate_trigger(snapshot.trigger_active, snapshot.trigger_level);

        // 4. render and 5. latch
        self.strip.render_tick(now, &snapshot);
        self.strip.latch();

        self.dispatcher.check_timeout(now, &mut self.radio);
    }

    /// Takes a pending restart request, if a command asked for one.
    ///
    /// The platform layer is responsible for actually resetting the
    /// hardware; the new LED count is already persisted.
    pub fn take_restart_request(&mut self) -> Option<RestartRequest> {
        self.restart.take()
    }

    /// The strip, e.g. for diagnostics.
    pub fn strip(&self) -> &Strip<B> {
        &self.strip
    }

    /// Mutable strip access.
    pub fn strip_mut(&mut self) -> &mut Strip<B> {
        &mut self.strip
    }
}
