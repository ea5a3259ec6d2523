//! Adapter for the hosted polyphonic engine.
//!
//! The engine only understands three-byte wire messages and patch loads, so
//! the bridge encodes every trigger itself. Anything meant for later is put
//! on the shared transport as a `Cue::Deliver` and handed back through
//! `deliver` when it fires; stopping or cancelling the transport drops those
//! cues along with the song's own.

use tracing::{debug, info};

use super::param::{ParamCatalog, ParamValue, Parameter};
use super::{SynthAdapter, SynthError, SynthId};
use crate::engine::clock::{Cue, Transport};
use crate::io::midi::MidiEvent;
use crate::note::{NoteEvent, Pitch};
use crate::patch::{InstrumentSettings, Patch, PatchLibrary, Waveform};

/// What the bridge needs from an engine.
pub trait ExternalEngine {
    /// One `[status, note, value]` message into the engine's inlet.
    fn external_message(&mut self, bytes: [u8; 3]);

    fn load(&mut self, patch: &Patch);

    /// Snapshot of the live settings. Edits only take effect through
    /// `set_settings`.
    fn settings(&self) -> InstrumentSettings;

    fn set_settings(&mut self, settings: InstrumentSettings);

    /// Apply queued messages and advance voice state to `now`.
    fn process(&mut self, _now: f64) {}

    /// Held notes.
    fn active_notes(&self) -> Vec<u8>;

    /// Voices held or still in their release tail.
    fn sounding_count(&self) -> usize;
}

/// The engine together with its patch library; the parameter catalog works
/// on this pair.
pub struct EngineBackend {
    engine: Box<dyn ExternalEngine>,
    library: PatchLibrary,
}

impl EngineBackend {
    /// Read the whole settings object, change it, write it back.
    fn update(&mut self, edit: impl FnOnce(&mut InstrumentSettings)) {
        let mut settings = self.engine.settings();
        edit(&mut settings);
        self.engine.set_settings(settings);
    }

    fn load_patch(&mut self, name: &str) -> Result<(), SynthError> {
        let patch = self.library.select(name).map_err(|_| SynthError::InvalidParameterValue {
            name: "patch".to_string(),
            value: name.to_string(),
        })?;
        self.engine.load(patch);
        Ok(())
    }

    fn params(library: &PatchLibrary) -> ParamCatalog<Self> {
        let patches = library.list_names().into_iter().map(str::to_string).collect();
        ParamCatalog::<Self>::new()
            .choice(
                "patch",
                "Loaded patch",
                patches,
                |b| b.library.selected().name.clone(),
                |b, name| b.load_patch(name),
            )
            .choice(
                "oscillator.type",
                "First oscillator waveform",
                Waveform::names(),
                |b| {
                    b.engine
                        .settings()
                        .oscillators
                        .first()
                        .map_or(Waveform::Sine, |o| o.waveform)
                        .to_string()
                },
                |b, name| {
                    let waveform = Waveform::from_name(name).ok_or_else(|| SynthError::InvalidParameterValue {
                        name: "oscillator.type".to_string(),
                        value: name.to_string(),
                    })?;
                    b.update(|s| {
                        if let Some(osc) = s.oscillators.first_mut() {
                            osc.waveform = waveform;
                        }
                    });
                    Ok(())
                },
            )
            .range(
                "filter.cutoff",
                "Filter cutoff (Hz)",
                20.0,
                20_000.0,
                |b| b.engine.settings().filter.cutoff_hz,
                |b, v| b.update(|s| s.filter.cutoff_hz = v),
            )
            .range(
                "filter.resonance",
                "Filter resonance",
                0.0,
                1.0,
                |b| b.engine.settings().filter.resonance,
                |b, v| b.update(|s| s.filter.resonance = v),
            )
            .range(
                "envelope.attack",
                "Amp attack (ms)",
                0.0,
                5_000.0,
                |b| b.engine.settings().envelope.attack_ms,
                |b, v| b.update(|s| s.envelope.attack_ms = v),
            )
            .range(
                "envelope.release",
                "Amp release (ms)",
                0.0,
                10_000.0,
                |b| b.engine.settings().envelope.release_ms,
                |b, v| b.update(|s| s.envelope.release_ms = v),
            )
            .range(
                "master.volume",
                "Output level",
                0.0,
                1.0,
                |b| b.engine.settings().master_volume,
                |b, v| b.update(|s| s.master_volume = v),
            )
    }
}

pub struct EngineBridge {
    id: SynthId,
    backend: EngineBackend,
    catalog: ParamCatalog<EngineBackend>,
    disposed: bool,
}

impl EngineBridge {
    /// Wrap `engine` and load the library's patch at `default_patch`
    /// (clamped to the last one).
    pub fn new(
        id: impl Into<SynthId>,
        engine: Box<dyn ExternalEngine>,
        mut library: PatchLibrary,
        default_patch: usize,
    ) -> Self {
        let id = id.into();
        let mut engine = engine;
        let patch = library.select_index(default_patch);
        engine.load(patch);
        info!(synth = %id, patch = %patch.name, "engine ready");

        let catalog = EngineBackend::params(&library);
        Self {
            id,
            backend: EngineBackend { engine, library },
            catalog,
            disposed: false,
        }
    }

    pub fn selected_patch(&self) -> &Patch {
        self.backend.library.selected()
    }

    pub fn active_notes(&self) -> Vec<u8> {
        self.backend.engine.active_notes()
    }

    fn send(&mut self, event: MidiEvent) {
        debug!(synth = %self.id, ?event, "engine message");
        self.backend.engine.external_message(event.to_bytes());
    }

    /// Send now if `time` is not in the future, otherwise park it on the clock.
    fn send_at(&mut self, clock: &mut Transport, event: MidiEvent, time: Option<f64>) {
        match time {
            Some(at) if at > clock.now() => {
                clock.schedule_once(
                    Cue::Deliver {
                        synth: self.id.clone(),
                        event,
                    },
                    at,
                );
            }
            _ => self.send(event),
        }
    }
}

impl SynthAdapter for EngineBridge {
    fn id(&self) -> &SynthId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "engine"
    }

    fn trigger_attack(&mut self, clock: &mut Transport, note: NoteEvent) {
        if self.disposed {
            return;
        }
        let Some(pitch) = note.pitch else {
            return;
        };
        // Wire value 0 on a note-on reads as a note-off, so quiet notes floor at 1
        let event = MidiEvent::note_on(pitch.to_midi(), note.velocity.to_midi().max(1));
        self.send_at(clock, event, note.time);
    }

    /// Releases the voice playing `pitch`; without a pitch every voice is
    /// released.
    fn trigger_release(&mut self, clock: &mut Transport, pitch: Option<Pitch>, time: Option<f64>) {
        if self.disposed {
            return;
        }
        let event = match pitch {
            Some(pitch) => MidiEvent::note_off(pitch.to_midi()),
            None => MidiEvent::all_notes_off(),
        };
        self.send_at(clock, event, time);
    }

    fn trigger_attack_release(&mut self, clock: &mut Transport, note: NoteEvent, duration: f64) {
        if self.disposed {
            return;
        }
        let Some(pitch) = note.pitch else {
            return;
        };
        let start = note.time.unwrap_or_else(|| clock.now()).max(clock.now());
        self.trigger_attack(clock, note.at(start));
        self.send_at(
            clock,
            MidiEvent::note_off(pitch.to_midi()),
            Some(start + duration.max(0.0)),
        );
    }

    fn deliver(&mut self, event: MidiEvent) {
        if self.disposed {
            debug!(synth = %self.id, ?event, "dropping message for disposed engine");
            return;
        }
        self.send(event);
    }

    fn process(&mut self, now: f64) {
        self.backend.engine.process(now);
    }

    /// As of the engine's last `process`.
    fn is_sounding(&self, _at: f64) -> bool {
        !self.disposed && self.backend.engine.sounding_count() > 0
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.catalog.read(&self.backend)
    }

    fn parameter(&self, name: &str) -> Result<Parameter, SynthError> {
        self.catalog.value(&self.backend, name)
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<ParamValue, SynthError> {
        let applied = self.catalog.apply(&mut self.backend, name, value)?;
        if name == "patch" {
            info!(synth = %self.id, patch = %applied, "patch loaded");
        }
        Ok(applied)
    }

    fn patch_names(&self) -> Option<Vec<String>> {
        Some(self.backend.library.list_names().into_iter().map(str::to_string).collect())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.send(MidiEvent::all_notes_off());
        self.disposed = true;
        debug!(synth = %self.id, "engine disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::synth::poly::PolyEngine;

    /// Engine that records its inlet.
    #[derive(Clone)]
    struct Recorder {
        sent: Rc<RefCell<Vec<[u8; 3]>>>,
        settings: InstrumentSettings,
    }

    impl ExternalEngine for Recorder {
        fn external_message(&mut self, bytes: [u8; 3]) {
            self.sent.borrow_mut().push(bytes);
        }

        fn load(&mut self, patch: &Patch) {
            self.settings = patch.settings.clone();
        }

        fn settings(&self) -> InstrumentSettings {
            self.settings.clone()
        }

        fn set_settings(&mut self, settings: InstrumentSettings) {
            self.settings = settings;
        }

        fn active_notes(&self) -> Vec<u8> {
            Vec::new()
        }

        fn sounding_count(&self) -> usize {
            0
        }
    }

    fn recorded() -> (EngineBridge, Rc<RefCell<Vec<[u8; 3]>>>) {
        let library = PatchLibrary::factory();
        let sent = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder {
            sent: Rc::clone(&sent),
            settings: library.selected().settings.clone(),
        };
        (EngineBridge::new("Viktor", Box::new(recorder), library, 2), sent)
    }

    fn polyphonic() -> EngineBridge {
        let library = PatchLibrary::factory();
        let engine = PolyEngine::new(8, 64, library.selected().settings.clone());
        EngineBridge::new("Viktor", Box::new(engine), library, 2)
    }

    #[test]
    fn loads_default_patch_at_construction() {
        let (bridge, _) = recorded();
        assert_eq!(bridge.selected_patch().name, "Hollow Lead");
        assert_eq!(
            bridge.parameter("patch").unwrap().value,
            ParamValue::Choice("Hollow Lead".to_string())
        );
    }

    #[test]
    fn encodes_note_on_and_off() {
        let (mut bridge, sent) = recorded();
        let mut clock = Transport::new(480);
        bridge.trigger_attack(&mut clock, NoteEvent::new(41u8));
        bridge.trigger_attack(&mut clock, NoteEvent::new(53u8).with_velocity(0.3));
        bridge.trigger_release(&mut clock, Some(Pitch::Midi(41)), None);
        assert_eq!(*sent.borrow(), vec![[144, 41, 127], [144, 53, 38], [128, 41, 0]]);
    }

    #[test]
    fn quiet_attack_is_still_a_note_on() {
        let (mut bridge, sent) = recorded();
        let mut clock = Transport::new(480);
        bridge.trigger_attack(&mut clock, NoteEvent::new(41u8).with_velocity(0.001));
        assert_eq!(*sent.borrow(), vec![[144, 41, 1]]);

        let mut engine = polyphonic();
        engine.trigger_attack(&mut clock, NoteEvent::new(41u8).with_velocity(0.0));
        engine.process(0.0);
        assert_eq!(engine.active_notes(), vec![41]);
    }

    #[test]
    fn silence_sends_nothing() {
        let (mut bridge, sent) = recorded();
        let mut clock = Transport::new(480);
        bridge.trigger_attack_release(&mut clock, NoteEvent::silence(), 0.25);
        assert!(sent.borrow().is_empty());
        assert_eq!(clock.scheduled_count(), 0);
    }

    #[test]
    fn duration_release_goes_on_the_clock() {
        let (mut bridge, sent) = recorded();
        let mut clock = Transport::new(480);
        bridge.trigger_attack_release(&mut clock, NoteEvent::new(41u8), 0.25);
        assert_eq!(*sent.borrow(), vec![[144, 41, 127]]);
        assert_eq!(clock.scheduled_count(), 1);

        assert!(clock.advance(0.2).is_empty());
        let fired = clock.advance(0.1);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].time, 0.25);
        match &fired[0].cue {
            Cue::Deliver { synth, event } => {
                assert_eq!(synth.as_str(), "Viktor");
                bridge.deliver(*event);
            }
            other => panic!("unexpected cue {other:?}"),
        }
        assert_eq!(sent.borrow().last(), Some(&[128, 41, 0]));
    }

    #[test]
    fn future_attack_is_deferred() {
        let (mut bridge, sent) = recorded();
        let mut clock = Transport::new(480);
        bridge.trigger_attack(&mut clock, NoteEvent::new(60u8).at(0.5));
        assert!(sent.borrow().is_empty());
        assert_eq!(clock.advance(1.0).len(), 1);
    }

    #[test]
    fn deferred_release_after_dispose_is_dropped() {
        let (mut bridge, sent) = recorded();
        let mut clock = Transport::new(480);
        bridge.trigger_attack_release(&mut clock, NoteEvent::new(41u8), 0.25);
        bridge.dispose();
        let count = sent.borrow().len();

        for fired in clock.advance(1.0) {
            if let Cue::Deliver { event, .. } = fired.cue {
                bridge.deliver(event);
            }
        }
        assert_eq!(sent.borrow().len(), count);
        // dispose sent all-notes-off
        assert_eq!(sent.borrow().last(), Some(&MidiEvent::all_notes_off().to_bytes()));
    }

    #[test]
    fn unknown_patch_keeps_previous() {
        let (mut bridge, _) = recorded();
        bridge
            .set_parameter("patch", ParamValue::from("Brass"))
            .unwrap();
        let err = bridge.set_parameter("patch", ParamValue::from("Nope")).unwrap_err();
        assert!(matches!(err, SynthError::InvalidParameterValue { .. }));
        assert_eq!(
            bridge.parameter("patch").unwrap().value,
            ParamValue::Choice("Brass".to_string())
        );
    }

    #[test]
    fn patch_load_is_visible_through_parameters() {
        let (mut bridge, _) = recorded();
        bridge.set_parameter("patch", ParamValue::from("Soft Pad")).unwrap();
        assert_eq!(
            bridge.parameter("envelope.attack").unwrap().value,
            ParamValue::Number(800.0)
        );
    }

    #[test]
    fn settings_edits_keep_other_fields() {
        let (mut bridge, _) = recorded();
        let before = bridge.parameter("filter.resonance").unwrap().value;
        assert_eq!(
            bridge.set_parameter("filter.cutoff", ParamValue::Number(50_000.0)),
            Ok(ParamValue::Number(20_000.0))
        );
        assert_eq!(bridge.parameter("filter.resonance").unwrap().value, before);
        assert_eq!(
            bridge.parameter("filter.cutoff").unwrap().value,
            ParamValue::Number(20_000.0)
        );
    }

    #[test]
    fn waveform_choice() {
        let (mut bridge, _) = recorded();
        bridge
            .set_parameter("oscillator.type", ParamValue::from("sine"))
            .unwrap();
        assert_eq!(
            bridge.parameter("oscillator.type").unwrap().value,
            ParamValue::Choice("sine".to_string())
        );
        assert!(bridge
            .set_parameter("oscillator.type", ParamValue::from("noise"))
            .is_err());
    }

    #[test]
    fn attack_release_attack_on_the_engine() {
        let mut bridge = polyphonic();
        let mut clock = Transport::new(480);
        bridge.trigger_attack(&mut clock, NoteEvent::new(45u8));
        bridge.trigger_release(&mut clock, Some(Pitch::Midi(45)), None);
        bridge.trigger_attack(&mut clock, NoteEvent::new(47u8));
        bridge.process(clock.now());
        assert_eq!(bridge.active_notes(), vec![47]);
        assert!(bridge.is_sounding(clock.now()));
    }

    #[test]
    fn lists_patches() {
        let bridge = polyphonic();
        let names = bridge.patch_names().unwrap();
        assert_eq!(names.len(), 5);
        assert_eq!(names[2], "Hollow Lead");
    }
}
