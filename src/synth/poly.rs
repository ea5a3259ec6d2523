use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, warn};

use crate::{
    io::{converter::midi_to_synth, midi::MidiEvent},
    patch::{InstrumentSettings, Patch},
    synth::{
        bridge::ExternalEngine,
        message::{MessageReceiver, SynthMessage},
        voice::{Voice, VoiceState},
    },
};

/// Voice pool of the hosted engine. Messages arrive through the ring and are
/// applied on the next `process`.
pub struct PolySynth {
    voices: Vec<Voice>,
    rx: Consumer<SynthMessage>,
    settings: InstrumentSettings,
    counter: u64,
}

impl PolySynth {
    pub fn new(max_voices: usize, rx: Consumer<SynthMessage>, settings: InstrumentSettings) -> Self {
        Self {
            voices: (0..max_voices.max(1)).map(|_| Voice::new()).collect(),
            rx,
            settings,
            counter: 0,
        }
    }

    pub fn process(&mut self, now: f64) {
        // Process control messages
        while let Some(msg) = MessageReceiver::pop(&mut self.rx) {
            match msg {
                SynthMessage::NoteOn { note, velocity } => {
                    self.counter += 1;
                    let age = self.counter;
                    match self.allocate_voice() {
                        Some(voice) => voice.start(note, velocity, age),
                        None => debug!(note, "no voice free, note dropped"),
                    }
                }
                SynthMessage::NoteOff { note, .. } => {
                    if let Some(voice) = self.find_voice(note) {
                        voice.release(now);
                    }
                }
                SynthMessage::AllNotesOff => {
                    for voice in &mut self.voices {
                        voice.release(now);
                    }
                }
            }
        }

        let release = self.settings.envelope.release_seconds();
        for voice in &mut self.voices {
            voice.finish_release(now, release);
        }
    }

    pub fn settings(&self) -> &InstrumentSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: InstrumentSettings) {
        self.settings = settings;
    }

    /// Notes whose key is still held, in voice order.
    pub fn active_notes(&self) -> Vec<u8> {
        self.voices
            .iter()
            .filter(|v| v.state() == VoiceState::Active)
            .map(Voice::note)
            .collect()
    }

    /// Voices that are held or in their release tail.
    pub fn sounding_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    fn allocate_voice(&mut self) -> Option<&mut Voice> {
        // First pass: find free voice index
        let free_idx = self.voices.iter().position(|v| v.is_free());
        if let Some(idx) = free_idx {
            return Some(&mut self.voices[idx]);
        }

        // Second pass: steal oldest releasing voice
        let steal_idx = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == VoiceState::Releasing)
            .min_by_key(|(_, v)| v.age())
            .map(|(idx, _)| idx);

        steal_idx.map(|idx| &mut self.voices[idx])
    }

    fn find_voice(&mut self, note: u8) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.note() == note && v.state() == VoiceState::Active)
    }
}

/// The in-process engine: a `PolySynth` fed through a bounded message inlet.
pub struct PolyEngine {
    inlet: Producer<SynthMessage>,
    synth: PolySynth,
    dropped: u64,
}

impl PolyEngine {
    pub fn new(voices: usize, inlet_capacity: usize, settings: InstrumentSettings) -> Self {
        let (inlet, rx) = RingBuffer::new(inlet_capacity.max(1));
        Self {
            inlet,
            synth: PolySynth::new(voices, rx, settings),
            dropped: 0,
        }
    }

    pub fn synth(&self) -> &PolySynth {
        &self.synth
    }

    /// Messages lost to a full inlet.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl ExternalEngine for PolyEngine {
    fn external_message(&mut self, bytes: [u8; 3]) {
        let Some(msg) = MidiEvent::from_bytes(bytes).and_then(|ev| midi_to_synth(ev, 0)) else {
            debug!(?bytes, "engine ignored message");
            return;
        };
        if self.inlet.push(msg).is_err() {
            self.dropped += 1;
            warn!(?msg, dropped = self.dropped, "engine inlet full, message dropped");
        }
    }

    fn load(&mut self, patch: &Patch) {
        debug!(patch = %patch.name, "engine loading patch");
        self.synth.set_settings(patch.settings.clone());
    }

    fn settings(&self) -> InstrumentSettings {
        self.synth.settings().clone()
    }

    fn set_settings(&mut self, settings: InstrumentSettings) {
        self.synth.set_settings(settings);
    }

    fn process(&mut self, now: f64) {
        self.synth.process(now);
    }

    fn active_notes(&self) -> Vec<u8> {
        self.synth.active_notes()
    }

    fn sounding_count(&self) -> usize {
        self.synth.sounding_count()
    }
}
