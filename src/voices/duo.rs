//! Dual-oscillator voice.
//!
//! Two mono sub-voices driven from one frequency: voice0 plays the note,
//! voice1 plays it times `harmonicity`. A shared vibrato LFO (±50 cents,
//! scaled by `vibrato_amount`) detunes both.
//!
//! # Defaults
//!
//! vibrato 0.5 at 5 Hz, harmonicity 1.5 (a fifth up), each sub-voice a sine
//! at -10 dB with 0.01/0/1/0.5 amplitude and filter envelopes.

use super::envelope::{Adsr, Gate};
use super::{db_to_gain, VoiceBackend};
use crate::note::Velocity;
use crate::patch::Waveform;
use crate::synth::param::ParamCatalog;
use crate::synth::SynthError;

const VIBRATO_DEPTH_CENTS: f32 = 50.0;

/// Settings of one of the two sub-voices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubVoice {
    pub volume_db: f32,
    pub portamento: f32,
    pub oscillator: Waveform,
    pub filter_envelope: Adsr,
    pub envelope: Adsr,
}

impl Default for SubVoice {
    fn default() -> Self {
        Self {
            volume_db: -10.0,
            portamento: 0.0,
            oscillator: Waveform::Sine,
            filter_envelope: Adsr::new(0.01, 0.0, 1.0, 0.5),
            envelope: Adsr::new(0.01, 0.0, 1.0, 0.5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DuoSynth {
    vibrato_amount: f32,
    vibrato_rate: f32,
    harmonicity: f32,
    voice0: SubVoice,
    voice1: SubVoice,
    gate: Gate,
}

impl Default for DuoSynth {
    fn default() -> Self {
        Self {
            vibrato_amount: 0.5,
            vibrato_rate: 5.0,
            harmonicity: 1.5,
            voice0: SubVoice::default(),
            voice1: SubVoice::default(),
            gate: Gate::new(),
        }
    }
}

impl DuoSynth {
    pub fn voice0(&self) -> SubVoice {
        self.voice0
    }

    pub fn set_voice0(&mut self, voice: SubVoice) {
        self.voice0 = voice;
    }

    pub fn voice1(&self) -> SubVoice {
        self.voice1
    }

    pub fn set_voice1(&mut self, voice: SubVoice) {
        self.voice1 = voice;
    }

    pub fn harmonicity(&self) -> f32 {
        self.harmonicity
    }

    /// Frequencies of (voice0, voice1) at `at`, vibrato included.
    pub fn frequencies_at(&self, at: f64) -> Option<(f32, f32)> {
        let state = self.gate.state_at(at)?;
        let base = state.frequency?;
        let phase = (at - state.attack_time) as f32 * self.vibrato_rate * std::f32::consts::TAU;
        let cents = phase.sin() * VIBRATO_DEPTH_CENTS * self.vibrato_amount;
        let detune = 2f32.powf(cents / 1200.0);
        Some((base * detune, base * self.harmonicity * detune))
    }

    /// Summed level of both sub-voices at `at`.
    pub fn level_at(&self, at: f64) -> f32 {
        [self.voice0, self.voice1]
            .iter()
            .map(|v| self.gate.level_at(at, &v.envelope) * db_to_gain(v.volume_db))
            .sum()
    }
}

/// Entries for one sub-voice, each a read-modify-write of the whole
/// `SubVoice` through its getter and setter.
macro_rules! sub_voice_params {
    ($catalog:expr, $prefix:literal, $get:ident, $set:ident) => {
        $catalog
            .choice(
                concat!($prefix, ".oscillator.type"),
                concat!($prefix, " waveform"),
                Waveform::names(),
                |s| s.$get().oscillator.name().to_string(),
                |s, v| {
                    let mut voice = s.$get();
                    voice.oscillator = Waveform::from_name(v).ok_or_else(|| SynthError::InvalidParameterValue {
                        name: concat!($prefix, ".oscillator.type").into(),
                        value: v.into(),
                    })?;
                    s.$set(voice);
                    Ok(())
                },
            )
            .range(
                concat!($prefix, ".volume"),
                concat!($prefix, " volume (dB)"),
                -60.0,
                6.0,
                |s| s.$get().volume_db,
                |s, v| {
                    let mut voice = s.$get();
                    voice.volume_db = v;
                    s.$set(voice);
                },
            )
            .range(
                concat!($prefix, ".portamento"),
                concat!($prefix, " glide (s)"),
                0.0,
                1.0,
                |s| s.$get().portamento,
                |s, v| {
                    let mut voice = s.$get();
                    voice.portamento = v;
                    s.$set(voice);
                },
            )
            .range(
                concat!($prefix, ".envelope.attack"),
                concat!($prefix, " attack (s)"),
                0.0,
                2.0,
                |s| s.$get().envelope.attack,
                |s, v| {
                    let mut voice = s.$get();
                    voice.envelope.attack = v;
                    s.$set(voice);
                },
            )
            .range(
                concat!($prefix, ".envelope.release"),
                concat!($prefix, " release (s)"),
                0.0,
                5.0,
                |s| s.$get().envelope.release,
                |s, v| {
                    let mut voice = s.$get();
                    voice.envelope.release = v;
                    s.$set(voice);
                },
            )
            .range(
                concat!($prefix, ".filterEnvelope.attack"),
                concat!($prefix, " filter attack (s)"),
                0.0,
                2.0,
                |s| s.$get().filter_envelope.attack,
                |s, v| {
                    let mut voice = s.$get();
                    voice.filter_envelope.attack = v;
                    s.$set(voice);
                },
            )
    };
}

impl VoiceBackend for DuoSynth {
    fn trigger_attack(&mut self, frequency: Option<f32>, time: f64, velocity: Velocity) {
        if frequency.is_none() {
            return;
        }
        self.gate.attack(time, frequency, velocity);
    }

    fn trigger_release(&mut self, time: f64) {
        self.gate.release(time);
    }

    fn is_sounding(&self, at: f64) -> bool {
        self.gate.is_sounding(at, &self.voice0.envelope) || self.gate.is_sounding(at, &self.voice1.envelope)
    }

    fn prune(&mut self, now: f64) {
        self.gate.prune(now);
    }

    fn dispose(&mut self) {
        self.gate.clear();
    }

    fn params() -> ParamCatalog<Self> {
        let catalog = ParamCatalog::<Self>::new()
            .range(
                "vibratoAmount",
                "Vibrato depth",
                0.0,
                1.0,
                |s| s.vibrato_amount,
                |s, v| s.vibrato_amount = v,
            )
            .range(
                "vibratoRate",
                "Vibrato rate (Hz)",
                0.1,
                20.0,
                |s| s.vibrato_rate,
                |s, v| s.vibrato_rate = v,
            )
            .range(
                "harmonicity",
                "Voice 1 frequency ratio",
                0.25,
                4.0,
                |s| s.harmonicity,
                |s, v| s.harmonicity = v,
            );
        let catalog = sub_voice_params!(catalog, "voice0", voice0, set_voice0);
        sub_voice_params!(catalog, "voice1", voice1, set_voice1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::param::{Control, ParamValue};

    #[test]
    fn voice1_follows_harmonicity() {
        let mut duo = DuoSynth::default();
        duo.trigger_attack(Some(200.0), 0.0, Velocity::FULL);
        // Vibrato is at a zero crossing at the attack instant
        let (f0, f1) = duo.frequencies_at(0.0).unwrap();
        assert!((f0 - 200.0).abs() < 1e-3);
        assert!((f1 - 300.0).abs() < 1e-3);
    }

    #[test]
    fn vibrato_stays_within_depth() {
        let mut duo = DuoSynth::default();
        duo.trigger_attack(Some(440.0), 0.0, Velocity::FULL);
        // Quarter period of 5 Hz: peak of +25 cents
        let (f0, _) = duo.frequencies_at(0.05).unwrap();
        let expected = 440.0 * 2f32.powf(25.0 / 1200.0);
        assert!((f0 - expected).abs() < 0.01);
    }

    #[test]
    fn sub_voices_default_to_minus_ten_db() {
        let duo = DuoSynth::default();
        assert_eq!(duo.voice0(), SubVoice::default());
        assert_eq!(duo.voice1().volume_db, -10.0);
    }

    #[test]
    fn nested_edit_touches_one_sub_voice() {
        let mut duo = DuoSynth::default();
        let params = DuoSynth::params();

        params.apply(&mut duo, "voice1.oscillator.type", "sawtooth".into()).unwrap();
        params.apply(&mut duo, "voice1.envelope.attack", 0.3f32.into()).unwrap();

        assert_eq!(duo.voice1().oscillator, Waveform::Sawtooth);
        assert_eq!(duo.voice1().envelope.attack, 0.3);
        assert_eq!(duo.voice1().envelope.release, 0.5);
        assert_eq!(duo.voice0(), SubVoice::default());
    }

    #[test]
    fn dotted_names_are_listed() {
        let params = DuoSynth::params();
        let names: Vec<&str> = params.specs().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"voice0.oscillator.type"));
        assert!(names.contains(&"voice1.filterEnvelope.attack"));

        let spec = params.specs().find(|s| s.name == "voice0.oscillator.type").unwrap();
        assert_eq!(spec.control(), Control::Discrete);
        assert_eq!(
            params.value(&DuoSynth::default(), "vibratoRate").unwrap().value,
            ParamValue::Number(5.0)
        );
    }
}
