//! Simple oscillator voice.
//!
//! One oscillator through one amplitude envelope. The classic bass or
//! lead starting point: triangle wave, quick attack, full sustain.

use super::envelope::{Adsr, Gate};
use super::{db_to_gain, VoiceBackend};
use crate::note::Velocity;
use crate::patch::Waveform;
use crate::synth::param::ParamCatalog;
use crate::synth::SynthError;

#[derive(Debug, Clone)]
pub struct MonoSynth {
    oscillator: Waveform,
    envelope: Adsr,
    /// Glide time between notes in seconds
    portamento: f32,
    volume_db: f32,
    gate: Gate,
}

impl Default for MonoSynth {
    fn default() -> Self {
        Self {
            oscillator: Waveform::Triangle,
            envelope: Adsr::new(0.005, 0.1, 0.3, 1.0),
            portamento: 0.0,
            volume_db: 0.0,
            gate: Gate::new(),
        }
    }
}

impl MonoSynth {
    pub fn oscillator(&self) -> Waveform {
        self.oscillator
    }

    pub fn set_oscillator(&mut self, waveform: Waveform) {
        self.oscillator = waveform;
    }

    /// The envelope by value; write changes back with `set_envelope`.
    pub fn envelope(&self) -> Adsr {
        self.envelope
    }

    pub fn set_envelope(&mut self, envelope: Adsr) {
        self.envelope = envelope;
    }

    pub fn gain(&self) -> f32 {
        db_to_gain(self.volume_db)
    }

    /// Output level at `at`, after envelope, velocity and volume.
    pub fn level_at(&self, at: f64) -> f32 {
        self.gate.level_at(at, &self.envelope) * self.gain()
    }

    /// Pitch of the note sounding at `at`, if any.
    pub fn frequency_at(&self, at: f64) -> Option<f32> {
        self.gate.state_at(at).and_then(|s| s.frequency)
    }

    pub fn attack_count(&self) -> usize {
        self.gate.attack_count()
    }
}

impl VoiceBackend for MonoSynth {
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
        self.gate.is_sounding(at, &self.envelope)
    }

    fn prune(&mut self, now: f64) {
        self.gate.prune(now);
    }

    fn dispose(&mut self) {
        self.gate.clear();
    }

    fn params() -> ParamCatalog<Self> {
        ParamCatalog::<Self>::new()
            .choice(
                "oscillator.type",
                "Oscillator waveform",
                Waveform::names(),
                |s| s.oscillator().name().to_string(),
                |s, v| {
                    let waveform = Waveform::from_name(v).ok_or_else(|| SynthError::InvalidParameterValue {
                        name: "oscillator.type".into(),
                        value: v.into(),
                    })?;
                    s.set_oscillator(waveform);
                    Ok(())
                },
            )
            .range(
                "envelope.attack",
                "Attack time (s)",
                0.0,
                2.0,
                |s| s.envelope().attack,
                |s, v| {
                    let mut env = s.envelope();
                    env.attack = v;
                    s.set_envelope(env);
                },
            )
            .range(
                "envelope.decay",
                "Decay time (s)",
                0.0,
                2.0,
                |s| s.envelope().decay,
                |s, v| {
                    let mut env = s.envelope();
                    env.decay = v;
                    s.set_envelope(env);
                },
            )
            .range(
                "envelope.sustain",
                "Sustain level",
                0.0,
                1.0,
                |s| s.envelope().sustain,
                |s, v| {
                    let mut env = s.envelope();
                    env.sustain = v;
                    s.set_envelope(env);
                },
            )
            .range(
                "envelope.release",
                "Release time (s)",
                0.0,
                5.0,
                |s| s.envelope().release,
                |s, v| {
                    let mut env = s.envelope();
                    env.release = v;
                    s.set_envelope(env);
                },
            )
            .range(
                "portamento",
                "Glide time (s)",
                0.0,
                1.0,
                |s| s.portamento,
                |s, v| s.portamento = v,
            )
            .range("volume", "Volume (dB)", -60.0, 6.0, |s| s.volume_db, |s, v| s.volume_db = v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::param::ParamValue;

    #[test]
    fn defaults() {
        let synth = MonoSynth::default();
        assert_eq!(synth.oscillator(), Waveform::Triangle);
        assert_eq!(synth.envelope(), Adsr::new(0.005, 0.1, 0.3, 1.0));
    }

    #[test]
    fn silence_pitch_is_ignored() {
        let mut synth = MonoSynth::default();
        synth.trigger_attack(None, 0.0, Velocity::FULL);
        assert_eq!(synth.attack_count(), 0);
        assert!(!synth.is_sounding(0.1));
    }

    #[test]
    fn release_is_global() {
        let mut synth = MonoSynth::default();
        synth.trigger_attack(Some(110.0), 0.0, Velocity::FULL);
        synth.trigger_release(0.5);
        // Release tail is 1s
        assert!(synth.is_sounding(1.0));
        assert!(!synth.is_sounding(1.6));
    }

    #[test]
    fn attack_release_schedules_both_edges() {
        let mut synth = MonoSynth::default();
        synth.trigger_attack_release(Some(87.3), 0.25, 1.0, Velocity::FULL);
        assert_eq!(synth.frequency_at(1.1), Some(87.3));
        assert!(!synth.is_sounding(0.9));
        assert!(!synth.is_sounding(2.5));
    }

    #[test]
    fn envelope_edit_keeps_other_fields() {
        let mut synth = MonoSynth::default();
        let params = MonoSynth::params();
        params.apply(&mut synth, "envelope.release", 0.2f32.into()).unwrap();
        assert_eq!(synth.envelope(), Adsr::new(0.005, 0.1, 0.3, 0.2));

        params.apply(&mut synth, "oscillator.type", "square".into()).unwrap();
        assert_eq!(
            params.value(&synth, "oscillator.type").unwrap().value,
            ParamValue::Choice("square".into())
        );
    }
}
