//! Membrane (kick drum) voice.
//!
//! A sine whose pitch starts `octaves` above the played note and sweeps
//! down to it over `pitch_decay` seconds, under a short percussive
//! envelope.
//!
//! # How It Works
//!
//! 1. Attack at frequency f starts the oscillator at f * 2^octaves
//! 2. Pitch falls exponentially to f within `pitch_decay`
//! 3. Amplitude: instant attack, 0.4 s decay to a near-silent sustain

use super::envelope::{Adsr, Gate};
use super::VoiceBackend;
use crate::note::Velocity;
use crate::patch::Waveform;
use crate::synth::param::ParamCatalog;
use crate::synth::SynthError;

#[derive(Debug, Clone)]
pub struct MembraneSynth {
    pitch_decay: f32,
    octaves: f32,
    oscillator: Waveform,
    envelope: Adsr,
    gate: Gate,
}

impl Default for MembraneSynth {
    fn default() -> Self {
        Self {
            pitch_decay: 0.05,
            octaves: 10.0,
            oscillator: Waveform::Sine,
            envelope: Adsr::new(0.001, 0.4, 0.01, 1.4),
            gate: Gate::new(),
        }
    }
}

impl MembraneSynth {
    pub fn envelope(&self) -> Adsr {
        self.envelope
    }

    pub fn set_envelope(&mut self, envelope: Adsr) {
        self.envelope = envelope;
    }

    pub fn pitch_decay(&self) -> f32 {
        self.pitch_decay
    }

    pub fn octaves(&self) -> f32 {
        self.octaves
    }

    /// Oscillator frequency at `at`, including the downward sweep.
    pub fn frequency_at(&self, at: f64) -> Option<f32> {
        let state = self.gate.state_at(at)?;
        let target = state.frequency?;
        let elapsed = (at - state.attack_time) as f32;
        if elapsed >= self.pitch_decay || self.pitch_decay <= 0.0 {
            return Some(target);
        }
        let remaining = self.octaves * (1.0 - elapsed / self.pitch_decay);
        Some(target * 2f32.powf(remaining))
    }

    pub fn level_at(&self, at: f64) -> f32 {
        self.gate.level_at(at, &self.envelope)
    }

    pub fn attack_count(&self) -> usize {
        self.gate.attack_count()
    }
}

impl VoiceBackend for MembraneSynth {
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
            .range(
                "pitchDecay",
                "Pitch sweep time (s)",
                0.0,
                0.5,
                |s| s.pitch_decay,
                |s, v| s.pitch_decay = v,
            )
            .range(
                "octaves",
                "Sweep depth (octaves)",
                0.5,
                12.0,
                |s| s.octaves,
                |s, v| s.octaves = v,
            )
            .choice(
                "oscillator.type",
                "Oscillator waveform",
                Waveform::names(),
                |s| s.oscillator.name().to_string(),
                |s, v| {
                    s.oscillator = Waveform::from_name(v).ok_or_else(|| SynthError::InvalidParameterValue {
                        name: "oscillator.type".into(),
                        value: v.into(),
                    })?;
                    Ok(())
                },
            )
            .range(
                "envelope.decay",
                "Decay time (s)",
                0.0,
                4.0,
                |s| s.envelope().decay,
                |s, v| {
                    let mut env = s.envelope();
                    env.decay = v;
                    s.set_envelope(env);
                },
            )
            .range(
                "envelope.release",
                "Release time (s)",
                0.0,
                4.0,
                |s| s.envelope().release,
                |s, v| {
                    let mut env = s.envelope();
                    env.release = v;
                    s.set_envelope(env);
                },
            )
    }
}
