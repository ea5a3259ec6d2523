//! Metallic (hi-hat) voice.
//!
//! Inharmonic FM partials at a fixed base frequency, high-passed at
//! `resonance`. The played pitch is ignored: every attack sounds the same
//! metal, only louder or softer.

use super::envelope::{Adsr, Gate};
use super::VoiceBackend;
use crate::note::Velocity;
use crate::synth::param::ParamCatalog;

/// Frequency ratios of the six FM operator pairs.
const PARTIAL_RATIOS: [f32; 6] = [1.0, 1.483, 1.932, 2.546, 2.63, 3.897];

#[derive(Debug, Clone)]
pub struct MetalSynth {
    frequency: f32,
    harmonicity: f32,
    modulation_index: f32,
    resonance: f32,
    octaves: f32,
    envelope: Adsr,
    gate: Gate,
}

impl Default for MetalSynth {
    fn default() -> Self {
        Self {
            frequency: 200.0,
            harmonicity: 5.1,
            modulation_index: 32.0,
            resonance: 4000.0,
            octaves: 1.5,
            envelope: Adsr::new(0.001, 1.4, 0.0, 0.2),
            gate: Gate::new(),
        }
    }
}

impl MetalSynth {
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn envelope(&self) -> Adsr {
        self.envelope
    }

    pub fn set_envelope(&mut self, envelope: Adsr) {
        self.envelope = envelope;
    }

    /// Carrier frequencies of the partials.
    pub fn partials(&self) -> [f32; 6] {
        PARTIAL_RATIOS.map(|r| self.frequency * r)
    }

    /// Upper edge of the filter sweep: `resonance` raised by `octaves`.
    pub fn filter_ceiling(&self) -> f32 {
        self.resonance * 2f32.powf(self.octaves)
    }

    pub fn level_at(&self, at: f64) -> f32 {
        self.gate.level_at(at, &self.envelope)
    }

    pub fn attack_count(&self) -> usize {
        self.gate.attack_count()
    }
}

impl VoiceBackend for MetalSynth {
    fn trigger_attack(&mut self, _frequency: Option<f32>, time: f64, velocity: Velocity) {
        self.gate.attack(time, Some(self.frequency), velocity);
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
            .range("frequency", "Base frequency (Hz)", 20.0, 2000.0, |s| s.frequency, |s, v| s.frequency = v)
            .range(
                "harmonicity",
                "Modulator ratio",
                0.1,
                20.0,
                |s| s.harmonicity,
                |s, v| s.harmonicity = v,
            )
            .range(
                "modulationIndex",
                "FM depth",
                1.0,
                100.0,
                |s| s.modulation_index,
                |s, v| s.modulation_index = v,
            )
            .range(
                "resonance",
                "Filter floor (Hz)",
                100.0,
                16000.0,
                |s| s.resonance,
                |s, v| s.resonance = v,
            )
            .range("octaves", "Filter sweep (octaves)", 0.0, 8.0, |s| s.octaves, |s, v| s.octaves = v)
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
