//! Built-in voice backends.
//!
//! Each voice is the event-level half of a synth: it accepts attacks and
//! releases at absolute context times and keeps enough state to say what
//! is sounding when. Sample rendering lives outside this crate.
//!
//! All four voices are monophonic. A release closes the current note no
//! matter which pitch it was started with.
//!
//! # Example
//!
//! ```
//! use tonebridge::note::Velocity;
//! use tonebridge::voices::{MembraneSynth, MonoSynth, VoiceBackend};
//!
//! let mut bass = MonoSynth::default();
//! bass.trigger_attack_release(Some(43.65), 0.25, 1.0, Velocity::FULL);
//! assert!(bass.is_sounding(1.1));
//!
//! let mut kick = MembraneSynth::default();
//! kick.trigger_attack(Some(261.6), 0.0, Velocity::new(0.05));
//! ```

mod duo;
pub mod envelope;
mod membrane;
mod metal;
mod mono;

pub use duo::{DuoSynth, SubVoice};
pub use envelope::{Adsr, Gate};
pub use membrane::MembraneSynth;
pub use metal::MetalSynth;
pub use mono::MonoSynth;

use crate::note::Velocity;
use crate::synth::param::ParamCatalog;

/// The note contract every built-in voice implements.
///
/// Times are absolute context seconds. `frequency: None` asks for silence
/// on pitched voices; fixed-pitch voices ignore the argument entirely.
pub trait VoiceBackend {
    fn trigger_attack(&mut self, frequency: Option<f32>, time: f64, velocity: Velocity);

    /// Close the gate of whatever note is sounding.
    fn trigger_release(&mut self, time: f64);

    fn trigger_attack_release(&mut self, frequency: Option<f32>, duration: f64, time: f64, velocity: Velocity) {
        self.trigger_attack(frequency, time, velocity);
        self.trigger_release(time + duration.max(0.0));
    }

    fn is_sounding(&self, at: f64) -> bool;

    /// Forget history that can no longer affect output at or after `now`.
    fn prune(&mut self, _now: f64) {}

    /// Silence immediately and drop all scheduled events.
    fn dispose(&mut self);

    /// The voice's editable settings.
    fn params() -> ParamCatalog<Self>
    where
        Self: Sized;
}

/// Decibels to linear gain.
pub(crate) fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack_release_attack<B: VoiceBackend>(mut voice: B) {
        voice.trigger_attack(Some(220.0), 0.0, Velocity::FULL);
        voice.trigger_release(0.5);
        voice.trigger_attack(Some(330.0), 1.0, Velocity::FULL);
        assert!(voice.is_sounding(1.0005), "second attack should sound");
    }

    #[test]
    fn every_voice_retriggers_after_release() {
        attack_release_attack(MonoSynth::default());
        attack_release_attack(MembraneSynth::default());
        attack_release_attack(MetalSynth::default());
        attack_release_attack(DuoSynth::default());
    }

    #[test]
    fn dispose_silences() {
        let mut voice = MonoSynth::default();
        voice.trigger_attack(Some(220.0), 0.0, Velocity::FULL);
        voice.dispose();
        assert!(!voice.is_sounding(0.1));
    }

    #[test]
    fn catalogs_are_populated() {
        assert!(!MonoSynth::params().is_empty());
        assert!(!MembraneSynth::params().is_empty());
        assert!(!MetalSynth::params().is_empty());
        assert!(DuoSynth::params().len() > MonoSynth::params().len());
    }

    #[test]
    fn db_conversion() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
    }
}
