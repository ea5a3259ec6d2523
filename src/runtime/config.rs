//! Session configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::{BackendKind, SynthConfig, SynthError, SynthId};

/// Everything a `PlaybackSession` is built from.
///
/// ```
/// use tonebridge::runtime::SessionConfig;
/// use tonebridge::synth::BackendKind;
///
/// let config = SessionConfig::new()
///     .ppq(96)
///     .synth("lead", BackendKind::Simple)
///     .synth("drums", BackendKind::Membrane)
///     .default_synth("lead");
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Transport ticks per quarter note
    pub ppq: u32,
    /// Seconds between `start_song` and tick 0
    pub start_offset: f64,
    /// Seconds added to live note-on/off times
    pub note_on_lookahead: f64,
    pub synths: Vec<SynthConfig>,
    pub default_synth: SynthId,
}

impl Default for SessionConfig {
    /// The five stock backends with "Tone Synth" selected.
    fn default() -> Self {
        Self::new()
            .synth("Tone Synth", BackendKind::Simple)
            .synth("Tone MembraneSynth", BackendKind::Membrane)
            .synth("Tone MetalSynth", BackendKind::Metal)
            .synth("Viktor", BackendKind::engine())
            .synth("ViktorTone Synth", BackendKind::DualOscillator)
            .default_synth("Tone Synth")
    }
}

impl SessionConfig {
    /// Stock timing and no synths.
    pub fn new() -> Self {
        Self {
            ppq: 480,
            start_offset: 0.1,
            note_on_lookahead: 0.01,
            synths: Vec::new(),
            default_synth: SynthId::new(""),
        }
    }

    pub fn ppq(mut self, ppq: u32) -> Self {
        self.ppq = ppq;
        self
    }

    pub fn start_offset(mut self, seconds: f64) -> Self {
        self.start_offset = seconds;
        self
    }

    pub fn note_on_lookahead(mut self, seconds: f64) -> Self {
        self.note_on_lookahead = seconds;
        self
    }

    /// Add a backend. The first one added becomes the default selection
    /// unless `default_synth` says otherwise.
    pub fn synth(mut self, id: impl Into<SynthId>, backend: BackendKind) -> Self {
        let config = SynthConfig::new(id, backend);
        if self.synths.is_empty() {
            self.default_synth = config.id.clone();
        }
        self.synths.push(config);
        self
    }

    pub fn default_synth(mut self, id: impl Into<SynthId>) -> Self {
        self.default_synth = id.into();
        self
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.ppq == 0 {
            return Err(SynthError::InvalidConfig("ppq must be positive".to_string()));
        }
        for (name, value) in [("start_offset", self.start_offset), ("note_on_lookahead", self.note_on_lookahead)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SynthError::InvalidConfig(format!("{name} must be a non-negative number of seconds")));
            }
        }
        if self.synths.is_empty() {
            return Err(SynthError::InvalidConfig("no synths configured".to_string()));
        }
        for (i, synth) in self.synths.iter().enumerate() {
            if self.synths[..i].iter().any(|s| s.id == synth.id) {
                return Err(SynthError::InvalidConfig(format!("synth id {} configured twice", synth.id)));
            }
        }
        if !self.synths.iter().any(|s| s.id == self.default_synth) {
            return Err(SynthError::UnknownSynthId(self.default_synth.clone()));
        }
        Ok(())
    }
}
